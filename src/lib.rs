//! tally - task logging, approval and points library
//!
//! This library provides the core functionality for the tally CLI: employees
//! log daily production tasks, admins approve them, and approvals feed
//! monthly assigned-vs-completed counters.
//!
//! # Core Concepts
//!
//! - **Tasks**: dated work records with frozen points and a `pending` /
//!   `approved` status
//! - **Assignments**: one document per (employee, month, year) holding
//!   assigned and completed counts per project type
//! - **Reconciliation**: an approval transition adds one completed unit to the
//!   matching assignment entry
//! - **Bulk merge**: flat or grouped assignment rows merged idempotently
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `tally.toml`
//! - `error`: Error types and result aliases
//! - `storage`: Collection files in the data directory
//! - `lock`: File locking and atomic writes for concurrency safety
//! - `task`: Task records, filters and edits
//! - `assigned`: Grouped assignment documents
//! - `reconcile`: Approval counts, rollup labels and counter increments
//! - `bulk`: Bulk assignment normalization and merge
//! - `monthly`: Per-project monthly assignment counts
//! - `options`, `points`, `users`, `projects`: reference data
//! - `dates`: Day and month string helpers
//! - `output`: JSON envelopes and human rendering

pub mod assigned;
pub mod bulk;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod lock;
pub mod monthly;
pub mod options;
pub mod output;
pub mod points;
pub mod projects;
pub mod reconcile;
pub mod storage;
pub mod task;
pub mod users;

pub use error::{Error, Result};
