//! Error types for tally
//!
//! Every error belongs to one of three classes, each with a CLI exit code and
//! the HTTP status the original API answered with:
//! - validation (exit 2, HTTP 400): missing field, bad date, invalid enum value
//! - not found (exit 3, HTTP 404)
//! - operation failed (exit 4, HTTP 500): storage, locking, serialization

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the tally CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const VALIDATION: i32 = 2;
    pub const NOT_FOUND: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for tally operations
#[derive(Error, Debug)]
pub enum Error {
    // Validation errors (exit code 2)
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Invalid approval '{0}': must be pending or approved")]
    InvalidApproval(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Not found (exit code 3)
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    // Operation failures (exit code 4)
    #[error("Constraint violation: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::MissingField(_)
            | Error::InvalidValue { .. }
            | Error::InvalidApproval(_)
            | Error::AlreadyExists(_)
            | Error::InvalidCredentials
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::VALIDATION,

            Error::NotFound { .. } => exit_codes::NOT_FOUND,

            Error::Conflict(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// HTTP status the equivalent API response would carry
    pub fn http_status(&self) -> u16 {
        match self.exit_code() {
            exit_codes::VALIDATION => 400,
            exit_codes::NOT_FOUND => 404,
            _ => 500,
        }
    }

    /// Message safe to show a client. Internal failures collapse to a
    /// generic message; the full error is logged instead.
    pub fn public_message(&self) -> String {
        match self.exit_code() {
            exit_codes::OPERATION_FAILED => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Structured details for JSON error output
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::MissingField(field) => Some(serde_json::json!({ "field": field })),
            Error::InvalidValue { field, message } => Some(serde_json::json!({
                "field": field,
                "message": message,
            })),
            Error::InvalidApproval(value) => Some(serde_json::json!({
                "value": value,
                "allowed": ["pending", "approved"],
            })),
            Error::NotFound { kind, id } => Some(serde_json::json!({
                "kind": kind,
                "id": id,
            })),
            _ => None,
        }
    }
}

/// Result type alias for tally operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.public_message(),
            code: err.exit_code(),
            status: err.http_status(),
            details: err.details(),
        }
    }
}
