//! Configuration loading and management
//!
//! Handles parsing of `tally.toml` inside the data directory.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tasks: TasksConfig,

    /// Seed values for the option lists
    #[serde(default)]
    pub options: OptionsConfig,

    /// Seed values for the points table
    #[serde(default)]
    pub points: PointsConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Task-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Allow an approved task to be set back to pending
    #[serde(default = "default_true")]
    pub allow_approval_regression: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            allow_approval_regression: true,
        }
    }
}

/// Option list seeds, applied the first time a list is read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    #[serde(default = "default_project_types")]
    pub project_types: Vec<String>,

    #[serde(default = "default_project_statuses")]
    pub project_statuses: Vec<String>,
}

fn default_project_types() -> Vec<String> {
    ["Film", "Reel", "Photo Edit", "Album", "Teaser", "Onsite Shoot"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_project_statuses() -> Vec<String> {
    ["In Progress", "Completed", "On Hold", "Revision"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            project_types: default_project_types(),
            project_statuses: default_project_statuses(),
        }
    }
}

/// Points table seeds, applied the first time the table is read
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsConfig {
    #[serde(default = "default_points")]
    pub defaults: BTreeMap<String, f64>,
}

fn default_points() -> BTreeMap<String, f64> {
    [
        ("Film", 10.0),
        ("Reel", 3.0),
        ("Photo Edit", 1.0),
        ("Album", 5.0),
        ("Teaser", 4.0),
        ("Onsite Shoot", 6.0),
    ]
    .iter()
    .map(|(name, points)| (name.to_string(), *points))
    .collect()
}

impl Default for PointsConfig {
    fn default() -> Self {
        Self {
            defaults: default_points(),
        }
    }
}

/// Longest session a token may be issued for
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Lowest PBKDF2 round count accepted in configuration
pub const MIN_PBKDF2_ITERATIONS: u32 = 1_000;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,

    /// PBKDF2-HMAC-SHA256 rounds for newly stored passwords
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// HS256 token secret. When unset, one is generated and kept in the
    /// data directory's `keys.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_secret: Option<String>,
}

fn default_session_ttl_hours() -> i64 {
    12
}

fn default_min_password_len() -> usize {
    6
}

fn default_pbkdf2_iterations() -> u32 {
    100_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            min_password_len: default_min_password_len(),
            pbkdf2_iterations: default_pbkdf2_iterations(),
            jwt_secret: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `tally.toml` from the data directory, or return defaults when absent
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(crate::storage::CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_unique_list(&self.options.project_types, "options.project_types")?;
        validate_unique_list(&self.options.project_statuses, "options.project_statuses")?;

        for (project_type, points) in &self.points.defaults {
            if project_type.trim().is_empty() {
                return Err(Error::InvalidConfig(
                    "points.defaults cannot include an empty project type".to_string(),
                ));
            }
            if !points.is_finite() || *points < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "points.defaults.{project_type} must be a non-negative number"
                )));
            }
        }

        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.auth.session_ttl_hours) {
            return Err(Error::InvalidConfig(format!(
                "auth.session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}"
            )));
        }
        if self.auth.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(Error::InvalidConfig(format!(
                "auth.pbkdf2_iterations must be >= {MIN_PBKDF2_ITERATIONS}"
            )));
        }
        if matches!(&self.auth.jwt_secret, Some(secret) if secret.len() < 32) {
            return Err(Error::InvalidConfig(
                "auth.jwt_secret must be at least 32 bytes".to_string(),
            ));
        }
        if self.auth.min_password_len == 0 {
            return Err(Error::InvalidConfig(
                "auth.min_password_len must be > 0".to_string(),
            ));
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_unique_list(values: &[String], field: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{field} cannot include empty entries"
            )));
        }
        if !seen.insert(trimmed.to_lowercase()) {
            return Err(Error::InvalidConfig(format!(
                "{field} has duplicate entry '{trimmed}'"
            )));
        }
    }
    Ok(())
}
