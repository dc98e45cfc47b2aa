//! Storage layer for tally
//!
//! The document store is a data directory holding one JSON file per
//! collection. Every access takes the collection's lock file, and every
//! write goes through temp-file + rename.
//!
//! # Directory Structure
//!
//! ```text
//! <data-dir>/
//!   tally.toml                  # Optional configuration
//!   tasks.json                  # Logged tasks
//!   assigned_tasks.json         # Grouped (eid, month, year) assignments
//!   monthly_tasks.json          # Per-project monthly assignment counts
//!   options.json                # Project type / status value lists
//!   points.json                 # Project type -> points table
//!   users.json                  # Registered users
//!   sessions.json               # Live login sessions (token ids)
//!   keys.json                   # Token signing secret
//!   projects.json               # Project names
//!   <collection>.lock           # Lock files, one per collection
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Schema version written into every collection file
pub const STORE_SCHEMA_VERSION: &str = "tally.store.v1";

/// Name of the configuration file inside the data directory
pub const CONFIG_FILE: &str = "tally.toml";

/// The collections making up the document store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    AssignedTasks,
    MonthlyTasks,
    Options,
    Points,
    Users,
    Sessions,
    Keys,
    Projects,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Collection::Tasks,
        Collection::AssignedTasks,
        Collection::MonthlyTasks,
        Collection::Options,
        Collection::Points,
        Collection::Users,
        Collection::Sessions,
        Collection::Keys,
        Collection::Projects,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::AssignedTasks => "assigned_tasks",
            Collection::MonthlyTasks => "monthly_tasks",
            Collection::Options => "options",
            Collection::Points => "points",
            Collection::Users => "users",
            Collection::Sessions => "sessions",
            Collection::Keys => "keys",
            Collection::Projects => "projects",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CollectionFile<T> {
    schema_version: String,
    records: Vec<T>,
}

#[derive(Serialize)]
struct CollectionFileRef<'a, T> {
    schema_version: &'static str,
    updated_at: DateTime<Utc>,
    records: &'a [T],
}

/// Storage manager for the tally data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn collection_file(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.name()))
    }

    pub fn lock_file(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.lock", collection.name()))
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Create the data directory and any missing collection files.
    ///
    /// Returns the collections that were created.
    pub fn init(&self) -> Result<Vec<Collection>> {
        fs::create_dir_all(&self.data_dir)?;

        let mut created = Vec::new();
        for collection in Collection::ALL {
            let path = self.collection_file(collection);
            if path.exists() {
                continue;
            }
            let _lock = FileLock::acquire(self.lock_file(collection), self.lock_timeout_ms)?;
            self.write_records::<serde_json::Value>(&path, &[])?;
            created.push(collection);
        }

        tracing::debug!(data_dir = %self.data_dir.display(), created = created.len(), "storage initialized");
        Ok(created)
    }

    pub fn is_initialized(&self) -> bool {
        self.collection_file(Collection::Tasks).exists()
    }

    // =========================================================================
    // Collection access (locked)
    // =========================================================================

    /// Read every record of a collection. A missing file is an empty collection.
    pub fn read<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>> {
        let _lock = FileLock::acquire(self.lock_file(collection), self.lock_timeout_ms)?;
        self.read_records(&self.collection_file(collection))
    }

    /// Locked read-modify-write of a collection.
    ///
    /// The file is rewritten only when `f` succeeds.
    pub fn update<T, R, F>(&self, collection: Collection, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> Result<R>,
    {
        let path = self.collection_file(collection);
        let _lock = FileLock::acquire(self.lock_file(collection), self.lock_timeout_ms)?;

        let mut records = self.read_records(&path)?;
        let result = f(&mut records)?;
        self.write_records(&path, &records)?;

        tracing::trace!(collection = collection.name(), records = records.len(), "collection written");
        Ok(result)
    }

    fn read_records<T: DeserializeOwned>(&self, path: &Path) -> Result<Vec<T>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        let file: CollectionFile<T> = serde_json::from_str(&content)?;
        if file.schema_version != STORE_SCHEMA_VERSION {
            return Err(Error::OperationFailed(format!(
                "{}: unsupported schema version '{}'",
                path.display(),
                file.schema_version
            )));
        }
        Ok(file.records)
    }

    fn write_records<T: Serialize>(&self, path: &Path, records: &[T]) -> Result<()> {
        let file = CollectionFileRef {
            schema_version: STORE_SCHEMA_VERSION,
            updated_at: Utc::now(),
            records,
        };
        let json = serde_json::to_string_pretty(&file)?;
        lock::write_atomic(path, json.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        key: String,
        value: u32,
    }

    #[test]
    fn init_creates_every_collection() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path().join("data"));
        assert!(!storage.is_initialized());

        let created = storage.init().unwrap();
        assert_eq!(created.len(), Collection::ALL.len());
        assert!(storage.is_initialized());

        let again = storage.init().unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn missing_collection_reads_empty() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        let rows: Vec<Row> = storage.read(Collection::Projects).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn update_persists_records() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());

        storage
            .update(Collection::Projects, |rows: &mut Vec<Row>| {
                rows.push(Row {
                    key: "a".to_string(),
                    value: 1,
                });
                Ok(())
            })
            .unwrap();

        let rows: Vec<Row> = storage.read(Collection::Projects).unwrap();
        assert_eq!(
            rows,
            vec![Row {
                key: "a".to_string(),
                value: 1
            }]
        );
    }

    #[test]
    fn failed_update_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        storage.init().unwrap();

        let result: Result<()> = storage.update(Collection::Projects, |rows: &mut Vec<Row>| {
            rows.push(Row {
                key: "lost".to_string(),
                value: 9,
            });
            Err(Error::InvalidArgument("nope".to_string()))
        });
        assert!(result.is_err());

        let rows: Vec<Row> = storage.read(Collection::Projects).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn rejects_unknown_schema_version() {
        let dir = TempDir::new().unwrap();
        let storage = Storage::new(dir.path());
        fs::write(
            storage.collection_file(Collection::Tasks),
            r#"{"schema_version":"other","updated_at":"2024-01-01T00:00:00Z","records":[]}"#,
        )
        .unwrap();

        let result: Result<Vec<Row>> = storage.read(Collection::Tasks);
        assert!(matches!(result, Err(Error::OperationFailed(_))));
    }
}
