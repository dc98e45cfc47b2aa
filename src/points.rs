//! Project type -> points table.
//!
//! The table lives in the data store like every other collection. It is
//! seeded from `[points.defaults]` the first time it is read empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PointsConfig;
use crate::error::{Error, Result};
use crate::storage::{Collection, Storage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsEntry {
    pub projecttype: String,
    pub points: f64,
}

#[derive(Debug, Clone)]
pub struct PointsTable {
    storage: Storage,
    seeds: BTreeMap<String, f64>,
}

impl PointsTable {
    pub fn new(storage: Storage, config: &PointsConfig) -> Self {
        Self {
            storage,
            seeds: config.defaults.clone(),
        }
    }

    /// Read the table, seeding it only when the stored table is empty.
    pub fn all(&self) -> Result<Vec<PointsEntry>> {
        let entries: Vec<PointsEntry> = self.storage.read(Collection::Points)?;
        if !entries.is_empty() || self.seeds.is_empty() {
            return Ok(entries);
        }
        self.storage
            .update(Collection::Points, |entries: &mut Vec<PointsEntry>| {
                self.seed(entries);
                Ok(entries.clone())
            })
    }

    fn seed(&self, entries: &mut Vec<PointsEntry>) {
        if entries.is_empty() && !self.seeds.is_empty() {
            tracing::info!(count = self.seeds.len(), "seeding points table");
            entries.extend(self.seeds.iter().map(|(projecttype, points)| PointsEntry {
                projecttype: projecttype.clone(),
                points: *points,
            }));
        }
    }

    pub fn get(&self, projecttype: &str) -> Result<PointsEntry> {
        self.all()?
            .into_iter()
            .find(|entry| entry.projecttype == projecttype)
            .ok_or_else(|| Error::not_found("points config", projecttype))
    }

    /// Points awarded for a project type; unknown types are worth 0.
    pub fn points_for(&self, projecttype: &str) -> Result<f64> {
        match self.get(projecttype) {
            Ok(entry) => Ok(entry.points),
            Err(Error::NotFound { .. }) => {
                tracing::debug!(projecttype, "no points configured, using 0");
                Ok(0.0)
            }
            Err(err) => Err(err),
        }
    }

    pub fn set(&self, projecttype: &str, points: f64) -> Result<PointsEntry> {
        let projecttype = projecttype.trim();
        if projecttype.is_empty() {
            return Err(Error::MissingField("projecttype".to_string()));
        }
        if !points.is_finite() || points < 0.0 {
            return Err(Error::invalid("points", "must be a non-negative number"));
        }

        self.storage
            .update(Collection::Points, |entries: &mut Vec<PointsEntry>| {
                // Seed first so a later read does not mistake the table for absent.
                self.seed(entries);
                let entry = match entries.iter_mut().find(|e| e.projecttype == projecttype) {
                    Some(entry) => {
                        entry.points = points;
                        entry.clone()
                    }
                    None => {
                        let entry = PointsEntry {
                            projecttype: projecttype.to_string(),
                            points,
                        };
                        entries.push(entry.clone());
                        entry
                    }
                };
                Ok(entry)
            })
    }
}
