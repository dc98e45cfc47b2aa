//! Dropdown value lists for project types and project statuses.
//!
//! Each kind is a singleton record holding a mutable list of strings,
//! seeded from `[options]` the first time it is read.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::OptionsConfig;
use crate::error::{Error, Result};
use crate::storage::{Collection, Storage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    #[serde(rename = "projecttype")]
    ProjectType,
    #[serde(rename = "projectstatus")]
    ProjectStatus,
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionKind::ProjectType => write!(f, "projecttype"),
            OptionKind::ProjectStatus => write!(f, "projectstatus"),
        }
    }
}

impl FromStr for OptionKind {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "type" | "types" | "projecttype" | "projecttypes" => Ok(OptionKind::ProjectType),
            "status" | "statuses" | "projectstatus" | "projectstatuses" => {
                Ok(OptionKind::ProjectStatus)
            }
            _ => Err(Error::InvalidArgument(format!(
                "invalid option kind '{s}': must be type or status"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSet {
    pub kind: OptionKind,
    pub values: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OptionsStore {
    storage: Storage,
    seeds: OptionsConfig,
}

impl OptionsStore {
    pub fn new(storage: Storage, seeds: OptionsConfig) -> Self {
        Self { storage, seeds }
    }

    fn seed_for(&self, kind: OptionKind) -> Vec<String> {
        match kind {
            OptionKind::ProjectType => self.seeds.project_types.clone(),
            OptionKind::ProjectStatus => self.seeds.project_statuses.clone(),
        }
    }

    /// Run `f` against the list for `kind`, creating it from seeds if absent.
    fn with_set<R, F>(&self, kind: OptionKind, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<String>) -> Result<R>,
    {
        self.storage
            .update(Collection::Options, |sets: &mut Vec<OptionSet>| {
                let idx = match sets.iter().position(|set| set.kind == kind) {
                    Some(idx) => idx,
                    None => {
                        tracing::info!(%kind, "seeding option list");
                        sets.push(OptionSet {
                            kind,
                            values: self.seed_for(kind),
                        });
                        sets.len() - 1
                    }
                };
                f(&mut sets[idx].values)
            })
    }

    pub fn list(&self, kind: OptionKind) -> Result<Vec<String>> {
        self.with_set(kind, |values| Ok(values.clone()))
    }

    pub fn add(&self, kind: OptionKind, value: &str) -> Result<Vec<String>> {
        let value = required_value(value)?;
        self.with_set(kind, |values| {
            if contains_ci(values, &value) {
                return Err(Error::AlreadyExists(format!("{kind} '{value}'")));
            }
            values.push(value);
            Ok(values.clone())
        })
    }

    pub fn rename(&self, kind: OptionKind, old: &str, new: &str) -> Result<Vec<String>> {
        let new = required_value(new)?;
        let old = old.trim().to_string();
        self.with_set(kind, |values| {
            let idx = values
                .iter()
                .position(|v| *v == old)
                .ok_or_else(|| Error::not_found("option", old.clone()))?;
            let clashes = values
                .iter()
                .enumerate()
                .any(|(i, v)| i != idx && v.eq_ignore_ascii_case(&new));
            if clashes {
                return Err(Error::AlreadyExists(format!("{kind} '{new}'")));
            }
            values[idx] = new;
            Ok(values.clone())
        })
    }

    pub fn remove(&self, kind: OptionKind, value: &str) -> Result<Vec<String>> {
        let value = value.trim().to_string();
        self.with_set(kind, |values| {
            let idx = values
                .iter()
                .position(|v| *v == value)
                .ok_or_else(|| Error::not_found("option", value.clone()))?;
            values.remove(idx);
            Ok(values.clone())
        })
    }
}

fn required_value(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingField("value".to_string()));
    }
    Ok(trimmed.to_string())
}

fn contains_ci(values: &[String], value: &str) -> bool {
    values.iter().any(|v| v.eq_ignore_ascii_case(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> OptionsStore {
        OptionsStore::new(Storage::new(dir.path()), OptionsConfig::default())
    }

    #[test]
    fn lists_are_seeded_on_first_read() {
        let dir = TempDir::new().unwrap();
        let options = store(&dir);
        assert_eq!(
            options.list(OptionKind::ProjectType).unwrap(),
            OptionsConfig::default().project_types
        );
        assert_eq!(
            options.list(OptionKind::ProjectStatus).unwrap(),
            OptionsConfig::default().project_statuses
        );
    }

    #[test]
    fn add_rejects_duplicates_case_insensitively() {
        let dir = TempDir::new().unwrap();
        let options = store(&dir);

        let values = options.add(OptionKind::ProjectType, "Podcast").unwrap();
        assert!(values.contains(&"Podcast".to_string()));

        let err = options.add(OptionKind::ProjectType, "podcast").unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)));
        assert!(matches!(
            options.add(OptionKind::ProjectType, "  "),
            Err(Error::MissingField(_))
        ));
    }

    #[test]
    fn rename_and_remove() {
        let dir = TempDir::new().unwrap();
        let options = store(&dir);

        let values = options
            .rename(OptionKind::ProjectStatus, "On Hold", "Paused")
            .unwrap();
        assert!(values.contains(&"Paused".to_string()));
        assert!(!values.contains(&"On Hold".to_string()));

        assert!(matches!(
            options.rename(OptionKind::ProjectStatus, "Missing", "Other"),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            options.rename(OptionKind::ProjectStatus, "Paused", "completed"),
            Err(Error::AlreadyExists(_))
        ));

        let values = options.remove(OptionKind::ProjectStatus, "Paused").unwrap();
        assert!(!values.contains(&"Paused".to_string()));
        assert!(matches!(
            options.remove(OptionKind::ProjectStatus, "Paused"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn kind_parses_cli_spellings() {
        assert_eq!("type".parse::<OptionKind>().unwrap(), OptionKind::ProjectType);
        assert_eq!(
            "projectstatuses".parse::<OptionKind>().unwrap(),
            OptionKind::ProjectStatus
        );
        assert!("colour".parse::<OptionKind>().is_err());
    }
}
