//! Named client projects shown in the task form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::{Collection, Storage};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub active: bool,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    storage: Storage,
}

impl ProjectStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn add(&self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::MissingField("name".to_string()));
        }
        let project = Project {
            id: Ulid::new().to_string(),
            name: name.to_string(),
            active: true,
            created_at: Utc::now(),
        };
        self.storage
            .update(Collection::Projects, |projects: &mut Vec<Project>| {
                if projects.iter().any(|p| p.name.eq_ignore_ascii_case(name)) {
                    return Err(Error::AlreadyExists(format!("project '{name}'")));
                }
                projects.push(project.clone());
                Ok(())
            })?;
        tracing::info!(id = %project.id, name = %project.name, "project added");
        Ok(project)
    }

    /// Projects sorted by name; inactive ones only when `include_inactive`.
    pub fn list(&self, include_inactive: bool) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self.storage.read(Collection::Projects)?;
        if !include_inactive {
            projects.retain(|p| p.active);
        }
        projects.sort_by_key(|p| p.name.to_lowercase());
        Ok(projects)
    }

    pub fn deactivate(&self, selector: &str) -> Result<Project> {
        self.storage
            .update(Collection::Projects, |projects: &mut Vec<Project>| {
                let idx = resolve(projects, selector)?;
                projects[idx].active = false;
                Ok(projects[idx].clone())
            })
    }

    pub fn delete(&self, selector: &str) -> Result<Project> {
        self.storage
            .update(Collection::Projects, |projects: &mut Vec<Project>| {
                let idx = resolve(projects, selector)?;
                Ok(projects.remove(idx))
            })
    }
}

/// Find a project by exact name (case-insensitive), exact id, or unique id
/// prefix.
fn resolve(projects: &[Project], selector: &str) -> Result<usize> {
    let needle = selector.trim();
    if needle.is_empty() {
        return Err(Error::InvalidArgument("project cannot be empty".to_string()));
    }
    if let Some(idx) = projects
        .iter()
        .position(|p| p.id.eq_ignore_ascii_case(needle) || p.name.eq_ignore_ascii_case(needle))
    {
        return Ok(idx);
    }

    let lowered = needle.to_ascii_lowercase();
    let matches: Vec<usize> = projects
        .iter()
        .enumerate()
        .filter(|(_, p)| p.id.to_ascii_lowercase().starts_with(&lowered))
        .map(|(idx, _)| idx)
        .collect();
    match matches.as_slice() {
        [idx] => Ok(*idx),
        [] => Err(Error::not_found("project", needle)),
        many => Err(Error::InvalidArgument(format!(
            "ambiguous project '{}': {}",
            needle,
            many.iter()
                .map(|idx| projects[*idx].id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
