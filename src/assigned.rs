//! Monthly assigned-vs-completed counts per employee.
//!
//! One grouped document per (eid, month, year), each holding at most one
//! entry per project type. The (eid, month, year) key is unique: a blind
//! insert of an existing key is a constraint violation, so callers go through
//! [`AssignmentStore::find_group`] / [`AssignmentStore::upsert_group`] or the
//! locked helpers that combine both.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::storage::{Collection, Storage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedEntry {
    pub project_type: String,
    #[serde(default)]
    pub assigned: u32,
    #[serde(default)]
    pub completed: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub eid: String,
    pub month: u32,
    pub year: i32,
}

impl GroupKey {
    pub fn new(eid: impl Into<String>, month: u32, year: i32) -> Self {
        Self {
            eid: eid.into(),
            month,
            year,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}::{}", self.eid, self.month, self.year)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedGroup {
    pub id: String,
    pub eid: String,
    pub month: u32,
    pub year: i32,
    #[serde(default)]
    pub tasks: Vec<AssignedEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AssignedGroup {
    pub fn new(key: GroupKey, tasks: Vec<AssignedEntry>) -> Self {
        let now = Utc::now();
        Self {
            id: Ulid::new().to_string(),
            eid: key.eid,
            month: key.month,
            year: key.year,
            tasks,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> GroupKey {
        GroupKey::new(self.eid.clone(), self.month, self.year)
    }

    pub fn entry(&self, project_type: &str) -> Option<&AssignedEntry> {
        self.tasks.iter().find(|e| e.project_type == project_type)
    }

    /// Locate the entry for a project type, appending a zeroed one if absent.
    pub fn entry_mut(&mut self, project_type: &str) -> &mut AssignedEntry {
        let idx = match self.tasks.iter().position(|e| e.project_type == project_type) {
            Some(idx) => idx,
            None => {
                self.tasks.push(AssignedEntry {
                    project_type: project_type.to_string(),
                    assigned: 0,
                    completed: 0,
                });
                self.tasks.len() - 1
            }
        };
        &mut self.tasks[idx]
    }
}

#[derive(Debug, Clone, Default)]
pub struct AssignmentFilter {
    pub eid: Option<String>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl AssignmentFilter {
    fn matches(&self, group: &AssignedGroup) -> bool {
        self.eid.as_deref().map_or(true, |eid| group.eid == eid)
            && self.month.map_or(true, |month| group.month == month)
            && self.year.map_or(true, |year| group.year == year)
    }
}

#[derive(Debug, Clone)]
pub struct AssignmentStore {
    storage: Storage,
}

impl AssignmentStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Locked access to every group; used for multi-step merges.
    pub(crate) fn with_groups<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<AssignedGroup>) -> Result<R>,
    {
        self.storage.update(Collection::AssignedTasks, f)
    }

    pub fn list(&self, filter: &AssignmentFilter) -> Result<Vec<AssignedGroup>> {
        let mut groups: Vec<AssignedGroup> = self.storage.read(Collection::AssignedTasks)?;
        groups.retain(|g| filter.matches(g));
        groups.sort_by(|a, b| {
            b.year
                .cmp(&a.year)
                .then_with(|| b.month.cmp(&a.month))
                .then_with(|| a.eid.cmp(&b.eid))
        });
        Ok(groups)
    }

    pub fn get(&self, id: &str) -> Result<AssignedGroup> {
        let groups: Vec<AssignedGroup> = self.storage.read(Collection::AssignedTasks)?;
        groups
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| Error::not_found("assigned task", id))
    }

    pub fn find_group(&self, eid: &str, month: u32, year: i32) -> Result<Option<AssignedGroup>> {
        let groups: Vec<AssignedGroup> = self.storage.read(Collection::AssignedTasks)?;
        Ok(groups
            .into_iter()
            .find(|g| g.eid == eid && g.month == month && g.year == year))
    }

    /// Insert a new group. Fails with [`Error::Conflict`] if the key exists.
    pub fn insert_group(&self, group: AssignedGroup) -> Result<AssignedGroup> {
        validate_group(&group)?;
        self.with_groups(|groups| {
            insert_into(groups, group.clone())?;
            Ok(group)
        })
    }

    /// Replace the group with the same id, or insert it if the id is new.
    ///
    /// The (eid, month, year) key must not belong to a different document.
    pub fn upsert_group(&self, mut group: AssignedGroup) -> Result<AssignedGroup> {
        validate_group(&group)?;
        self.with_groups(|groups| {
            let key = group.key();
            if groups.iter().any(|g| g.id != group.id && g.key() == key) {
                return Err(Error::Conflict(format!("assigned task {key} already exists")));
            }
            group.updated_at = Utc::now();
            match groups.iter_mut().find(|g| g.id == group.id) {
                Some(existing) => *existing = group.clone(),
                None => groups.push(group.clone()),
            }
            Ok(group)
        })
    }

    /// Remove one project-type entry. The group is kept even when emptied.
    pub fn delete_task_entry(&self, id: &str, project_type: &str) -> Result<AssignedGroup> {
        self.with_groups(|groups| {
            let group = groups
                .iter_mut()
                .find(|g| g.id == id)
                .ok_or_else(|| Error::not_found("assigned task", id))?;
            let idx = group
                .tasks
                .iter()
                .position(|e| e.project_type == project_type)
                .ok_or_else(|| Error::not_found("assigned task entry", project_type))?;
            group.tasks.remove(idx);
            group.updated_at = Utc::now();
            Ok(group.clone())
        })
    }

    pub fn delete_group(&self, id: &str) -> Result<AssignedGroup> {
        self.with_groups(|groups| {
            let idx = groups
                .iter()
                .position(|g| g.id == id)
                .ok_or_else(|| Error::not_found("assigned task", id))?;
            Ok(groups.remove(idx))
        })
    }

    /// Add one completed unit for a project type, creating the group and
    /// entry as needed. `assigned` is never touched.
    pub fn increment_completed(&self, key: GroupKey, project_type: &str) -> Result<AssignedEntry> {
        if project_type.trim().is_empty() {
            return Err(Error::MissingField("projecttype".to_string()));
        }
        self.with_groups(|groups| {
            let idx = match groups.iter().position(|g| g.key() == key) {
                Some(idx) => idx,
                None => {
                    let group = AssignedGroup::new(key.clone(), Vec::new());
                    validate_group(&group)?;
                    groups.push(group);
                    groups.len() - 1
                }
            };
            let group = &mut groups[idx];
            let entry = group.entry_mut(project_type);
            entry.completed = entry
                .completed
                .checked_add(1)
                .ok_or_else(|| Error::invalid("completed", "counter overflow"))?;
            let entry = entry.clone();
            group.updated_at = Utc::now();
            Ok(entry)
        })
    }
}

pub(crate) fn insert_into(groups: &mut Vec<AssignedGroup>, group: AssignedGroup) -> Result<()> {
    let key = group.key();
    if groups.iter().any(|g| g.key() == key) {
        return Err(Error::Conflict(format!("assigned task {key} already exists")));
    }
    if groups.iter().any(|g| g.id == group.id) {
        return Err(Error::Conflict(format!("assigned task id {} already exists", group.id)));
    }
    groups.push(group);
    Ok(())
}

pub(crate) fn validate_group(group: &AssignedGroup) -> Result<()> {
    if group.eid.trim().is_empty() {
        return Err(Error::MissingField("eid".to_string()));
    }
    if !(1..=12).contains(&group.month) {
        return Err(Error::invalid("month", format!("{} is not 1-12", group.month)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(project_type: &str, assigned: u32, completed: u32) -> AssignedEntry {
        AssignedEntry {
            project_type: project_type.to_string(),
            assigned,
            completed,
        }
    }

    fn store(dir: &TempDir) -> AssignmentStore {
        AssignmentStore::new(Storage::new(dir.path()))
    }

    #[test]
    fn duplicate_insert_is_a_constraint_violation() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![entry("Film", 5, 0)]))
            .unwrap();
        let err = store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.list(&AssignmentFilter::default()).unwrap().len(), 1);
    }

    #[test]
    fn upsert_replaces_by_id_but_guards_key() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut group = store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![entry("Film", 5, 0)]))
            .unwrap();
        group.tasks[0].assigned = 7;
        store.upsert_group(group.clone()).unwrap();
        assert_eq!(store.get(&group.id).unwrap().tasks[0].assigned, 7);

        let other = AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![]);
        assert!(matches!(store.upsert_group(other), Err(Error::Conflict(_))));
    }

    #[test]
    fn deleting_last_entry_keeps_empty_group() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let group = store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![entry("Film", 5, 0)]))
            .unwrap();
        let updated = store.delete_task_entry(&group.id, "Film").unwrap();
        assert!(updated.tasks.is_empty());

        let found = store.find_group("E1", 6, 2024).unwrap().expect("group persists");
        assert!(found.tasks.is_empty());

        assert!(matches!(
            store.delete_task_entry(&group.id, "Film"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn delete_group_removes_document() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let group = store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 6, 2024), vec![]))
            .unwrap();
        store.delete_group(&group.id).unwrap();
        assert!(store.find_group("E1", 6, 2024).unwrap().is_none());
        assert!(matches!(store.delete_group(&group.id), Err(Error::NotFound { .. })));
    }

    #[test]
    fn increment_creates_group_and_entry() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let entry = store
            .increment_completed(GroupKey::new("E1", 6, 2024), "Film")
            .unwrap();
        assert_eq!(entry.assigned, 0);
        assert_eq!(entry.completed, 1);

        store
            .increment_completed(GroupKey::new("E1", 6, 2024), "Film")
            .unwrap();
        let group = store.find_group("E1", 6, 2024).unwrap().unwrap();
        assert_eq!(group.tasks, vec![AssignedEntry {
            project_type: "Film".to_string(),
            assigned: 0,
            completed: 2,
        }]);
    }

    #[test]
    fn list_filters_by_key_parts() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        for (eid, month, year) in [("E1", 6, 2024), ("E1", 7, 2024), ("E2", 6, 2024)] {
            store
                .insert_group(AssignedGroup::new(GroupKey::new(eid, month, year), vec![]))
                .unwrap();
        }

        let filter = AssignmentFilter {
            eid: Some("E1".to_string()),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).unwrap().len(), 2);

        let filter = AssignmentFilter {
            month: Some(6),
            year: Some(2024),
            ..Default::default()
        };
        assert_eq!(store.list(&filter).unwrap().len(), 2);
    }

    #[test]
    fn rejects_out_of_range_month() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let err = store
            .insert_group(AssignedGroup::new(GroupKey::new("E1", 13, 2024), vec![]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidValue { .. }));
    }
}
