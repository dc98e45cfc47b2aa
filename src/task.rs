//! Logged tasks and their approval state.
//!
//! Tasks are stored in `tasks.json`. Points are looked up from the
//! [`PointsTable`] when a task is written and then frozen on the record.
//! Edits that flip `approval` to `approved` feed the assignment counters
//! through [`crate::reconcile`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::assigned::AssignmentStore;
use crate::config::Config;
use crate::dates;
use crate::error::{Error, Result};
use crate::points::PointsTable;
use crate::reconcile::{self, ReconcileOutcome, TaskRecords};
use crate::storage::{Collection, Storage};

/// Approval state of a task. There is no rejected state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    #[default]
    Pending,
    Approved,
}

impl fmt::Display for Approval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approval::Pending => write!(f, "pending"),
            Approval::Approved => write!(f, "approved"),
        }
    }
}

impl FromStr for Approval {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Approval::Pending),
            "approved" => Ok(Approval::Approved),
            other => Err(Error::InvalidApproval(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub eid: String,
    pub name: String,
    pub date: String,
    pub projectname: String,
    pub projecttype: String,
    pub projectstatus: String,
    pub category: String,
    pub points: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default)]
    pub approval: Approval,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Fields submitted when logging a task
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTask {
    pub eid: String,
    pub name: String,
    pub date: String,
    pub projectname: String,
    pub projecttype: String,
    pub projectstatus: String,
    pub category: String,
    #[serde(default)]
    pub note: Option<String>,
}

/// Admin edit; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub eid: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub projectname: Option<String>,
    pub projecttype: Option<String>,
    pub projectstatus: Option<String>,
    pub category: Option<String>,
    pub points: Option<f64>,
    pub note: Option<String>,
    pub approval: Option<String>,
}

/// Exact-match filters for the admin task list
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub eid: Option<String>,
    pub date: Option<String>,
    pub projecttype: Option<String>,
    pub projectstatus: Option<String>,
    pub category: Option<String>,
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().map_or(true, |f| f == value)
        }
        eq(&self.eid, &task.eid)
            && eq(&self.date, &task.date)
            && eq(&self.projecttype, &task.projecttype)
            && eq(&self.projectstatus, &task.projectstatus)
            && eq(&self.category, &task.category)
    }
}

/// A committed task write plus the outcome of its counter side effect
#[derive(Debug, Clone, Serialize)]
pub struct TaskEdit {
    pub task: Task,
    pub reconcile: ReconcileOutcome,
}

#[derive(Debug, Clone)]
pub struct TaskStore {
    storage: Storage,
    points: PointsTable,
    assignments: AssignmentStore,
    allow_approval_regression: bool,
}

impl TaskStore {
    pub fn new(storage: Storage, config: &Config) -> Self {
        Self {
            points: PointsTable::new(storage.clone(), &config.points),
            assignments: AssignmentStore::new(storage.clone()),
            allow_approval_regression: config.tasks.allow_approval_regression,
            storage,
        }
    }

    pub fn points(&self) -> &PointsTable {
        &self.points
    }

    pub fn assignments(&self) -> &AssignmentStore {
        &self.assignments
    }

    pub fn create(&self, input: NewTask) -> Result<Task> {
        let eid = required("eid", &input.eid)?;
        let name = required("name", &input.name)?;
        let date = dates::parse_day("date", &required("date", &input.date)?)?;
        let projectname = required("projectname", &input.projectname)?;
        let projecttype = required("projecttype", &input.projecttype)?;
        let projectstatus = required("projectstatus", &input.projectstatus)?;
        let category = required("category", &input.category)?;
        let points = self.points.points_for(&projecttype)?;

        let now = Utc::now();
        let task = Task {
            id: Ulid::new().to_string(),
            eid,
            name,
            date,
            projectname,
            projecttype,
            projectstatus,
            category,
            points,
            note: normalize_note(input.note),
            approval: Approval::Pending,
            created_at: now,
            updated_at: now,
        };

        self.storage.update(Collection::Tasks, |tasks: &mut Vec<Task>| {
            tasks.push(task.clone());
            Ok(())
        })?;
        tracing::info!(id = %task.id, eid = %task.eid, points = task.points, "task logged");
        Ok(task)
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        self.task_records()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::not_found("task", id))
    }

    /// Every task, newest date first.
    pub fn all(&self) -> Result<Vec<Task>> {
        let mut tasks = self.task_records()?;
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let mut tasks = self.all()?;
        tasks.retain(|t| filter.matches(t));
        Ok(tasks)
    }

    /// Tasks of one employee within a `YYYY-MM` month.
    pub fn month(&self, eid: &str, month: &str) -> Result<Vec<Task>> {
        let eid = required("eid", eid)?;
        let month = dates::parse_month("month", month)?;
        let (start, end) = dates::month_range(&month);
        let mut tasks = self.all()?;
        tasks.retain(|t| t.eid == eid && t.date >= start && t.date <= end);
        Ok(tasks)
    }

    pub fn on_date(&self, date: &str) -> Result<Vec<Task>> {
        let date = dates::parse_day("date", date)?;
        self.list(&TaskFilter {
            date: Some(date),
            ..Default::default()
        })
    }

    pub fn today(&self) -> Result<Vec<Task>> {
        self.on_date(&dates::today())
    }

    /// Apply an admin edit. Any field may change.
    pub fn update(&self, id: &str, changes: TaskUpdate) -> Result<TaskEdit> {
        let approval = changes
            .approval
            .as_deref()
            .map(str::parse::<Approval>)
            .transpose()?;
        // Resolve points outside the tasks lock.
        let repriced = match (&changes.projecttype, changes.points) {
            (_, Some(points)) => {
                if !points.is_finite() || points < 0.0 {
                    return Err(Error::invalid("points", "must be a non-negative number"));
                }
                Some(points)
            }
            (Some(projecttype), None) => Some(self.points.points_for(projecttype.trim())?),
            (None, None) => None,
        };

        let (previous, task) = self.storage.update(Collection::Tasks, |tasks: &mut Vec<Task>| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or_else(|| Error::not_found("task", id))?;
            let previous = task.approval;

            if let Some(value) = &changes.eid {
                task.eid = required("eid", value)?;
            }
            if let Some(value) = &changes.name {
                task.name = required("name", value)?;
            }
            if let Some(value) = &changes.date {
                task.date = dates::parse_day("date", value)?;
            }
            if let Some(value) = &changes.projectname {
                task.projectname = required("projectname", value)?;
            }
            if let Some(value) = &changes.projecttype {
                let projecttype = required("projecttype", value)?;
                // Resubmitting the same type keeps the frozen points.
                let retyped = projecttype != task.projecttype;
                if let Some(points) = repriced.filter(|_| retyped || changes.points.is_some()) {
                    task.points = points;
                }
                task.projecttype = projecttype;
            } else if let Some(points) = repriced {
                task.points = points;
            }
            if let Some(value) = &changes.projectstatus {
                task.projectstatus = required("projectstatus", value)?;
            }
            if let Some(value) = &changes.category {
                task.category = required("category", value)?;
            }
            if let Some(note) = &changes.note {
                task.note = normalize_note(Some(note.clone()));
            }
            if let Some(approval) = approval {
                check_regression(self.allow_approval_regression, previous, approval)?;
                task.approval = approval;
            }
            task.updated_at = Utc::now();
            Ok((previous, task.clone()))
        })?;

        tracing::info!(id = %task.id, approval = %task.approval, "task updated");
        let reconcile = reconcile::reconcile_after_edit(&self.assignments, previous, &task);
        Ok(TaskEdit { task, reconcile })
    }

    /// Set only the approval field.
    pub fn set_approval(&self, id: &str, value: &str) -> Result<TaskEdit> {
        self.update(
            id,
            TaskUpdate {
                approval: Some(value.to_string()),
                ..Default::default()
            },
        )
    }

    /// Delete a task. Assignment counters are left as they are.
    pub fn delete(&self, id: &str) -> Result<Task> {
        let task = self.storage.update(Collection::Tasks, |tasks: &mut Vec<Task>| {
            let idx = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or_else(|| Error::not_found("task", id))?;
            Ok(tasks.remove(idx))
        })?;
        tracing::info!(id = %task.id, "task deleted");
        Ok(task)
    }

    /// Rewrite the frozen points of every saved task of a project type.
    ///
    /// Returns the number of tasks whose points changed.
    pub fn apply_points(&self, projecttype: &str, points: f64) -> Result<usize> {
        let changed = self.storage.update(Collection::Tasks, |tasks: &mut Vec<Task>| {
            let now = Utc::now();
            let mut changed = 0;
            for task in tasks.iter_mut().filter(|t| t.projecttype == projecttype) {
                if task.points != points {
                    task.points = points;
                    task.updated_at = now;
                    changed += 1;
                }
            }
            Ok(changed)
        })?;
        tracing::info!(projecttype, points, changed, "points applied to saved tasks");
        Ok(changed)
    }
}

impl TaskRecords for TaskStore {
    fn task_records(&self) -> Result<Vec<Task>> {
        self.storage.read(Collection::Tasks)
    }
}

fn check_regression(allowed: bool, previous: Approval, next: Approval) -> Result<()> {
    if !allowed && previous == Approval::Approved && next == Approval::Pending {
        return Err(Error::invalid(
            "approval",
            "approved tasks cannot return to pending",
        ));
    }
    Ok(())
}

fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingField(field.to_string()));
    }
    Ok(trimmed.to_string())
}

fn normalize_note(note: Option<String>) -> Option<String> {
    note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}
