//! Approval counting and the approval -> completed counter projection.
//!
//! Assignment counters are derived state. A task edit commits first and the
//! counter increment follows as a separate locked write; if that second write
//! fails the counters remain stale until corrected by hand, and the edit
//! reports [`ReconcileOutcome::Failed`].

use serde::Serialize;

use crate::assigned::{AssignmentStore, GroupKey};
use crate::dates;
use crate::error::Result;
use crate::task::{Approval, Task};

/// Source of task records for approval counting.
pub trait TaskRecords {
    fn task_records(&self) -> Result<Vec<Task>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalCounts {
    pub approved: u64,
    pub pending: u64,
}

/// Count approved and pending tasks for one (eid, project, type) within an
/// inclusive `YYYY-MM-DD` range.
pub fn count_approvals(
    tasks: &[Task],
    eid: &str,
    project_name: &str,
    project_type: &str,
    start: &str,
    end: &str,
) -> ApprovalCounts {
    tasks
        .iter()
        .filter(|t| {
            t.eid == eid
                && t.projectname == project_name
                && t.projecttype == project_type
                && t.date.as_str() >= start
                && t.date.as_str() <= end
        })
        .fold(ApprovalCounts::default(), |mut counts, t| {
            match t.approval {
                Approval::Approved => counts.approved += 1,
                Approval::Pending => counts.pending += 1,
            }
            counts
        })
}

/// Like [`count_approvals`] against a task source. A failed read counts as
/// zero of each.
pub fn compute_approval_counts(
    source: &impl TaskRecords,
    eid: &str,
    project_name: &str,
    project_type: &str,
    start: &str,
    end: &str,
) -> ApprovalCounts {
    match source.task_records() {
        Ok(tasks) => count_approvals(&tasks, eid, project_name, project_type, start, end),
        Err(err) => {
            tracing::warn!(eid, project_name, project_type, error = %err, "approval count failed, using zero");
            ApprovalCounts::default()
        }
    }
}

/// Rollup label: approved iff at least one matching task is approved.
pub fn derive_approval_label(approved: u64, _pending: u64) -> Approval {
    if approved > 0 {
        Approval::Approved
    } else {
        Approval::Pending
    }
}

/// Only a transition into `approved` moves counters.
pub fn should_reconcile(previous: Approval, current: Approval) -> bool {
    current == Approval::Approved && previous != Approval::Approved
}

/// Add one completed unit for the task's (eid, month, year, projecttype).
///
/// Returns `Ok(false)` without touching storage when the edit is not a
/// transition into `approved`.
pub fn on_approval_transition(
    assignments: &AssignmentStore,
    previous: Approval,
    task: &Task,
) -> Result<bool> {
    Ok(apply_transition(assignments, previous, task)?.is_some())
}

fn apply_transition(
    assignments: &AssignmentStore,
    previous: Approval,
    task: &Task,
) -> Result<Option<ReconcileOutcome>> {
    if !should_reconcile(previous, task.approval) {
        return Ok(None);
    }
    let (month, year) = dates::month_year_of(&task.date)?;
    let key = GroupKey::new(task.eid.clone(), month, year);
    let entry = assignments.increment_completed(key, &task.projecttype)?;
    tracing::info!(
        eid = %task.eid,
        month,
        year,
        project_type = %entry.project_type,
        completed = entry.completed,
        "completed counter incremented"
    );
    Ok(Some(ReconcileOutcome::Applied {
        eid: task.eid.clone(),
        month,
        year,
        project_type: entry.project_type,
        completed: entry.completed,
    }))
}

/// What happened to the assignment counters after a task edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    NotTriggered,
    Applied {
        eid: String,
        month: u32,
        year: i32,
        project_type: String,
        completed: u32,
    },
    Failed {
        reason: String,
    },
}

/// Best-effort reconciliation for a committed task edit. Errors are logged
/// and reported, never propagated.
pub fn reconcile_after_edit(
    assignments: &AssignmentStore,
    previous: Approval,
    task: &Task,
) -> ReconcileOutcome {
    match apply_transition(assignments, previous, task) {
        Ok(Some(outcome)) => outcome,
        Ok(None) => ReconcileOutcome::NotTriggered,
        Err(err) => {
            tracing::warn!(id = %task.id, eid = %task.eid, error = %err, "assignment reconciliation failed");
            ReconcileOutcome::Failed {
                reason: err.to_string(),
            }
        }
    }
}
