//! Per-project monthly assignment counts.
//!
//! These sit alongside the grouped assignment documents in [`crate::assigned`]
//! and are not reconciled with them. Each record carries an approval label
//! that is recomputed from the matching tasks every time it is listed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::dates;
use crate::error::{Error, Result};
use crate::reconcile::{self, TaskRecords};
use crate::storage::{Collection, Storage};
use crate::task::{Approval, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyTask {
    pub id: String,
    pub eid: String,
    pub projectname: String,
    pub projecttype: String,
    pub month: String,
    pub count: u32,
    #[serde(default)]
    pub approval: Approval,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl MonthlyTask {
    fn same_key(&self, other: &MonthlyInput) -> bool {
        self.eid == other.eid
            && self.projectname == other.projectname
            && self.projecttype == other.projecttype
            && self.month == other.month
    }
}

/// Upsert body, keyed by (eid, projectname, projecttype, month)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonthlyInput {
    #[serde(default)]
    pub eid: String,
    #[serde(default)]
    pub projectname: String,
    #[serde(default)]
    pub projecttype: String,
    #[serde(default)]
    pub month: String,
    #[serde(default)]
    pub count: u32,
}

impl MonthlyInput {
    fn validated(self) -> Result<Self> {
        Ok(Self {
            eid: required("eid", &self.eid)?,
            projectname: required("projectname", &self.projectname)?,
            projecttype: required("projecttype", &self.projecttype)?,
            month: dates::parse_month("month", &self.month)?,
            count: self.count,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthlyUpdate {
    pub eid: Option<String>,
    pub projectname: Option<String>,
    pub projecttype: Option<String>,
    pub month: Option<String>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBulkOutcome {
    pub saved: Vec<MonthlyTask>,
    pub skipped: usize,
}

#[derive(Debug, Clone)]
pub struct MonthlyTaskStore {
    storage: Storage,
}

impl MonthlyTaskStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Set `count` for a key, creating the record if needed.
    pub fn upsert(&self, input: MonthlyInput) -> Result<MonthlyTask> {
        let input = input.validated()?;
        let task = self
            .storage
            .update(Collection::MonthlyTasks, |records: &mut Vec<MonthlyTask>| {
                Ok(upsert_into(records, input))
            })?;
        tracing::info!(id = %task.id, eid = %task.eid, month = %task.month, "monthly task saved");
        Ok(task)
    }

    /// Upsert many rows under one lock. Rows with a blank eid are skipped;
    /// any other invalid row rejects the batch.
    pub fn bulk(&self, rows: Vec<MonthlyInput>) -> Result<MonthlyBulkOutcome> {
        let mut skipped = 0;
        let mut valid = Vec::with_capacity(rows.len());
        for row in rows {
            if row.eid.trim().is_empty() {
                skipped += 1;
                continue;
            }
            valid.push(row.validated()?);
        }

        let saved = self
            .storage
            .update(Collection::MonthlyTasks, |records: &mut Vec<MonthlyTask>| {
                Ok(valid
                    .into_iter()
                    .map(|row| upsert_into(records, row))
                    .collect::<Vec<_>>())
            })?;
        tracing::info!(saved = saved.len(), skipped, "monthly bulk upsert");
        Ok(MonthlyBulkOutcome { saved, skipped })
    }

    /// Records matching the optional eid and month filters, with approval
    /// labels recomputed from `source`.
    pub fn list(
        &self,
        eid: Option<&str>,
        month: Option<&str>,
        source: &impl TaskRecords,
    ) -> Result<Vec<MonthlyTask>> {
        let month = month.map(|m| dates::parse_month("month", m)).transpose()?;
        let mut records: Vec<MonthlyTask> = self.storage.read(Collection::MonthlyTasks)?;
        records.retain(|r| {
            eid.map_or(true, |e| r.eid == e) && month.as_deref().map_or(true, |m| r.month == m)
        });

        let tasks = load_tasks(source);
        for record in &mut records {
            let (start, end) = dates::month_range(&record.month);
            let counts = reconcile::count_approvals(
                &tasks,
                &record.eid,
                &record.projectname,
                &record.projecttype,
                &start,
                &end,
            );
            record.approval = reconcile::derive_approval_label(counts.approved, counts.pending);
        }
        records.sort_by(|a, b| {
            b.month
                .cmp(&a.month)
                .then_with(|| a.eid.cmp(&b.eid))
                .then_with(|| a.projectname.cmp(&b.projectname))
        });
        Ok(records)
    }

    pub fn update(&self, id: &str, changes: MonthlyUpdate) -> Result<MonthlyTask> {
        let task = self
            .storage
            .update(Collection::MonthlyTasks, |records: &mut Vec<MonthlyTask>| {
                let idx = records
                    .iter()
                    .position(|r| r.id == id)
                    .ok_or_else(|| Error::not_found("monthly task", id))?;
                let current = &records[idx];
                let next = MonthlyInput {
                    eid: changes.eid.clone().unwrap_or_else(|| current.eid.clone()),
                    projectname: changes
                        .projectname
                        .clone()
                        .unwrap_or_else(|| current.projectname.clone()),
                    projecttype: changes
                        .projecttype
                        .clone()
                        .unwrap_or_else(|| current.projecttype.clone()),
                    month: changes.month.clone().unwrap_or_else(|| current.month.clone()),
                    count: changes.count.unwrap_or(current.count),
                }
                .validated()?;

                if records.iter().any(|r| r.id != id && r.same_key(&next)) {
                    return Err(Error::Conflict(format!(
                        "monthly task {}::{}::{}::{} already exists",
                        next.eid, next.projectname, next.projecttype, next.month
                    )));
                }

                let record = &mut records[idx];
                record.eid = next.eid;
                record.projectname = next.projectname;
                record.projecttype = next.projecttype;
                record.month = next.month;
                record.count = next.count;
                record.updated_at = Utc::now();
                Ok(record.clone())
            })?;
        tracing::info!(id = %task.id, "monthly task updated");
        Ok(task)
    }

    pub fn delete(&self, id: &str) -> Result<MonthlyTask> {
        self.storage
            .update(Collection::MonthlyTasks, |records: &mut Vec<MonthlyTask>| {
                let idx = records
                    .iter()
                    .position(|r| r.id == id)
                    .ok_or_else(|| Error::not_found("monthly task", id))?;
                Ok(records.remove(idx))
            })
    }
}

fn upsert_into(records: &mut Vec<MonthlyTask>, input: MonthlyInput) -> MonthlyTask {
    let now = Utc::now();
    if let Some(existing) = records.iter_mut().find(|r| r.same_key(&input)) {
        existing.count = input.count;
        existing.updated_at = now;
        return existing.clone();
    }
    let task = MonthlyTask {
        id: Ulid::new().to_string(),
        eid: input.eid,
        projectname: input.projectname,
        projecttype: input.projecttype,
        month: input.month,
        count: input.count,
        approval: Approval::Pending,
        created_at: now,
        updated_at: now,
    };
    records.push(task.clone());
    task
}

fn load_tasks(source: &impl TaskRecords) -> Vec<Task> {
    source.task_records().unwrap_or_else(|err| {
        tracing::warn!(error = %err, "task read failed, monthly labels default to pending");
        Vec::new()
    })
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::MissingField(field.to_string()));
    }
    Ok(trimmed.to_string())
}
