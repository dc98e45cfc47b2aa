//! tally monthly command implementations.

use serde::Serialize;

use super::{read_payload, Context};
use crate::error::{Error, Result};
use crate::monthly::{MonthlyInput, MonthlyTask, MonthlyTaskStore, MonthlyUpdate};
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskStore;

#[derive(Serialize)]
struct MonthlyListOutput {
    total: usize,
    records: Vec<MonthlyTask>,
}

fn store(ctx: &Context) -> MonthlyTaskStore {
    MonthlyTaskStore::new(ctx.storage.clone())
}

pub fn run_upsert(ctx: &Context, input: MonthlyInput) -> Result<()> {
    let record = store(ctx).upsert(input)?;
    let mut human = HumanOutput::new("Monthly task saved");
    push_summary(&mut human, &record);
    emit_success(ctx.output, "monthly upsert", &record, Some(&human))
}

pub fn run_bulk(ctx: &Context, source: &str) -> Result<()> {
    let payload = read_payload(source)?;
    let rows: Vec<MonthlyInput> = serde_json::from_str(&payload)
        .map_err(|e| Error::invalid("payload", format!("expected an array of monthly rows: {e}")))?;
    let outcome = store(ctx).bulk(rows)?;

    let mut human = HumanOutput::new("Monthly tasks saved");
    human.push_summary("Saved", outcome.saved.len().to_string());
    human.push_summary("Skipped", outcome.skipped.to_string());
    if outcome.skipped > 0 {
        human.push_warning(format!("{} rows without eid were skipped", outcome.skipped));
    }
    emit_success(ctx.output, "monthly bulk", &outcome, Some(&human))
}

pub fn run_list(ctx: &Context, eid: Option<&str>, month: Option<&str>) -> Result<()> {
    let tasks = TaskStore::new(ctx.storage.clone(), &ctx.config);
    let records = store(ctx).list(eid, month, &tasks)?;
    let output = MonthlyListOutput {
        total: records.len(),
        records,
    };
    let mut human = HumanOutput::new("Monthly tasks");
    human.push_summary("Total", output.total.to_string());
    for record in &output.records {
        human.push_detail(format!(
            "{} {} {} {} / {} x{} [{}]",
            record.id,
            record.month,
            record.eid,
            record.projectname,
            record.projecttype,
            record.count,
            record.approval
        ));
    }
    emit_success(ctx.output, "monthly list", &output, Some(&human))
}

pub fn run_edit(ctx: &Context, id: &str, changes: MonthlyUpdate) -> Result<()> {
    let record = store(ctx).update(id, changes)?;
    let mut human = HumanOutput::new("Monthly task updated");
    push_summary(&mut human, &record);
    emit_success(ctx.output, "monthly edit", &record, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let record = store(ctx).delete(id)?;
    let mut human = HumanOutput::new("Monthly task deleted");
    human.push_summary("ID", record.id.clone());
    emit_success(ctx.output, "monthly rm", &record, Some(&human))
}

fn push_summary(human: &mut HumanOutput, record: &MonthlyTask) {
    human.push_summary("ID", record.id.clone());
    human.push_summary("Employee", record.eid.clone());
    human.push_summary("Project", format!("{} / {}", record.projectname, record.projecttype));
    human.push_summary("Month", record.month.clone());
    human.push_summary("Count", record.count.to_string());
}
