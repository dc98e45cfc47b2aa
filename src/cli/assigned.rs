//! tally assigned command implementations.

use serde::Serialize;

use super::{read_payload, Context};
use crate::assigned::{AssignedGroup, AssignmentFilter, AssignmentStore};
use crate::bulk::{self, MergeAction, MergeResult};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct BulkOutput {
    results: Vec<MergeResult>,
}

#[derive(Serialize)]
struct GroupListOutput {
    total: usize,
    groups: Vec<AssignedGroup>,
}

pub fn run_bulk(ctx: &Context, source: &str) -> Result<()> {
    let payload = read_payload(source)?;
    let items = bulk::parse_items(&payload)?;
    let docs = bulk::normalize(items);
    let store = AssignmentStore::new(ctx.storage.clone());
    let results = bulk::merge(&store, docs)?;

    let created = results
        .iter()
        .filter(|r| r.action == MergeAction::Created)
        .count();
    let mut human = HumanOutput::new("Assignments merged");
    human.push_summary("Groups", results.len().to_string());
    human.push_summary("Created", created.to_string());
    human.push_summary("Updated", (results.len() - created).to_string());
    for result in &results {
        let action = match result.action {
            MergeAction::Created => "created",
            MergeAction::Updated => "updated",
        };
        human.push_detail(format!(
            "{} {}::{}::{} {}",
            result.id, result.eid, result.month, result.year, action
        ));
    }
    emit_success(ctx.output, "assigned bulk", &BulkOutput { results }, Some(&human))
}

pub fn run_list(ctx: &Context, filter: AssignmentFilter) -> Result<()> {
    let groups = AssignmentStore::new(ctx.storage.clone()).list(&filter)?;
    let output = GroupListOutput {
        total: groups.len(),
        groups,
    };
    let mut human = HumanOutput::new("Assigned tasks");
    human.push_summary("Total", output.total.to_string());
    for group in &output.groups {
        human.push_detail(format!("{} {} {}/{}", group.id, group.eid, group.month, group.year));
        for entry in &group.tasks {
            human.push_detail(format!(
                "  {}: {}/{} completed",
                entry.project_type, entry.completed, entry.assigned
            ));
        }
    }
    emit_success(ctx.output, "assigned list", &output, Some(&human))
}

pub fn run_rm_entry(ctx: &Context, id: &str, project_type: &str) -> Result<()> {
    let group = AssignmentStore::new(ctx.storage.clone()).delete_task_entry(id, project_type)?;
    let mut human = HumanOutput::new("Assignment entry removed");
    human.push_summary("ID", group.id.clone());
    human.push_summary("Project type", project_type.to_string());
    human.push_summary("Remaining entries", group.tasks.len().to_string());
    emit_success(ctx.output, "assigned rm-entry", &group, Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let group = AssignmentStore::new(ctx.storage.clone()).delete_group(id)?;
    let mut human = HumanOutput::new("Assignment document deleted");
    human.push_summary("ID", group.id.clone());
    emit_success(ctx.output, "assigned rm", &group, Some(&human))
}
