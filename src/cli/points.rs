//! tally points command implementations.

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::points::PointsEntry;
use crate::task::TaskStore;

#[derive(Serialize)]
struct PointsTableOutput {
    entries: Vec<PointsEntry>,
}

#[derive(Serialize)]
struct PointsSetOutput {
    #[serde(flatten)]
    entry: PointsEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks_updated: Option<usize>,
}

pub fn run_show(ctx: &Context, project_type: Option<&str>) -> Result<()> {
    let tasks = TaskStore::new(ctx.storage.clone(), &ctx.config);
    match project_type {
        Some(project_type) => {
            let entry = tasks.points().get(project_type)?;
            let mut human = HumanOutput::new(format!("Points for {}", entry.projecttype));
            human.push_summary("Points", entry.points.to_string());
            emit_success(ctx.output, "points show", &entry, Some(&human))
        }
        None => {
            let entries = tasks.points().all()?;
            let mut human = HumanOutput::new("Points table");
            for entry in &entries {
                human.push_summary(entry.projecttype.clone(), entry.points.to_string());
            }
            emit_success(ctx.output, "points show", &PointsTableOutput { entries }, Some(&human))
        }
    }
}

pub fn run_set(ctx: &Context, project_type: &str, points: f64, apply: bool) -> Result<()> {
    let tasks = TaskStore::new(ctx.storage.clone(), &ctx.config);
    let entry = tasks.points().set(project_type, points)?;
    let tasks_updated = if apply {
        Some(tasks.apply_points(&entry.projecttype, entry.points)?)
    } else {
        None
    };

    let mut human = HumanOutput::new(format!("Points for {} set", entry.projecttype));
    human.push_summary("Points", entry.points.to_string());
    match tasks_updated {
        Some(count) => human.push_summary("Saved tasks updated", count.to_string()),
        None => human.push_next_step(format!(
            "tally points set \"{}\" {} --apply to reprice saved tasks",
            entry.projecttype, entry.points
        )),
    }
    emit_success(
        ctx.output,
        "points set",
        &PointsSetOutput {
            entry,
            tasks_updated,
        },
        Some(&human),
    )
}
