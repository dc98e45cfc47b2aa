//! tally task command implementations.

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::reconcile::ReconcileOutcome;
use crate::task::{NewTask, Task, TaskEdit, TaskFilter, TaskStore, TaskUpdate};

#[derive(Serialize)]
struct TaskListOutput {
    total: usize,
    total_points: f64,
    tasks: Vec<Task>,
}

fn store(ctx: &Context) -> TaskStore {
    TaskStore::new(ctx.storage.clone(), &ctx.config)
}

pub fn run_add(ctx: &Context, input: NewTask) -> Result<()> {
    let task = store(ctx).create(input)?;
    let mut human = HumanOutput::new("Task logged");
    push_task_summary(&mut human, &task);
    if task.points == 0.0 {
        human.push_warning(format!(
            "no points configured for '{}'; logged as 0",
            task.projecttype
        ));
    }
    emit_success(ctx.output, "task add", &task, Some(&human))
}

pub fn run_list(ctx: &Context, filter: TaskFilter) -> Result<()> {
    let tasks = store(ctx).list(&filter)?;
    emit_list(ctx, "task list", "Tasks", tasks)
}

pub fn run_month(ctx: &Context, eid: &str, month: &str) -> Result<()> {
    let tasks = store(ctx).month(eid, month)?;
    emit_list(ctx, "task month", &format!("Tasks for {eid} in {month}"), tasks)
}

pub fn run_today(ctx: &Context) -> Result<()> {
    let tasks = store(ctx).today()?;
    emit_list(ctx, "task today", "Tasks today", tasks)
}

pub fn run_all(ctx: &Context) -> Result<()> {
    let tasks = store(ctx).all()?;
    emit_list(ctx, "task all", "All tasks", tasks)
}

pub fn run_edit(ctx: &Context, id: &str, changes: TaskUpdate) -> Result<()> {
    let edit = store(ctx).update(id, changes)?;
    emit_edit(ctx, "task edit", "Task updated", &edit)
}

pub fn run_approval(ctx: &Context, id: &str, value: &str) -> Result<()> {
    let edit = store(ctx).set_approval(id, value)?;
    emit_edit(ctx, "task approval", "Approval updated", &edit)
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let task = store(ctx).delete(id)?;
    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", task.id.clone());
    emit_success(ctx.output, "task rm", &task, Some(&human))
}

fn emit_list(ctx: &Context, command: &str, header: &str, tasks: Vec<Task>) -> Result<()> {
    let output = TaskListOutput {
        total: tasks.len(),
        total_points: tasks.iter().map(|t| t.points).sum(),
        tasks,
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("Total", output.total.to_string());
    human.push_summary("Points", output.total_points.to_string());
    for task in &output.tasks {
        human.push_detail(format!(
            "{} {} {} {} / {} ({} pts) [{}]",
            task.id, task.date, task.eid, task.projectname, task.projecttype, task.points, task.approval
        ));
    }
    emit_success(ctx.output, command, &output, Some(&human))
}

fn emit_edit(ctx: &Context, command: &str, header: &str, edit: &TaskEdit) -> Result<()> {
    let mut human = HumanOutput::new(header);
    push_task_summary(&mut human, &edit.task);
    match &edit.reconcile {
        ReconcileOutcome::NotTriggered => {}
        ReconcileOutcome::Applied {
            eid,
            month,
            year,
            project_type,
            completed,
        } => human.push_detail(format!(
            "assigned {eid} {month}/{year} {project_type}: completed = {completed}"
        )),
        ReconcileOutcome::Failed { reason } => {
            human.push_warning(format!("assignment counters not updated: {reason}"))
        }
    }
    emit_success(ctx.output, command, edit, Some(&human))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("ID", task.id.clone());
    human.push_summary("Employee", format!("{} ({})", task.name, task.eid));
    human.push_summary("Date", task.date.clone());
    human.push_summary("Project", format!("{} / {}", task.projectname, task.projecttype));
    human.push_summary("Status", task.projectstatus.clone());
    human.push_summary("Points", task.points.to_string());
    human.push_summary("Approval", task.approval.to_string());
}
