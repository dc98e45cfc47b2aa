//! tally project command implementations.

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::projects::{Project, ProjectStore};

#[derive(Serialize)]
struct ProjectListOutput {
    total: usize,
    projects: Vec<Project>,
}

fn store(ctx: &Context) -> ProjectStore {
    ProjectStore::new(ctx.storage.clone())
}

pub fn run_add(ctx: &Context, name: &str) -> Result<()> {
    let project = store(ctx).add(name)?;
    let mut human = HumanOutput::new("Project added");
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    emit_success(ctx.output, "project add", &project, Some(&human))
}

pub fn run_list(ctx: &Context, all: bool) -> Result<()> {
    let projects = store(ctx).list(all)?;
    let output = ProjectListOutput {
        total: projects.len(),
        projects,
    };
    let mut human = HumanOutput::new("Projects");
    human.push_summary("Total", output.total.to_string());
    for project in &output.projects {
        let mut line = format!("{} {}", project.id, project.name);
        if !project.active {
            line.push_str(" [inactive]");
        }
        human.push_detail(line);
    }
    emit_success(ctx.output, "project list", &output, Some(&human))
}

pub fn run_deactivate(ctx: &Context, selector: &str) -> Result<()> {
    let project = store(ctx).deactivate(selector)?;
    let mut human = HumanOutput::new("Project deactivated");
    human.push_summary("ID", project.id.clone());
    human.push_summary("Name", project.name.clone());
    emit_success(ctx.output, "project deactivate", &project, Some(&human))
}

pub fn run_rm(ctx: &Context, selector: &str) -> Result<()> {
    let project = store(ctx).delete(selector)?;
    let mut human = HumanOutput::new("Project deleted");
    human.push_summary("ID", project.id.clone());
    emit_success(ctx.output, "project rm", &project, Some(&human))
}
