//! tally option command implementations.

use serde::Serialize;

use super::Context;
use crate::error::Result;
use crate::options::{OptionKind, OptionsStore};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct OptionListOutput {
    kind: OptionKind,
    values: Vec<String>,
}

fn store(ctx: &Context) -> OptionsStore {
    OptionsStore::new(ctx.storage.clone(), ctx.config.options.clone())
}

pub fn run_list(ctx: &Context, kind: &str) -> Result<()> {
    let kind: OptionKind = kind.parse()?;
    let values = store(ctx).list(kind)?;
    emit(ctx, "option list", format!("Values for {kind}"), kind, values)
}

pub fn run_add(ctx: &Context, kind: &str, value: &str) -> Result<()> {
    let kind: OptionKind = kind.parse()?;
    let values = store(ctx).add(kind, value)?;
    emit(ctx, "option add", format!("Added {} to {kind}", value.trim()), kind, values)
}

pub fn run_rename(ctx: &Context, kind: &str, old: &str, new: &str) -> Result<()> {
    let kind: OptionKind = kind.parse()?;
    let values = store(ctx).rename(kind, old, new)?;
    emit(
        ctx,
        "option rename",
        format!("Renamed {} to {} in {kind}", old.trim(), new.trim()),
        kind,
        values,
    )
}

pub fn run_rm(ctx: &Context, kind: &str, value: &str) -> Result<()> {
    let kind: OptionKind = kind.parse()?;
    let values = store(ctx).remove(kind, value)?;
    emit(ctx, "option rm", format!("Removed {} from {kind}", value.trim()), kind, values)
}

fn emit(
    ctx: &Context,
    command: &str,
    header: String,
    kind: OptionKind,
    values: Vec<String>,
) -> Result<()> {
    let mut human = HumanOutput::new(header);
    for value in &values {
        human.push_detail(value.clone());
    }
    emit_success(
        ctx.output,
        command,
        &OptionListOutput { kind, values },
        Some(&human),
    )
}
