//! tally init command implementation
//!
//! Creates the data directory, empty collection files and a default
//! `tally.toml`, then seeds the option lists and points table.

use std::path::{Path, PathBuf};

use super::Context;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::options::{OptionKind, OptionsStore};
use crate::output::{emit_success, HumanOutput};
use crate::points::PointsTable;

#[derive(serde::Serialize)]
struct InitReport {
    data_dir: PathBuf,
    created: InitCreated,
}

#[derive(serde::Serialize)]
struct InitCreated {
    config: bool,
    collections: Vec<&'static str>,
}

pub fn run(ctx: &Context) -> Result<()> {
    let created_collections = ctx.storage.init()?;
    let created_config = ensure_config(&ctx.storage.config_file())?;

    let options = OptionsStore::new(ctx.storage.clone(), ctx.config.options.clone());
    options.list(OptionKind::ProjectType)?;
    options.list(OptionKind::ProjectStatus)?;
    PointsTable::new(ctx.storage.clone(), &ctx.config.points).all()?;

    let report = InitReport {
        data_dir: ctx.storage.data_dir().to_path_buf(),
        created: InitCreated {
            config: created_config,
            collections: created_collections.iter().map(|c| c.name()).collect(),
        },
    };

    let header = if !created_config && created_collections.is_empty() {
        "tally init: nothing to do".to_string()
    } else {
        "tally init: initialized data directory".to_string()
    };

    let mut created_items: Vec<String> = Vec::new();
    if created_config {
        created_items.push(crate::storage::CONFIG_FILE.to_string());
    }
    created_items.extend(report.created.collections.iter().map(|c| format!("{c}.json")));

    let mut human = HumanOutput::new(header);
    human.push_summary("data dir", report.data_dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("tally auth register --eid <eid> --name <name>");
    human.push_next_step("tally task add --help");

    emit_success(ctx.output, "init", &report, Some(&human))
}

fn ensure_config(config_path: &Path) -> Result<bool> {
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::OperationFailed(format!(
                "{} exists but is not a file",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(config_path)?;
    Ok(true)
}
