//! Command-line interface for tally
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule; every command
//! corresponds to one endpoint of the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::storage::Storage;

mod assigned;
mod auth;
mod init;
mod monthly;
mod option;
mod points;
mod project;
mod task;

/// tally - task logging, approvals and points for production teams
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory holding the collection files and tally.toml
    #[arg(long, global = true, env = "TALLY_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the data directory, collection files and a default tally.toml
    Init,

    /// Log, query, edit and approve tasks
    #[command(subcommand)]
    Task(TaskCommands),

    /// Grouped monthly assigned/completed counts
    #[command(subcommand)]
    Assigned(AssignedCommands),

    /// Per-project monthly assignment counts
    #[command(subcommand)]
    Monthly(MonthlyCommands),

    /// Project type and project status value lists
    #[command(subcommand)]
    Option(OptionCommands),

    /// Project type points table
    #[command(subcommand)]
    Points(PointsCommands),

    /// Accounts and sessions
    #[command(subcommand)]
    Auth(AuthCommands),

    /// Client projects
    #[command(subcommand)]
    Project(ProjectCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Log a task
    Add {
        #[arg(long)]
        eid: String,

        /// Employee name
        #[arg(long)]
        name: String,

        /// Day the work was done (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long = "project")]
        projectname: String,

        #[arg(long = "type")]
        projecttype: String,

        #[arg(long = "status")]
        projectstatus: String,

        #[arg(long)]
        category: String,

        #[arg(long)]
        note: Option<String>,
    },

    /// List tasks with exact-match filters
    List {
        #[arg(long)]
        eid: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        project_type: Option<String>,

        #[arg(long)]
        project_status: Option<String>,

        #[arg(long)]
        category: Option<String>,
    },

    /// Tasks of one employee in a month
    Month {
        #[arg(long)]
        eid: String,

        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,
    },

    /// Tasks dated today
    Today,

    /// Every task, newest first
    All,

    /// Edit any field of a task
    Edit {
        id: String,

        #[arg(long)]
        eid: Option<String>,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long = "project")]
        projectname: Option<String>,

        #[arg(long = "type")]
        projecttype: Option<String>,

        #[arg(long = "status")]
        projectstatus: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Override points instead of looking them up
        #[arg(long)]
        points: Option<f64>,

        #[arg(long)]
        note: Option<String>,

        /// pending or approved
        #[arg(long)]
        approval: Option<String>,
    },

    /// Set a task's approval (pending or approved)
    Approval { id: String, value: String },

    /// Delete a task
    Rm { id: String },
}

/// Assigned subcommands
#[derive(Subcommand, Debug)]
pub enum AssignedCommands {
    /// Merge a JSON array of flat or grouped rows
    Bulk {
        /// Payload file, or - for stdin
        #[arg(long, short)]
        file: String,
    },

    /// List grouped documents
    List {
        #[arg(long)]
        eid: Option<String>,

        #[arg(long)]
        month: Option<u32>,

        #[arg(long)]
        year: Option<i32>,
    },

    /// Remove one project type entry from a document
    RmEntry { id: String, project_type: String },

    /// Delete a whole document
    Rm { id: String },
}

/// Monthly subcommands
#[derive(Subcommand, Debug)]
pub enum MonthlyCommands {
    /// Set the count for (eid, project, type, month)
    Upsert {
        #[arg(long)]
        eid: String,

        #[arg(long = "project")]
        projectname: String,

        #[arg(long = "type")]
        projecttype: String,

        /// Month (YYYY-MM)
        #[arg(long)]
        month: String,

        #[arg(long, default_value_t = 0)]
        count: u32,
    },

    /// Upsert a JSON array of monthly rows
    Bulk {
        /// Payload file, or - for stdin
        #[arg(long, short)]
        file: String,
    },

    /// List monthly records with recomputed approval labels
    List {
        #[arg(long)]
        eid: Option<String>,

        #[arg(long)]
        month: Option<String>,
    },

    /// Edit a monthly record
    Edit {
        id: String,

        #[arg(long)]
        eid: Option<String>,

        #[arg(long = "project")]
        projectname: Option<String>,

        #[arg(long = "type")]
        projecttype: Option<String>,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        count: Option<u32>,
    },

    /// Delete a monthly record
    Rm { id: String },
}

/// Option subcommands
#[derive(Subcommand, Debug)]
pub enum OptionCommands {
    /// Show the values of a list
    List {
        /// type or status
        #[arg(long)]
        kind: String,
    },

    /// Add a value
    Add {
        #[arg(long)]
        kind: String,
        value: String,
    },

    /// Rename a value
    Rename {
        #[arg(long)]
        kind: String,
        old: String,
        new: String,
    },

    /// Remove a value
    Rm {
        #[arg(long)]
        kind: String,
        value: String,
    },
}

/// Points subcommands
#[derive(Subcommand, Debug)]
pub enum PointsCommands {
    /// Show the whole table or one project type
    Show { project_type: Option<String> },

    /// Set the points for a project type
    Set {
        project_type: String,

        #[arg(allow_negative_numbers = true)]
        points: f64,

        /// Also rewrite the points of saved tasks of this type
        #[arg(long)]
        apply: bool,
    },
}

/// Auth subcommands
#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Create an account
    Register {
        #[arg(long)]
        eid: String,

        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: String,

        /// employee or admin
        #[arg(long, default_value = "employee")]
        role: String,
    },

    /// Open a session and print its token
    Login {
        #[arg(long)]
        eid: String,

        #[arg(long, env = "TALLY_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Show the user behind a session token
    Me {
        #[arg(long, env = "TALLY_TOKEN", hide_env_values = true)]
        token: String,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Add a project
    Add { name: String },

    /// List projects
    List {
        /// Include deactivated projects
        #[arg(long)]
        all: bool,
    },

    /// Hide a project from the task form
    Deactivate { project: String },

    /// Delete a project
    Rm { project: String },
}

/// Resolved data directory, config and output mode for one invocation.
pub(crate) struct Context {
    pub storage: Storage,
    pub config: Config,
    pub output: OutputOptions,
}

impl Context {
    fn load(data_dir: Option<PathBuf>, json: bool, quiet: bool) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir);
        let config = Config::load_from_dir(&data_dir)?;
        tracing::debug!(data_dir = %data_dir.display(), "context loaded");
        Ok(Self {
            storage: Storage::new(data_dir).with_lock_timeout(config.storage.lock_timeout_ms),
            config,
            output: OutputOptions { json, quiet },
        })
    }
}

/// `--data-dir` / `TALLY_DATA_DIR`, then the platform data dir, then `./.tally`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    explicit
        .or_else(|| {
            directories::ProjectDirs::from("", "", "tally").map(|dirs| dirs.data_dir().to_path_buf())
        })
        .unwrap_or_else(|| PathBuf::from(".tally"))
}

/// Read a payload from a file path, or stdin when the path is `-`.
pub(crate) fn read_payload(source: &str) -> Result<String> {
    use std::io::Read;

    if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(source)?)
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context::load(self.data_dir, self.json, self.quiet)?;
        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    eid,
                    name,
                    date,
                    projectname,
                    projecttype,
                    projectstatus,
                    category,
                    note,
                } => task::run_add(
                    &ctx,
                    crate::task::NewTask {
                        eid,
                        name,
                        date,
                        projectname,
                        projecttype,
                        projectstatus,
                        category,
                        note,
                    },
                ),
                TaskCommands::List {
                    eid,
                    date,
                    project_type,
                    project_status,
                    category,
                } => task::run_list(
                    &ctx,
                    crate::task::TaskFilter {
                        eid,
                        date,
                        projecttype: project_type,
                        projectstatus: project_status,
                        category,
                    },
                ),
                TaskCommands::Month { eid, month } => task::run_month(&ctx, &eid, &month),
                TaskCommands::Today => task::run_today(&ctx),
                TaskCommands::All => task::run_all(&ctx),
                TaskCommands::Edit {
                    id,
                    eid,
                    name,
                    date,
                    projectname,
                    projecttype,
                    projectstatus,
                    category,
                    points,
                    note,
                    approval,
                } => task::run_edit(
                    &ctx,
                    &id,
                    crate::task::TaskUpdate {
                        eid,
                        name,
                        date,
                        projectname,
                        projecttype,
                        projectstatus,
                        category,
                        points,
                        note,
                        approval,
                    },
                ),
                TaskCommands::Approval { id, value } => task::run_approval(&ctx, &id, &value),
                TaskCommands::Rm { id } => task::run_rm(&ctx, &id),
            },
            Commands::Assigned(cmd) => match cmd {
                AssignedCommands::Bulk { file } => assigned::run_bulk(&ctx, &file),
                AssignedCommands::List { eid, month, year } => assigned::run_list(
                    &ctx,
                    crate::assigned::AssignmentFilter { eid, month, year },
                ),
                AssignedCommands::RmEntry { id, project_type } => {
                    assigned::run_rm_entry(&ctx, &id, &project_type)
                }
                AssignedCommands::Rm { id } => assigned::run_rm(&ctx, &id),
            },
            Commands::Monthly(cmd) => match cmd {
                MonthlyCommands::Upsert {
                    eid,
                    projectname,
                    projecttype,
                    month,
                    count,
                } => monthly::run_upsert(
                    &ctx,
                    crate::monthly::MonthlyInput {
                        eid,
                        projectname,
                        projecttype,
                        month,
                        count,
                    },
                ),
                MonthlyCommands::Bulk { file } => monthly::run_bulk(&ctx, &file),
                MonthlyCommands::List { eid, month } => {
                    monthly::run_list(&ctx, eid.as_deref(), month.as_deref())
                }
                MonthlyCommands::Edit {
                    id,
                    eid,
                    projectname,
                    projecttype,
                    month,
                    count,
                } => monthly::run_edit(
                    &ctx,
                    &id,
                    crate::monthly::MonthlyUpdate {
                        eid,
                        projectname,
                        projecttype,
                        month,
                        count,
                    },
                ),
                MonthlyCommands::Rm { id } => monthly::run_rm(&ctx, &id),
            },
            Commands::Option(cmd) => match cmd {
                OptionCommands::List { kind } => option::run_list(&ctx, &kind),
                OptionCommands::Add { kind, value } => option::run_add(&ctx, &kind, &value),
                OptionCommands::Rename { kind, old, new } => {
                    option::run_rename(&ctx, &kind, &old, &new)
                }
                OptionCommands::Rm { kind, value } => option::run_rm(&ctx, &kind, &value),
            },
            Commands::Points(cmd) => match cmd {
                PointsCommands::Show { project_type } => {
                    points::run_show(&ctx, project_type.as_deref())
                }
                PointsCommands::Set {
                    project_type,
                    points,
                    apply,
                } => points::run_set(&ctx, &project_type, points, apply),
            },
            Commands::Auth(cmd) => match cmd {
                AuthCommands::Register {
                    eid,
                    name,
                    password,
                    role,
                } => auth::run_register(&ctx, eid, name, password, &role),
                AuthCommands::Login { eid, password } => auth::run_login(&ctx, &eid, &password),
                AuthCommands::Me { token } => auth::run_me(&ctx, &token),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::Add { name } => project::run_add(&ctx, &name),
                ProjectCommands::List { all } => project::run_list(&ctx, all),
                ProjectCommands::Deactivate { project } => project::run_deactivate(&ctx, &project),
                ProjectCommands::Rm { project } => project::run_rm(&ctx, &project),
            },
        }
    }
}
