// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::types::TransformKind;

/// Command-line arguments for `basis`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "basis",
    version,
    about = "Build and watch project assets from a module configuration.",
    long_about = None
)]
pub struct CliArgs {
    /// Task to run.
    #[arg(value_enum, default_value_t = Task::Default)]
    pub task: Task,

    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BASIS_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Quiet window in milliseconds before a batch of changes is dispatched.
    #[arg(long, value_name = "MS", default_value_t = 100)]
    pub debounce_ms: u64,
}

/// Named tasks of the build tool.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Task {
    /// Print the effective configuration.
    Config,
    #[value(name = "build:server")]
    BuildServer,
    #[value(name = "build:client")]
    BuildClient,
    #[value(name = "build:styles")]
    BuildStyles,
    #[value(name = "build:static")]
    BuildStatic,
    /// Run every build task once.
    Build,
    /// Rebuild on changes until interrupted.
    Watch,
    /// `build`, then `watch`.
    Default,
}

impl Task {
    /// Transform kinds a one-shot build of this task runs.
    pub fn build_kinds(self) -> Vec<TransformKind> {
        match self {
            Task::BuildServer => vec![TransformKind::ServerScript],
            Task::BuildClient => vec![TransformKind::ClientScript],
            Task::BuildStyles => vec![TransformKind::Style],
            Task::BuildStatic => vec![TransformKind::Static],
            Task::Build | Task::Default => TransformKind::ALL.to_vec(),
            Task::Config | Task::Watch => Vec::new(),
        }
    }
}

/// Arguments for the `basis-gen` scaffolder.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "basis-gen",
    version,
    about = "Create a new project from a template directory.",
    long_about = None
)]
pub struct ScaffoldArgs {
    /// Where to create the project.
    #[arg(value_name = "DEST")]
    pub dest: Option<PathBuf>,

    /// Template directory to copy. Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    pub template: Option<PathBuf>,

    /// Project name. Defaults to the destination's file name.
    #[arg(long)]
    pub name: Option<String>,

    /// Accept defaults without prompting.
    #[arg(long, short = 'y')]
    pub yes: bool,

    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
