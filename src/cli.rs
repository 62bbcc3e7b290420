// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::engine::TaskTarget;

/// Command-line arguments for `rigbuild`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rigbuild",
    version,
    about = "Build, preview and package a WordPress theme.",
    long_about = None
)]
pub struct CliArgs {
    /// Task or graph to run.
    #[arg(value_enum, default_value_t = TaskTarget::Default)]
    pub task: TaskTarget,

    /// Theme project root (contains `dev/`).
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Theme config file.
    ///
    /// Default: `<root>/dev/config/theme.toml`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RIGBUILD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Print the task graph and watch bindings, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
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
