// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `pipeflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipeflow",
    version,
    about = "Run a DAG of shell-script steps as a tracked pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Pipeflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Pipeflow.toml")]
    pub config: String,

    /// Name of the pipeline run. Defaults to the graph name.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Free-form description stored on the pipeline.
    #[arg(long, value_name = "TEXT")]
    pub desc: Option<String>,

    /// Parameter value, `KEY=VALUE` for every vertex or `VERTEX.KEY=VALUE`
    /// for one vertex. May be repeated.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the graph, but don't execute anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the pipeline view as JSON after the run.
    #[arg(long)]
    pub view: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
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
