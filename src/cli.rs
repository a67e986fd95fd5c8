// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `loopflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "loopflow",
    version,
    about = "Execute a dataflow graph with conditionals and loops.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the graph definition (TOML).
    #[arg(long, value_name = "PATH", default_value = "graph.toml")]
    pub graph: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LOOPFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override `[config].default_parallel_iterations` for Enter nodes that
    /// do not set `parallel_iterations` themselves.
    #[arg(long, value_name = "N")]
    pub parallel_iterations: Option<usize>,

    /// Parse + validate, print nodes and frames, but don't execute.
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
