// src/cli.rs

//! Command-line flags.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// `workchain [--config PATH] [--chain NAME] [--log-level LEVEL] [--dry-run]`
#[derive(Debug, Clone, Parser)]
#[command(
    name = "workchain",
    version,
    about = "Submit the task chains from a config file and follow them to completion.",
    long_about = None
)]
pub struct CliArgs {
    /// TOML file describing scheduler settings and chains.
    #[arg(long, value_name = "PATH", default_value = "Workchain.toml")]
    pub config: String,

    /// Only submit this chain; every configured chain otherwise.
    #[arg(long, value_name = "NAME")]
    pub chain: Option<String>,

    /// Overrides `WORKCHAIN_LOG`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and validate the config, print what would be submitted, exit.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    pub fn config_path(&self) -> PathBuf {
        PathBuf::from(&self.config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

pub fn parse() -> CliArgs {
    CliArgs::parse()
}
