//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use schemadrift_core::SafetyLevel;
use schemadrift_postgres::DEFAULT_MAX_CONCURRENCY;

/// schemadrift - compare two database schemas
#[derive(Parser, Debug)]
#[command(name = "schemadrift")]
#[command(author = "Pegasus Heavy Industries LLC")]
#[command(version)]
#[command(
    about = "schemadrift - print the SQL that turns the first database schema into the second",
    long_about = None
)]
pub struct Cli {
    /// Which changes are emitted as executable SQL; the rest are commented out
    #[arg(short, long, value_enum, default_value_t = Level::Drop)]
    pub level: Level,

    /// Execute the generated statements against the first connection
    #[arg(long)]
    pub apply: bool,

    /// Exit with status 2 when the schemas differ
    #[arg(long)]
    pub exit_code: bool,

    /// Catalog queries kept in flight per database
    #[arg(long, env = "SCHEMADRIFT_CONCURRENCY", default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub concurrency: usize,

    /// Write the collected snapshots to DIR as source.json and target.json
    #[arg(long, value_name = "DIR")]
    pub dump_snapshots: Option<PathBuf>,

    /// Current schema: connection URI, TOML connection file, or JSON snapshot
    #[arg(value_name = "CONNECTION_1")]
    pub source: String,

    /// Desired schema: connection URI, TOML connection file, or JSON snapshot
    #[arg(value_name = "CONNECTION_2")]
    pub target: String,
}

/// Safety level accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Level {
    /// Execute every change
    #[default]
    Drop,
    /// Comment out changes that discard data
    Warn,
    /// Comment out changes that may fail or discard data
    Safe,
}

impl From<Level> for SafetyLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::Drop => SafetyLevel::Drop,
            Level::Warn => SafetyLevel::Warn,
            Level::Safe => SafetyLevel::Safe,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", SafetyLevel::from(*self))
    }
}
