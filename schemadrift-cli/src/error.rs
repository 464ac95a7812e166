//! CLI error types and result alias.

use miette::Diagnostic;
use schemadrift_core::DriftError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// CLI error types
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    #[diagnostic(code(schemadrift::io))]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    #[diagnostic(code(schemadrift::config))]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    #[diagnostic(code(schemadrift::connection))]
    Connection(String),

    /// Database error
    #[error("Database error: {0}")]
    #[diagnostic(code(schemadrift::database))]
    Database(String),

    /// Snapshot error
    #[error("Snapshot error: {0}")]
    #[diagnostic(code(schemadrift::snapshot))]
    Snapshot(String),

    /// Apply error
    #[error("Apply error: {0}")]
    #[diagnostic(code(schemadrift::apply))]
    Apply(String),

    /// Command error
    #[error("Command error: {0}")]
    #[diagnostic(code(schemadrift::command))]
    Command(String),
}

impl From<DriftError> for CliError {
    fn from(err: DriftError) -> Self {
        match err {
            DriftError::Config(msg) => CliError::Config(msg),
            DriftError::UnknownDialect(_) => CliError::Config(err.to_string()),
            DriftError::Connection(msg) => CliError::Connection(msg),
            DriftError::Query(msg) => CliError::Database(msg),
            DriftError::InconsistentSnapshot(msg) => CliError::Snapshot(msg),
            DriftError::Execution { .. } => CliError::Apply(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::Config(format!("Failed to parse TOML: {}", err))
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Snapshot(format!("Invalid snapshot JSON: {}", err))
    }
}
