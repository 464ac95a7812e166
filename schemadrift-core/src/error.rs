//! Error types for snapshot collection and diffing.

use thiserror::Error;

/// Result type alias for schemadrift operations.
pub type DriftResult<T> = Result<T, DriftError>;

/// Errors that can occur while collecting, comparing, or applying schemas.
///
/// The diff engine itself is infallible; every variant here originates at the
/// collector boundary or in configuration handling.
#[derive(Debug, Error)]
pub enum DriftError {
    /// Could not connect to a database.
    #[error("connection error: {0}")]
    Connection(String),

    /// A catalog query failed.
    #[error("query error: {0}")]
    Query(String),

    /// Invalid connection configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// No collector is registered under this dialect name.
    #[error("unknown dialect '{0}'")]
    UnknownDialect(String),

    /// The collected snapshot is not internally consistent.
    #[error("inconsistent snapshot: {0}")]
    InconsistentSnapshot(String),

    /// A generated statement failed while being applied.
    #[error("failed to execute statement `{statement}`: {message}")]
    Execution {
        /// The statement that failed.
        statement: String,
        /// Driver error message.
        message: String,
    },
}

impl DriftError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a query error.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unknown dialect error.
    pub fn unknown_dialect(name: impl Into<String>) -> Self {
        Self::UnknownDialect(name.into())
    }

    /// Create an inconsistent snapshot error.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::InconsistentSnapshot(msg.into())
    }

    /// Create a statement execution error.
    pub fn execution(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Execution {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Check if this error happened before any database was contacted.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnknownDialect(_))
    }
}
