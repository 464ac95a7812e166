//! Error types for PostgreSQL collection.

use schemadrift_core::DriftError;
use thiserror::Error;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur while talking to PostgreSQL.
#[derive(Error, Debug)]
pub enum PgError {
    /// PostgreSQL error.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// A catalog row could not be interpreted.
    #[error("unexpected catalog data: {0}")]
    Catalog(String),

    /// Catalog rows refer to objects that were not collected.
    #[error("inconsistent catalog: {0}")]
    Inconsistent(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a catalog parsing error.
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::Catalog(message.into())
    }

    /// Create an inconsistent catalog error.
    pub fn inconsistent(message: impl Into<String>) -> Self {
        Self::Inconsistent(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Postgres(e) => e.is_closed(),
            _ => false,
        }
    }
}

impl From<PgError> for DriftError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::Postgres(e) if e.is_closed() => DriftError::Connection(e.to_string()),
            PgError::Postgres(e) => match e.as_db_error() {
                Some(db) => DriftError::Query(db.to_string()),
                None => DriftError::Query(e.to_string()),
            },
            PgError::Config(msg) => DriftError::Config(msg),
            PgError::Connection(msg) => DriftError::Connection(msg),
            PgError::Catalog(msg) => DriftError::Query(msg),
            PgError::Inconsistent(msg) => DriftError::InconsistentSnapshot(msg),
        }
    }
}
