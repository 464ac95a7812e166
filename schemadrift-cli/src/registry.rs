//! Dialect registry.
//!
//! Maps the dialect name of a connection to a concrete collector. The set
//! of dialects is fixed at compile time, so dispatch is a plain `match`.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use schemadrift_core::{ConnectionConfig, DriftError, DriftResult, SchemaCollector, Snapshot};
use schemadrift_postgres::{PgCollector, PgConfig};

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// PostgreSQL.
    Postgres,
}

impl Dialect {
    /// All supported dialects.
    pub const ALL: [Dialect; 1] = [Dialect::Postgres];

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
        }
    }

    /// Build an unconnected collector for `config`.
    pub fn collector(self, config: &ConnectionConfig, concurrency: usize) -> DriftResult<Collector> {
        match self {
            Dialect::Postgres => {
                let pg = PgConfig::from_connection(config)?.with_max_concurrency(concurrency);
                Ok(Collector::Postgres(PgCollector::new(pg)))
            }
        }
    }
}

impl FromStr for Dialect {
    type Err = DriftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            _ => Err(DriftError::unknown_dialect(s)),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the collector registered for the connection's dialect.
pub fn collector_for(config: &ConnectionConfig, concurrency: usize) -> DriftResult<Collector> {
    config.dialect.parse::<Dialect>()?.collector(config, concurrency)
}

/// A collector for one of the registered dialects.
pub enum Collector {
    /// PostgreSQL collector.
    Postgres(PgCollector),
}

impl Collector {
    /// Dialect of this collector.
    pub fn dialect(&self) -> Dialect {
        match self {
            Collector::Postgres(_) => Dialect::Postgres,
        }
    }
}

#[async_trait]
impl SchemaCollector for Collector {
    async fn connect(&mut self) -> DriftResult<()> {
        match self {
            Collector::Postgres(c) => c.connect().await,
        }
    }

    async fn describe_schema(&self) -> DriftResult<Snapshot> {
        match self {
            Collector::Postgres(c) => c.describe_schema().await,
        }
    }

    async fn execute(&self, sql: &str) -> DriftResult<()> {
        match self {
            Collector::Postgres(c) => c.execute(sql).await,
        }
    }

    async fn drop_all(&self) -> DriftResult<()> {
        match self {
            Collector::Postgres(c) => c.drop_all().await,
        }
    }

    async fn close(&mut self) -> DriftResult<()> {
        match self {
            Collector::Postgres(c) => c.close().await,
        }
    }
}
