//! PostgreSQL connection wrapper.

use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, warn};

use crate::config::PgConfig;
use crate::error::{PgError, PgResult};

/// A single client connection with its driver task.
///
/// The client pipelines requests, so concurrent `query` calls through a
/// shared reference are sent on the same socket without waiting on each
/// other.
pub struct PgConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl PgConnection {
    /// Connect and spawn the connection driver onto the runtime.
    pub async fn connect(config: &PgConfig) -> PgResult<Self> {
        debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "Connecting to PostgreSQL"
        );

        let (client, connection) = config
            .to_pg_config()
            .connect(NoTls)
            .await
            .map_err(|e| {
                PgError::connection(format!(
                    "failed to connect to {}:{}/{}: {}",
                    config.host, config.port, config.database, e
                ))
            })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(error = %e, "PostgreSQL connection closed with error");
            }
        });

        Ok(Self { client, driver })
    }

    /// Execute a query and return all rows.
    pub async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "Executing query");
        let rows = self.client.query(sql, params).await?;
        Ok(rows)
    }

    /// Execute one or more statements in a single round-trip.
    pub async fn batch_execute(&self, sql: &str) -> PgResult<()> {
        debug!(sql = %sql, "Executing batch");
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    /// Whether the underlying connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.client.is_closed()
    }

    /// Close the connection and wait for the driver task to finish.
    pub async fn close(self) {
        drop(self.client);
        if let Err(e) = self.driver.await {
            warn!(error = %e, "PostgreSQL driver task failed");
        }
    }
}
