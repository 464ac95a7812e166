//! The collector boundary.
//!
//! A [`SchemaCollector`] turns a live database into a [`Snapshot`] and can
//! run statements against it. Dialects implement the trait; everything
//! above it (diffing, classification, rendering) is dialect-agnostic.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{DriftError, DriftResult};
use crate::snapshot::Snapshot;

/// A database-specific snapshot collector.
#[async_trait]
pub trait SchemaCollector: Send + Sync {
    /// Open the connection. Must be called before any other method.
    async fn connect(&mut self) -> DriftResult<()>;

    /// Read the catalog and build a snapshot of all user schemas.
    async fn describe_schema(&self) -> DriftResult<Snapshot>;

    /// Execute a single statement.
    async fn execute(&self, sql: &str) -> DriftResult<()>;

    /// Drop every user object, leaving an empty default schema.
    async fn drop_all(&self) -> DriftResult<()>;

    /// Release the connection.
    async fn close(&mut self) -> DriftResult<()>;
}

/// Connect both collectors and take their snapshots concurrently.
///
/// Returns `(source, target)`. Fails with the first error from either side.
pub async fn collect_pair<A, B>(source: &mut A, target: &mut B) -> DriftResult<(Snapshot, Snapshot)>
where
    A: SchemaCollector + ?Sized,
    B: SchemaCollector + ?Sized,
{
    futures::try_join!(collect(source), collect(target))
}

/// Connect a collector and take its snapshot.
pub async fn collect<C>(collector: &mut C) -> DriftResult<Snapshot>
where
    C: SchemaCollector + ?Sized,
{
    collector.connect().await?;
    let snapshot = collector.describe_schema().await?;
    snapshot.validate()?;
    debug!(
        tables = snapshot.tables.len(),
        sequences = snapshot.sequences.len(),
        "Collected snapshot"
    );
    Ok(snapshot)
}

/// Run statements one at a time, stopping at the first failure.
///
/// Returns the number of statements executed.
pub async fn apply<C>(collector: &C, statements: &[String]) -> DriftResult<usize>
where
    C: SchemaCollector + ?Sized,
{
    for (i, statement) in statements.iter().enumerate() {
        debug!(index = i, sql = %statement, "Applying statement");
        if let Err(e) = collector.execute(statement).await {
            warn!(index = i, error = %e, "Statement failed, stopping");
            return Err(match e {
                DriftError::Execution { .. } => e,
                other => DriftError::execution(statement.as_str(), other.to_string()),
            });
        }
    }
    info!(count = statements.len(), "Applied statements");
    Ok(statements.len())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::snapshot::{Column, Table};

    #[derive(Default)]
    struct MockCollector {
        connected: bool,
        snapshot: Snapshot,
        fail_on: Option<String>,
        executed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SchemaCollector for MockCollector {
        async fn connect(&mut self) -> DriftResult<()> {
            self.connected = true;
            Ok(())
        }

        async fn describe_schema(&self) -> DriftResult<Snapshot> {
            if !self.connected {
                return Err(DriftError::connection("not connected"));
            }
            Ok(self.snapshot.clone())
        }

        async fn execute(&self, sql: &str) -> DriftResult<()> {
            if self.fail_on.as_deref() == Some(sql) {
                return Err(DriftError::query("syntax error"));
            }
            self.executed.lock().unwrap().push(sql.to_string());
            Ok(())
        }

        async fn drop_all(&self) -> DriftResult<()> {
            self.executed.lock().unwrap().clear();
            Ok(())
        }

        async fn close(&mut self) -> DriftResult<()> {
            self.connected = false;
            Ok(())
        }
    }

    fn users() -> Snapshot {
        Snapshot::new().with_table(
            Table::new("public", "users").column_def(Column::new("id", "integer").not_null()),
        )
    }

    #[tokio::test]
    async fn test_collect_pair() {
        let mut source = MockCollector {
            snapshot: users(),
            ..Default::default()
        };
        let mut target = MockCollector::default();

        let (a, b) = collect_pair(&mut source, &mut target).await.unwrap();
        assert_eq!(a.tables.len(), 1);
        assert!(b.is_empty());

        source.close().await.unwrap();
        assert!(source.describe_schema().await.is_err());
    }

    #[tokio::test]
    async fn test_collect_rejects_inconsistent_snapshot() {
        let mut collector = MockCollector {
            snapshot: users().with_table(Table::new("public", "users")),
            ..Default::default()
        };
        let err = collect(&mut collector).await.unwrap_err();
        assert!(matches!(err, DriftError::InconsistentSnapshot(_)));
    }

    #[tokio::test]
    async fn test_apply_runs_in_order() {
        let collector = MockCollector::default();
        let statements = vec!["CREATE SCHEMA \"a\";".to_string(), "CREATE SCHEMA \"b\";".to_string()];

        let count = apply(&collector, &statements).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(*collector.executed.lock().unwrap(), statements);
    }

    #[tokio::test]
    async fn test_apply_stops_at_first_failure() {
        let collector = MockCollector {
            fail_on: Some("bad;".to_string()),
            ..Default::default()
        };
        let statements = vec!["one;".to_string(), "bad;".to_string(), "three;".to_string()];

        let err = apply(&collector, &statements).await.unwrap_err();
        match err {
            DriftError::Execution { statement, message } => {
                assert_eq!(statement, "bad;");
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*collector.executed.lock().unwrap(), vec!["one;".to_string()]);
    }
}
