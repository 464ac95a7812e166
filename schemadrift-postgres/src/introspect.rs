//! Catalog introspection.
//!
//! Reads tables, columns, indexes, constraints and sequences from the
//! PostgreSQL catalogs into a [`Snapshot`]. Queries run in dependency order
//! (tables, then per-table columns, then indexes and constraints attached to
//! those tables, then sequences). Column queries for different tables are
//! pipelined on the one connection with bounded concurrency.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use schemadrift_core::{
    Column, Constraint, ConstraintKind, DriftResult, Index, SchemaCollector, Sequence, Snapshot,
    Table, quote_ident,
};
use tokio_postgres::Row;
use tracing::{debug, info};

use crate::config::PgConfig;
use crate::connection::PgConnection;
use crate::error::{PgError, PgResult};
use crate::types::{ColumnType, parse_constraint_definition, unquote};

const TABLES_QUERY: &str = r#"
SELECT schemaname::text AS schema_name, tablename::text AS table_name
FROM pg_catalog.pg_tables
WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
  AND schemaname NOT LIKE 'pg\_temp\_%'
  AND schemaname NOT LIKE 'pg\_toast%'
ORDER BY schemaname, tablename
"#;

const COLUMNS_QUERY: &str = r#"
SELECT
    column_name::text AS column_name,
    data_type::text AS data_type,
    udt_name::text AS udt_name,
    character_maximum_length::int4 AS character_maximum_length,
    numeric_precision::int4 AS numeric_precision,
    numeric_scale::int4 AS numeric_scale,
    is_nullable::text AS is_nullable,
    column_default::text AS column_default
FROM information_schema.columns
WHERE table_schema::text = $1 AND table_name::text = $2
ORDER BY ordinal_position
"#;

const INDEXES_QUERY: &str = r#"
SELECT
    ns.nspname::text AS index_schema,
    i.relname::text AS index_name,
    tns.nspname::text AS table_schema,
    t.relname::text AS table_name,
    am.amname::text AS method,
    ARRAY(
        SELECT pg_get_indexdef(idx.indexrelid, k + 1, true)
        FROM generate_subscripts(idx.indkey, 1) AS k
        ORDER BY k
    ) AS keys,
    pg_get_expr(idx.indpred, idx.indrelid) AS predicate
FROM pg_index AS idx
JOIN pg_class AS i ON i.oid = idx.indexrelid
JOIN pg_am AS am ON am.oid = i.relam
JOIN pg_namespace AS ns ON ns.oid = i.relnamespace
JOIN pg_class AS t ON t.oid = idx.indrelid
JOIN pg_namespace AS tns ON tns.oid = t.relnamespace
WHERE ns.nspname NOT IN ('pg_catalog', 'pg_toast', 'information_schema')
  AND ns.nspname NOT LIKE 'pg\_temp\_%'
  AND t.relkind IN ('r', 'p')
  AND NOT idx.indisprimary
  AND NOT idx.indisunique
ORDER BY ns.nspname, i.relname
"#;

const CONSTRAINTS_QUERY: &str = r#"
SELECT
    n.nspname::text AS constraint_schema,
    c.conname::text AS constraint_name,
    c.contype::text AS kind,
    tns.nspname::text AS table_schema,
    t.relname::text AS table_name,
    pg_get_constraintdef(c.oid) AS definition
FROM pg_constraint AS c
JOIN pg_namespace AS n ON n.oid = c.connamespace
JOIN pg_class AS t ON t.oid = c.conrelid
JOIN pg_namespace AS tns ON tns.oid = t.relnamespace
WHERE c.contype IN ('f', 'p', 'u')
  AND n.nspname NOT IN ('pg_catalog', 'information_schema')
  AND n.nspname NOT LIKE 'pg\_temp\_%'
  AND t.relkind IN ('r', 'p')
ORDER BY tns.nspname, t.relname, c.contype DESC, c.conname
"#;

const SEQUENCES_QUERY: &str = r#"
SELECT
    sequence_schema::text AS sequence_schema,
    sequence_name::text AS sequence_name,
    data_type::text AS data_type,
    start_value::text AS start_value,
    minimum_value::text AS minimum_value,
    maximum_value::text AS maximum_value,
    increment::text AS increment,
    cycle_option::text AS cycle_option
FROM information_schema.sequences
ORDER BY sequence_schema, sequence_name
"#;

const USER_SCHEMAS_QUERY: &str = r#"
SELECT nspname::text AS schema_name
FROM pg_namespace
WHERE nspname NOT IN ('pg_catalog', 'information_schema')
  AND nspname NOT LIKE 'pg\_%'
ORDER BY nspname
"#;

/// A [`SchemaCollector`] for PostgreSQL.
pub struct PgCollector {
    config: PgConfig,
    conn: Option<PgConnection>,
}

impl PgCollector {
    /// Create a collector. No connection is made until [`connect`](SchemaCollector::connect).
    pub fn new(config: PgConfig) -> Self {
        Self { config, conn: None }
    }

    /// The collector's configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    fn conn(&self) -> PgResult<&PgConnection> {
        self.conn
            .as_ref()
            .ok_or_else(|| PgError::connection("not connected"))
    }

    /// Take a snapshot of every user schema.
    pub async fn snapshot(&self) -> PgResult<Snapshot> {
        let conn = self.conn()?;

        let table_rows = conn.query(TABLES_QUERY, &[]).await?;
        let names = table_rows
            .iter()
            .map(|row| -> PgResult<(String, String)> {
                Ok((row.try_get("schema_name")?, row.try_get("table_name")?))
            })
            .collect::<PgResult<Vec<_>>>()?;

        let tables: Vec<Table> = stream::iter(names)
            .map(|(schema, name)| self.table(conn, schema, name))
            .buffered(self.config.max_concurrency)
            .try_collect()
            .await?;

        let mut tables: BTreeMap<(String, String), Table> = tables
            .into_iter()
            .map(|table| ((table.schema.clone(), table.name.clone()), table))
            .collect();

        self.attach_indexes(conn, &mut tables).await?;
        self.attach_constraints(conn, &mut tables).await?;
        let sequences = self.sequences(conn).await?;

        let snapshot = Snapshot {
            tables: tables.into_values().collect(),
            sequences,
        };

        info!(
            database = %self.config.database,
            tables = snapshot.tables.len(),
            sequences = snapshot.sequences.len(),
            "Described schema"
        );

        Ok(snapshot)
    }

    async fn table(&self, conn: &PgConnection, schema: String, name: String) -> PgResult<Table> {
        let rows = conn.query(COLUMNS_QUERY, &[&schema, &name]).await?;
        debug!(schema = %schema, table = %name, columns = rows.len(), "Fetched columns");

        let mut table = Table::new(schema, name);
        for row in &rows {
            table = table.column_def(column_from_row(row)?);
        }
        Ok(table)
    }

    async fn attach_indexes(
        &self,
        conn: &PgConnection,
        tables: &mut BTreeMap<(String, String), Table>,
    ) -> PgResult<()> {
        let rows = conn.query(INDEXES_QUERY, &[]).await?;
        debug!(count = rows.len(), "Fetched indexes");

        for row in &rows {
            let schema: String = row.try_get("index_schema")?;
            let name: String = row.try_get("index_name")?;
            let owner: (String, String) = (row.try_get("table_schema")?, row.try_get("table_name")?);
            let keys: Vec<String> = row.try_get("keys")?;
            let predicate: Option<String> = row.try_get("predicate")?;

            let table = tables.get_mut(&owner).ok_or_else(|| {
                PgError::inconsistent(format!(
                    "index {}.{} belongs to uncollected table {}.{}",
                    quote_ident(&schema),
                    quote_ident(&name),
                    quote_ident(&owner.0),
                    quote_ident(&owner.1)
                ))
            })?;

            let mut index = Index::new(schema, name, keys.iter().map(|key| unquote(key)))
                .method(row.try_get::<_, String>("method")?);
            if let Some(predicate) = predicate {
                index = index.predicate(predicate);
            }
            table.indexes.push(index);
        }
        Ok(())
    }

    async fn attach_constraints(
        &self,
        conn: &PgConnection,
        tables: &mut BTreeMap<(String, String), Table>,
    ) -> PgResult<()> {
        let rows = conn.query(CONSTRAINTS_QUERY, &[]).await?;
        debug!(count = rows.len(), "Fetched constraints");

        for row in &rows {
            let schema: String = row.try_get("constraint_schema")?;
            let name: String = row.try_get("constraint_name")?;
            let owner: (String, String) = (row.try_get("table_schema")?, row.try_get("table_name")?);
            let definition: String = row.try_get("definition")?;

            let kind = match row.try_get::<_, String>("kind")?.as_str() {
                "p" => ConstraintKind::Primary,
                "u" => ConstraintKind::Unique,
                "f" => ConstraintKind::Foreign,
                other => {
                    return Err(PgError::catalog(format!(
                        "unexpected constraint type '{}' for {}",
                        other, name
                    )));
                }
            };

            let table = tables.get_mut(&owner).ok_or_else(|| {
                PgError::inconsistent(format!(
                    "constraint {}.{} belongs to uncollected table {}.{}",
                    quote_ident(&schema),
                    quote_ident(&name),
                    quote_ident(&owner.0),
                    quote_ident(&owner.1)
                ))
            })?;

            let parsed = parse_constraint_definition(&definition)?;
            let constraint = match (kind, parsed.references) {
                (ConstraintKind::Foreign, Some(references)) => {
                    Constraint::foreign(schema, name, parsed.columns, references)
                        .on_actions(parsed.on_actions)
                }
                (ConstraintKind::Foreign, None) => {
                    return Err(PgError::catalog(format!(
                        "foreign key {} has no REFERENCES clause: {}",
                        name, definition
                    )));
                }
                (ConstraintKind::Primary, _) => Constraint::primary(schema, name, parsed.columns),
                (ConstraintKind::Unique, _) => Constraint::unique(schema, name, parsed.columns),
            };
            table.constraints.push(constraint);
        }
        Ok(())
    }

    async fn sequences(&self, conn: &PgConnection) -> PgResult<Vec<Sequence>> {
        let rows = conn.query(SEQUENCES_QUERY, &[]).await?;
        debug!(count = rows.len(), "Fetched sequences");
        rows.iter().map(sequence_from_row).collect()
    }

    /// Drop every user schema and recreate an empty `public`.
    pub async fn reset(&self) -> PgResult<()> {
        let conn = self.conn()?;
        let rows = conn.query(USER_SCHEMAS_QUERY, &[]).await?;

        let mut sql = String::new();
        for row in &rows {
            let schema: String = row.try_get("schema_name")?;
            sql.push_str(&format!("DROP SCHEMA IF EXISTS {} CASCADE;\n", quote_ident(&schema)));
        }
        sql.push_str("CREATE SCHEMA IF NOT EXISTS \"public\";");

        info!(database = %self.config.database, schemas = rows.len(), "Resetting database");
        conn.batch_execute(&sql).await
    }
}

fn column_from_row(row: &Row) -> PgResult<Column> {
    let data_type: String = row.try_get("data_type")?;
    let udt_name: String = row.try_get("udt_name")?;
    let ty = ColumnType {
        data_type: &data_type,
        udt_name: &udt_name,
        character_maximum_length: row.try_get("character_maximum_length")?,
        numeric_precision: row.try_get("numeric_precision")?,
        numeric_scale: row.try_get("numeric_scale")?,
    };

    let mut column = Column::new(row.try_get::<_, String>("column_name")?, ty.normalize());
    if row.try_get::<_, String>("is_nullable")? != "YES" {
        column = column.not_null();
    }
    if let Some(default) = row.try_get::<_, Option<String>>("column_default")? {
        column = column.default_value(default);
    }
    Ok(column)
}

fn sequence_from_row(row: &Row) -> PgResult<Sequence> {
    Ok(
        Sequence::new(
            row.try_get::<_, String>("sequence_schema")?,
            row.try_get::<_, String>("sequence_name")?,
        )
        .data_type(
            row.try_get::<_, String>("data_type")?,
            row.try_get::<_, String>("maximum_value")?,
        )
        .increment(row.try_get::<_, String>("increment")?)
        .start(row.try_get::<_, String>("start_value")?)
        .minimum(row.try_get::<_, String>("minimum_value")?)
        .cycle(row.try_get::<_, String>("cycle_option")? == "YES"),
    )
}

#[async_trait]
impl SchemaCollector for PgCollector {
    async fn connect(&mut self) -> DriftResult<()> {
        if self.conn.as_ref().is_some_and(|conn| !conn.is_closed()) {
            return Ok(());
        }
        self.conn = Some(PgConnection::connect(&self.config).await?);
        Ok(())
    }

    async fn describe_schema(&self) -> DriftResult<Snapshot> {
        Ok(self.snapshot().await?)
    }

    async fn execute(&self, sql: &str) -> DriftResult<()> {
        Ok(self.conn()?.batch_execute(sql).await?)
    }

    async fn drop_all(&self) -> DriftResult<()> {
        Ok(self.reset().await?)
    }

    async fn close(&mut self) -> DriftResult<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_not_connected() {
        let config = PgConfig::from_url("postgres://postgres@localhost/db1").unwrap();
        let collector = PgCollector::new(config);

        let err = collector.describe_schema().await.unwrap_err();
        assert!(matches!(err, schemadrift_core::DriftError::Connection(_)));
        assert!(collector.execute("SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn test_close_without_connect() {
        let config = PgConfig::from_url("postgres://postgres@localhost/db1").unwrap();
        let mut collector = PgCollector::new(config);
        collector.close().await.unwrap();
    }

    #[test]
    fn test_catalog_queries_cast_to_text() {
        for query in [TABLES_QUERY, COLUMNS_QUERY, CONSTRAINTS_QUERY, SEQUENCES_QUERY] {
            assert!(query.contains("::text"));
        }
        assert!(INDEXES_QUERY.contains("NOT idx.indisprimary"));
        assert!(INDEXES_QUERY.contains("NOT idx.indisunique"));
    }
}
