//! Normalized, point-in-time description of a database schema.
//!
//! A [`Snapshot`] is what a collector hands to the diff engine. Every entity
//! carries the fields that make up its identity key, so two snapshots taken
//! from different databases can be matched without any catalog lookups.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DriftError, DriftResult};

/// Quote an identifier for use in generated SQL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A schema-qualified object name. Used as the identity key of tables,
/// indexes, constraints and sequences.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema (namespace) name.
    pub schema: String,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// Create a new qualified name.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", quote_ident(&self.schema), quote_ident(&self.name))
    }
}

/// Structural description of one database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// All user tables.
    pub tables: Vec<Table>,
    /// All sequences.
    pub sequences: Vec<Sequence>,
}

impl Snapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table.
    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Add a sequence.
    pub fn with_sequence(mut self, sequence: Sequence) -> Self {
        self.sequences.push(sequence);
        self
    }

    /// Check if the snapshot describes no objects at all.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.sequences.is_empty()
    }

    /// Names of the schemas that own at least one table or sequence, sorted.
    pub fn schemas(&self) -> BTreeSet<&str> {
        self.tables
            .iter()
            .map(|t| t.schema.as_str())
            .chain(self.sequences.iter().map(|s| s.schema.as_str()))
            .collect()
    }

    /// Find a table by identity.
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.schema == schema && t.name == name)
    }

    /// Find a sequence by identity.
    pub fn sequence(&self, schema: &str, name: &str) -> Option<&Sequence> {
        self.sequences
            .iter()
            .find(|s| s.schema == schema && s.name == name)
    }

    /// Check that identity keys are unique and that every index and
    /// constraint only names columns its table actually has.
    ///
    /// Expression indexes are exempt from the column check.
    pub fn validate(&self) -> DriftResult<()> {
        let mut tables = HashSet::new();
        let mut indexes = HashSet::new();
        let mut constraints = HashSet::new();

        for table in &self.tables {
            if !tables.insert(table.qualified_name()) {
                return Err(DriftError::inconsistent(format!(
                    "table {} appears more than once",
                    table.qualified_name()
                )));
            }

            for index in &table.indexes {
                if !indexes.insert(index.qualified_name()) {
                    return Err(DriftError::inconsistent(format!(
                        "index {} appears more than once",
                        index.qualified_name()
                    )));
                }
                for column in &index.columns {
                    if is_plain_identifier(column) && table.column(column).is_none() {
                        return Err(DriftError::inconsistent(format!(
                            "index {} references unknown column {} of table {}",
                            index.qualified_name(),
                            quote_ident(column),
                            table.qualified_name()
                        )));
                    }
                }
            }

            for constraint in &table.constraints {
                if !constraints.insert(constraint.qualified_name()) {
                    return Err(DriftError::inconsistent(format!(
                        "constraint {} appears more than once",
                        constraint.qualified_name()
                    )));
                }
                if let Some(missing) = constraint
                    .columns
                    .iter()
                    .find(|c| table.column(c).is_none())
                {
                    return Err(DriftError::inconsistent(format!(
                        "constraint {} references unknown column {} of table {}",
                        constraint.qualified_name(),
                        quote_ident(missing),
                        table.qualified_name()
                    )));
                }
            }
        }

        let mut sequences = HashSet::new();
        for sequence in &self.sequences {
            if !sequences.insert(sequence.qualified_name()) {
                return Err(DriftError::inconsistent(format!(
                    "sequence {} appears more than once",
                    sequence.qualified_name()
                )));
            }
        }

        Ok(())
    }
}

/// Whether an index key is a bare column name rather than an expression.
pub(crate) fn is_plain_identifier(column: &str) -> bool {
    !column.contains(['(', ')', ' ', ':'])
}

/// A table and everything attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Owning schema.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    #[serde(default)]
    pub columns: Vec<Column>,
    /// Secondary (non-unique, non-primary) indexes.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Primary key, unique and foreign key constraints.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Table {
    /// Create a table with no columns.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            columns: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a column.
    pub fn column_def(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Add an index.
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    /// Add a constraint.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Identity key.
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }

    /// Find a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Default expression, as reported by the catalog.
    #[serde(default)]
    pub default_value: Option<String>,
    /// Normalized type, including length/precision (e.g. `numeric(15,10)`).
    #[serde(rename = "type")]
    pub data_type: String,
}

impl Column {
    /// Create a nullable column without a default.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            default_value: None,
            data_type: data_type.into(),
        }
    }

    /// Mark the column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default expression.
    pub fn default_value(mut self, expr: impl Into<String>) -> Self {
        self.default_value = Some(expr.into());
        self
    }
}

/// A secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Schema the index lives in.
    pub schema: String,
    /// Index name.
    pub name: String,
    /// Access method (`btree`, `gin`, ...).
    #[serde(rename = "type")]
    pub method: String,
    /// Indexed columns or expressions, in key order.
    pub columns: Vec<String>,
    /// Partial index condition.
    #[serde(default)]
    pub predicate: Option<String>,
}

impl Index {
    /// Create a btree index over the given columns.
    pub fn new<I, S>(schema: impl Into<String>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            name: name.into(),
            method: "btree".to_string(),
            columns: columns.into_iter().map(Into::into).collect(),
            predicate: None,
        }
    }

    /// Set the access method.
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Make this a partial index.
    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    /// Identity key.
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }
}

/// Kind of table constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    /// PRIMARY KEY.
    Primary,
    /// UNIQUE.
    Unique,
    /// FOREIGN KEY.
    Foreign,
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignReference {
    /// Referenced table schema.
    pub schema: String,
    /// Referenced table name.
    pub table: String,
    /// Referenced columns.
    pub columns: Vec<String>,
}

impl ForeignReference {
    /// Create a reference to `schema.table(columns)`.
    pub fn new<I, S>(schema: impl Into<String>, table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            table: table.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    /// Identity of the referenced table.
    pub fn table_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.table)
    }
}

/// A primary key, unique or foreign key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Schema the constraint lives in.
    pub schema: String,
    /// Constraint name.
    pub name: String,
    /// Constraint kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// Constrained columns.
    pub columns: Vec<String>,
    /// Referenced table, foreign keys only.
    #[serde(default)]
    pub references: Option<ForeignReference>,
    /// Normalized `ON UPDATE ... ON DELETE ...` clause, foreign keys only.
    #[serde(default)]
    pub on_actions: String,
}

impl Constraint {
    fn new<I, S>(
        schema: impl Into<String>,
        name: impl Into<String>,
        kind: ConstraintKind,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schema: schema.into(),
            name: name.into(),
            kind,
            columns: columns.into_iter().map(Into::into).collect(),
            references: None,
            on_actions: String::new(),
        }
    }

    /// Create a primary key constraint.
    pub fn primary<I, S>(schema: impl Into<String>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(schema, name, ConstraintKind::Primary, columns)
    }

    /// Create a unique constraint.
    pub fn unique<I, S>(schema: impl Into<String>, name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(schema, name, ConstraintKind::Unique, columns)
    }

    /// Create a foreign key constraint.
    pub fn foreign<I, S>(
        schema: impl Into<String>,
        name: impl Into<String>,
        columns: I,
        references: ForeignReference,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut constraint = Self::new(schema, name, ConstraintKind::Foreign, columns);
        constraint.references = Some(references);
        constraint
    }

    /// Set the referential action clause.
    pub fn on_actions(mut self, actions: impl Into<String>) -> Self {
        self.on_actions = actions.into();
        self
    }

    /// Identity key.
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }
}

/// A sequence. Numeric properties are kept as catalog text so that values
/// beyond `i64` (or `numeric` sequences) survive unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Owning schema.
    pub schema: String,
    /// Sequence name.
    pub name: String,
    /// Value type (`bigint`, `integer`, ...).
    pub data_type: String,
    /// START value.
    pub start_value: String,
    /// MINVALUE.
    pub minimum_value: String,
    /// MAXVALUE.
    pub maximum_value: String,
    /// INCREMENT.
    pub increment: String,
    /// Whether the sequence wraps around.
    pub cycle: bool,
}

impl Sequence {
    /// Create a sequence with PostgreSQL's `bigint` defaults.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
            data_type: "bigint".to_string(),
            start_value: "1".to_string(),
            minimum_value: "1".to_string(),
            maximum_value: i64::MAX.to_string(),
            increment: "1".to_string(),
            cycle: false,
        }
    }

    /// Set the value type and its matching maximum (integer serials).
    pub fn data_type(mut self, data_type: impl Into<String>, maximum: impl Into<String>) -> Self {
        self.data_type = data_type.into();
        self.maximum_value = maximum.into();
        self
    }

    /// Set the increment.
    pub fn increment(mut self, increment: impl Into<String>) -> Self {
        self.increment = increment.into();
        self
    }

    /// Set the minimum value.
    pub fn minimum(mut self, minimum: impl Into<String>) -> Self {
        self.minimum_value = minimum.into();
        self
    }

    /// Set the start value.
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start_value = start.into();
        self
    }

    /// Make the sequence cycle.
    pub fn cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    /// Identity key.
    pub fn qualified_name(&self) -> QualifiedName {
        QualifiedName::new(&self.schema, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> Table {
        Table::new("public", "users")
            .column_def(Column::new("id", "integer").not_null())
            .column_def(Column::new("email", "character varying(255)"))
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_qualified_name_display() {
        let name = QualifiedName::new("public", "users");
        assert_eq!(name.to_string(), "\"public\".\"users\"");
    }

    #[test]
    fn test_schemas_are_sorted_and_unique() {
        let snapshot = Snapshot::new()
            .with_table(Table::new("sales", "orders"))
            .with_table(users())
            .with_table(Table::new("public", "items"))
            .with_sequence(Sequence::new("audit", "log_seq"));

        let schemas: Vec<&str> = snapshot.schemas().into_iter().collect();
        assert_eq!(schemas, vec!["audit", "public", "sales"]);
    }

    #[test]
    fn test_lookups() {
        let snapshot = Snapshot::new()
            .with_table(users())
            .with_sequence(Sequence::new("public", "users_id_seq"));

        assert!(snapshot.table("public", "users").is_some());
        assert!(snapshot.table("other", "users").is_none());
        assert!(snapshot.sequence("public", "users_id_seq").is_some());
        assert_eq!(
            snapshot.table("public", "users").and_then(|t| t.column("id")).map(|c| c.nullable),
            Some(false)
        );
    }

    #[test]
    fn test_validate_accepts_consistent_snapshot() {
        let snapshot = Snapshot::new().with_table(
            users()
                .index(Index::new("public", "users_email", ["email"]))
                .index(Index::new("public", "users_lower_email", ["lower((email)::text)"]))
                .constraint(Constraint::primary("public", "users_pk", ["id"])),
        );
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_table() {
        let snapshot = Snapshot::new().with_table(users()).with_table(users());
        let err = snapshot.validate().unwrap_err();
        assert!(err.to_string().contains("appears more than once"));
    }

    #[test]
    fn test_validate_rejects_unknown_constraint_column() {
        let snapshot = Snapshot::new()
            .with_table(users().constraint(Constraint::unique("public", "u", ["missing"])));
        let err = snapshot.validate().unwrap_err();
        assert!(matches!(err, DriftError::InconsistentSnapshot(_)));
        assert!(err.to_string().contains("\"missing\""));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = Snapshot::new().with_table(users());
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["tables"][0]["columns"][1]["type"], "character varying(255)");

        let parsed: Snapshot = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
