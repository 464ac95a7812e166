//! Schema diffing.
//!
//! Compares two [`Snapshot`]s and produces the ordered list of [`Change`]s
//! that turns the source into the target. Entities are matched purely by
//! identity key; an entity present on both sides with a different definition
//! is replaced (drop, then create) rather than treated as an unrelated
//! add/remove pair.
//!
//! The output order is fixed so the rendered SQL can be run top to bottom:
//!
//! ```text
//! CreateSchema -> CreateSequence -> CreateTable
//!   -> DropSchema -> DropTable
//!   -> AddColumn -> DropColumn -> AlterColumnType / SetNotNull / DropNotNull  (per table)
//!   -> DropIndex -> CreateIndex
//!   -> DropConstraint -> AddConstraint (primary, unique, foreign)
//!   -> DropSequence
//! ```
//!
//! Sequence properties are not compared; only creation and removal of
//! sequences is detected.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::snapshot::{
    Column, Constraint, ConstraintKind, Index, QualifiedName, Sequence, Snapshot, Table,
    is_plain_identifier, quote_ident,
};

/// Compute the changes that turn `source` into `target`.
pub fn diff(source: &Snapshot, target: &Snapshot) -> Vec<Change> {
    SchemaDiffer::new(source, target).diff()
}

/// Kind of a [`Change`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    CreateSchema,
    DropSchema,
    CreateTable,
    DropTable,
    AddColumn,
    DropColumn,
    AlterColumnType,
    SetNotNull,
    DropNotNull,
    CreateIndex,
    DropIndex,
    AddConstraint,
    DropConstraint,
    CreateSequence,
    DropSequence,
}

impl ChangeKind {
    /// Every kind, in declaration order.
    pub const ALL: [ChangeKind; 15] = [
        ChangeKind::CreateSchema,
        ChangeKind::DropSchema,
        ChangeKind::CreateTable,
        ChangeKind::DropTable,
        ChangeKind::AddColumn,
        ChangeKind::DropColumn,
        ChangeKind::AlterColumnType,
        ChangeKind::SetNotNull,
        ChangeKind::DropNotNull,
        ChangeKind::CreateIndex,
        ChangeKind::DropIndex,
        ChangeKind::AddConstraint,
        ChangeKind::DropConstraint,
        ChangeKind::CreateSequence,
        ChangeKind::DropSequence,
    ];
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single structural difference between two snapshots.
///
/// Changes own everything they need to be rendered and never point back into
/// the snapshots they were derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Create a schema that owns new tables.
    CreateSchema { schema: String },
    /// Drop a schema whose tables are all gone.
    DropSchema { schema: String },
    /// Create a table with its columns.
    CreateTable {
        table: QualifiedName,
        columns: Vec<Column>,
    },
    /// Drop a table.
    DropTable { table: QualifiedName },
    /// Add a column to an existing table.
    AddColumn { table: QualifiedName, column: Column },
    /// Drop a column.
    DropColumn { table: QualifiedName, column: String },
    /// Change a column's type.
    AlterColumnType {
        table: QualifiedName,
        column: String,
        data_type: String,
        previous: String,
    },
    /// Make a column NOT NULL.
    SetNotNull { table: QualifiedName, column: String },
    /// Allow NULL in a column.
    DropNotNull { table: QualifiedName, column: String },
    /// Create an index.
    CreateIndex { table: QualifiedName, index: Index },
    /// Drop an index. `recreated` is set when a `CreateIndex` for the same
    /// identity follows.
    DropIndex {
        index: QualifiedName,
        recreated: bool,
    },
    /// Add a constraint.
    AddConstraint {
        table: QualifiedName,
        constraint: Constraint,
    },
    /// Drop a constraint.
    DropConstraint {
        table: QualifiedName,
        constraint: String,
    },
    /// Create a sequence.
    CreateSequence(Sequence),
    /// Drop a sequence.
    DropSequence { sequence: QualifiedName },
}

impl Change {
    /// The kind of this change.
    pub fn kind(&self) -> ChangeKind {
        match self {
            Change::CreateSchema { .. } => ChangeKind::CreateSchema,
            Change::DropSchema { .. } => ChangeKind::DropSchema,
            Change::CreateTable { .. } => ChangeKind::CreateTable,
            Change::DropTable { .. } => ChangeKind::DropTable,
            Change::AddColumn { .. } => ChangeKind::AddColumn,
            Change::DropColumn { .. } => ChangeKind::DropColumn,
            Change::AlterColumnType { .. } => ChangeKind::AlterColumnType,
            Change::SetNotNull { .. } => ChangeKind::SetNotNull,
            Change::DropNotNull { .. } => ChangeKind::DropNotNull,
            Change::CreateIndex { .. } => ChangeKind::CreateIndex,
            Change::DropIndex { .. } => ChangeKind::DropIndex,
            Change::AddConstraint { .. } => ChangeKind::AddConstraint,
            Change::DropConstraint { .. } => ChangeKind::DropConstraint,
            Change::CreateSequence(_) => ChangeKind::CreateSequence,
            Change::DropSequence { .. } => ChangeKind::DropSequence,
        }
    }

    /// Human-readable identity of the object this change targets, e.g.
    /// `"public"."users"."email"` for a column.
    pub fn target(&self) -> String {
        match self {
            Change::CreateSchema { schema } | Change::DropSchema { schema } => {
                quote_ident(schema)
            }
            Change::CreateTable { table, .. } | Change::DropTable { table } => table.to_string(),
            Change::AddColumn { table, column } => {
                format!("{}.{}", table, quote_ident(&column.name))
            }
            Change::DropColumn { table, column }
            | Change::AlterColumnType { table, column, .. }
            | Change::SetNotNull { table, column }
            | Change::DropNotNull { table, column } => {
                format!("{}.{}", table, quote_ident(column))
            }
            Change::CreateIndex { index, .. } => index.qualified_name().to_string(),
            Change::DropIndex { index, .. } => index.to_string(),
            Change::AddConstraint { constraint, .. } => constraint.qualified_name().to_string(),
            Change::DropConstraint { table, constraint } => {
                QualifiedName::new(&table.schema, constraint).to_string()
            }
            Change::CreateSequence(sequence) => sequence.qualified_name().to_string(),
            Change::DropSequence { sequence } => sequence.to_string(),
        }
    }
}

type TableMap<'a> = BTreeMap<QualifiedName, &'a Table>;

/// Compares a source snapshot (current state) with a target snapshot
/// (desired state).
pub struct SchemaDiffer<'a> {
    source: &'a Snapshot,
    target: &'a Snapshot,
}

impl<'a> SchemaDiffer<'a> {
    /// Create a differ for `source -> target`.
    pub fn new(source: &'a Snapshot, target: &'a Snapshot) -> Self {
        Self { source, target }
    }

    /// Compute the ordered change list.
    pub fn diff(&self) -> Vec<Change> {
        let source_tables = tables_by_name(self.source);
        let target_tables = tables_by_name(self.target);
        let source_schemas = self.source.schemas();
        let target_schemas = self.target.schemas();

        let mut changes = Vec::new();

        for schema in target_schemas.difference(&source_schemas) {
            changes.push(Change::CreateSchema {
                schema: (*schema).to_string(),
            });
        }

        let source_sequences = sequences_by_name(self.source);
        let target_sequences = sequences_by_name(self.target);

        for (name, sequence) in &target_sequences {
            if !source_sequences.contains_key(name) {
                changes.push(Change::CreateSequence((*sequence).clone()));
            }
        }

        for (name, table) in &target_tables {
            if !source_tables.contains_key(name) {
                changes.push(Change::CreateTable {
                    table: name.clone(),
                    columns: table.columns.clone(),
                });
            }
        }

        for schema in source_schemas.difference(&target_schemas) {
            changes.push(Change::DropSchema {
                schema: (*schema).to_string(),
            });
        }

        for name in source_tables.keys() {
            if !target_tables.contains_key(name) {
                changes.push(Change::DropTable {
                    table: name.clone(),
                });
            }
        }

        let mut dropped_columns = BTreeSet::new();
        for (name, target_table) in &target_tables {
            if let Some(source_table) = source_tables.get(name) {
                diff_columns(source_table, target_table, &mut changes, &mut dropped_columns);
            }
        }

        let implicit = ImplicitDrops {
            source_tables: &source_tables,
            target_tables: &target_tables,
            dropped_columns: &dropped_columns,
        };

        self.diff_indexes(&source_tables, &target_tables, &implicit, &mut changes);
        self.diff_constraints(&source_tables, &target_tables, &implicit, &mut changes);

        for name in source_sequences.keys() {
            if !target_sequences.contains_key(name) {
                changes.push(Change::DropSequence {
                    sequence: name.clone(),
                });
            }
        }

        changes
    }

    fn diff_indexes(
        &self,
        source_tables: &TableMap<'_>,
        target_tables: &TableMap<'_>,
        implicit: &ImplicitDrops<'_, '_>,
        changes: &mut Vec<Change>,
    ) {
        // Indexes of dropped tables go away with the table.
        let source_indexes: BTreeMap<QualifiedName, (&Table, &Index)> = source_tables
            .iter()
            .filter(|(name, _)| target_tables.contains_key(*name))
            .flat_map(|(_, table)| table.indexes.iter().map(move |i| (i.qualified_name(), (*table, i))))
            .collect();
        let target_indexes: BTreeMap<QualifiedName, (&Table, &Index)> = target_tables
            .values()
            .flat_map(|table| table.indexes.iter().map(move |i| (i.qualified_name(), (*table, i))))
            .collect();

        let mut creates = Vec::new();

        for (name, (source_table, source_index)) in &source_indexes {
            let implicitly_dropped = implicit.covers_columns(source_table, &source_index.columns);
            match target_indexes.get(name) {
                None => {
                    if !implicitly_dropped {
                        changes.push(Change::DropIndex {
                            index: name.clone(),
                            recreated: false,
                        });
                    }
                }
                Some((target_table, target_index)) => {
                    let same = source_index == target_index
                        && source_table.qualified_name() == target_table.qualified_name();
                    if !same && !implicitly_dropped {
                        changes.push(Change::DropIndex {
                            index: name.clone(),
                            recreated: true,
                        });
                    }
                }
            }
        }

        for (name, (target_table, target_index)) in &target_indexes {
            let needed = match source_indexes.get(name) {
                None => true,
                Some((source_table, source_index)) => {
                    source_index != target_index
                        || source_table.qualified_name() != target_table.qualified_name()
                }
            };
            if needed {
                creates.push(Change::CreateIndex {
                    table: target_table.qualified_name(),
                    index: (*target_index).clone(),
                });
            }
        }

        changes.extend(creates);
    }

    fn diff_constraints(
        &self,
        source_tables: &TableMap<'_>,
        target_tables: &TableMap<'_>,
        implicit: &ImplicitDrops<'_, '_>,
        changes: &mut Vec<Change>,
    ) {
        let source_constraints: BTreeMap<QualifiedName, (&Table, &Constraint)> = source_tables
            .iter()
            .filter(|(name, _)| target_tables.contains_key(*name))
            .flat_map(|(_, table)| {
                table
                    .constraints
                    .iter()
                    .map(move |c| (c.qualified_name(), (*table, c)))
            })
            .collect();
        let target_constraints: BTreeMap<QualifiedName, (&Table, &Constraint)> = target_tables
            .values()
            .flat_map(|table| {
                table
                    .constraints
                    .iter()
                    .map(move |c| (c.qualified_name(), (*table, c)))
            })
            .collect();

        let differs = |source: &(&Table, &Constraint), target: &(&Table, &Constraint)| {
            source.1 != target.1 || source.0.qualified_name() != target.0.qualified_name()
        };

        let mut drops: Vec<(Reverse<ConstraintKind>, &QualifiedName, Change)> = source_constraints
            .iter()
            .filter(|(name, source)| match target_constraints.get(*name) {
                None => true,
                Some(target) => differs(source, target),
            })
            .filter(|(_, (table, constraint))| !implicit.covers_constraint(table, constraint))
            .map(|(name, (table, constraint))| {
                (
                    Reverse(constraint.kind),
                    name,
                    Change::DropConstraint {
                        table: table.qualified_name(),
                        constraint: constraint.name.clone(),
                    },
                )
            })
            .collect();

        // Foreign keys go before the keys they depend on.
        drops.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        changes.extend(drops.into_iter().map(|(_, _, change)| change));

        let mut adds: Vec<(ConstraintKind, &QualifiedName, Change)> = target_constraints
            .iter()
            .filter(|(name, target)| match source_constraints.get(*name) {
                None => true,
                Some(source) => differs(source, *target),
            })
            .map(|(name, (table, constraint))| {
                (
                    constraint.kind,
                    name,
                    Change::AddConstraint {
                        table: table.qualified_name(),
                        constraint: (*constraint).clone(),
                    },
                )
            })
            .collect();

        // Keys must exist before the foreign keys that reference them.
        adds.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        changes.extend(adds.into_iter().map(|(_, _, change)| change));
    }
}

/// Objects the database removes on its own as a side effect of an earlier
/// `DROP TABLE ... CASCADE` or `DROP COLUMN`. Emitting an explicit drop for
/// them would fail when the script runs.
struct ImplicitDrops<'m, 'a> {
    source_tables: &'m TableMap<'a>,
    target_tables: &'m TableMap<'a>,
    dropped_columns: &'m BTreeSet<(QualifiedName, String)>,
}

impl ImplicitDrops<'_, '_> {
    /// Whether any key names a dropped column, directly or inside an
    /// expression such as `lower((email)::text)`.
    fn covers_columns(&self, table: &Table, columns: &[String]) -> bool {
        let name = table.qualified_name();
        columns.iter().any(|key| {
            referenced_identifiers(key)
                .into_iter()
                .any(|c| self.dropped_columns.contains(&(name.clone(), c)))
        })
    }

    fn covers_constraint(&self, table: &Table, constraint: &Constraint) -> bool {
        if self.covers_columns(table, &constraint.columns) {
            return true;
        }
        match &constraint.references {
            Some(reference) => {
                let referenced = reference.table_name();
                self.source_tables.contains_key(&referenced)
                    && !self.target_tables.contains_key(&referenced)
            }
            None => false,
        }
    }
}

/// Identifiers an index key refers to. A plain column name is returned as
/// is; for expressions every bare or quoted identifier outside string
/// literals is returned, except type names following `::`.
fn referenced_identifiers(key: &str) -> Vec<String> {
    if is_plain_identifier(key) {
        return vec![key.to_string()];
    }

    let chars: Vec<char> = key.chars().collect();
    let mut identifiers = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\'' {
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        i += 2;
                        continue;
                    }
                    break;
                }
                i += 1;
            }
            i += 1;
        } else if c == '"' {
            let mut ident = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == '"' {
                    if chars.get(i + 1) == Some(&'"') {
                        ident.push('"');
                        i += 2;
                        continue;
                    }
                    break;
                }
                ident.push(chars[i]);
                i += 1;
            }
            i += 1;
            identifiers.push(ident);
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let is_cast = start >= 2 && chars[start - 1] == ':' && chars[start - 2] == ':';
            if !is_cast {
                identifiers.push(chars[start..i].iter().collect());
            }
        } else if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
        } else {
            i += 1;
        }
    }

    identifiers
}

fn tables_by_name(snapshot: &Snapshot) -> TableMap<'_> {
    snapshot
        .tables
        .iter()
        .map(|t| (t.qualified_name(), t))
        .collect()
}

fn sequences_by_name(snapshot: &Snapshot) -> BTreeMap<QualifiedName, &Sequence> {
    snapshot
        .sequences
        .iter()
        .map(|s| (s.qualified_name(), s))
        .collect()
}

/// Column-level changes for a table present in both snapshots.
fn diff_columns(
    source: &Table,
    target: &Table,
    changes: &mut Vec<Change>,
    dropped_columns: &mut BTreeSet<(QualifiedName, String)>,
) {
    let table = target.qualified_name();
    let source_columns: BTreeMap<&str, &Column> =
        source.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let target_columns: BTreeMap<&str, &Column> =
        target.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    for (name, column) in &target_columns {
        if !source_columns.contains_key(name) {
            changes.push(Change::AddColumn {
                table: table.clone(),
                column: (*column).clone(),
            });
        }
    }

    for name in source_columns.keys() {
        if !target_columns.contains_key(name) {
            changes.push(Change::DropColumn {
                table: table.clone(),
                column: (*name).to_string(),
            });
            dropped_columns.insert((table.clone(), (*name).to_string()));
        }
    }

    for (name, target_column) in &target_columns {
        let Some(source_column) = source_columns.get(name) else {
            continue;
        };

        if source_column.data_type != target_column.data_type {
            changes.push(Change::AlterColumnType {
                table: table.clone(),
                column: (*name).to_string(),
                data_type: target_column.data_type.clone(),
                previous: source_column.data_type.clone(),
            });
        }

        match (source_column.nullable, target_column.nullable) {
            (true, false) => changes.push(Change::SetNotNull {
                table: table.clone(),
                column: (*name).to_string(),
            }),
            (false, true) => changes.push(Change::DropNotNull {
                table: table.clone(),
                column: (*name).to_string(),
            }),
            _ => {}
        }
    }
}
