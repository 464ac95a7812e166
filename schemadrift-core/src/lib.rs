//! # schemadrift-core
//!
//! Diff engine for schemadrift.
//!
//! This crate provides:
//! - A dialect-neutral [`Snapshot`] of tables, columns, indexes, constraints
//!   and sequences
//! - A deterministic structural diff producing an ordered list of [`Change`]s
//! - A fixed destructiveness [`Tier`] per change kind and a [`SafetyLevel`]
//!   policy on top of it
//! - A SQL renderer that comments out statements the level does not allow
//! - The [`SchemaCollector`] trait that database dialects implement
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────┐     ┌──────────┐
//! │ Collector A │────▶│            │     │          │     │          │
//! └─────────────┘     │   diff()   │────▶│ classify │────▶│  render  │
//! ┌─────────────┐     │            │     │          │     │          │
//! │ Collector B │────▶│            │     └──────────┘     └──────────┘
//! └─────────────┘     └────────────┘
//! ```
//!
//! Only the collectors touch a database. Diffing, classification and
//! rendering are pure functions of the two snapshots.
//!
//! ## Example
//!
//! ```rust
//! use schemadrift_core::{Column, SafetyLevel, Snapshot, Table, diff, render};
//!
//! let source = Snapshot::new();
//! let target = Snapshot::new().with_table(
//!     Table::new("public", "users").column_def(Column::new("id", "integer").not_null()),
//! );
//!
//! let changes = diff(&source, &target);
//! let sql = render(&changes, SafetyLevel::Safe);
//! assert!(sql.starts_with("CREATE SCHEMA IF NOT EXISTS \"public\";"));
//! ```

pub mod classify;
pub mod collector;
pub mod connection;
pub mod diff;
pub mod error;
pub mod snapshot;
pub mod sql;

pub use classify::{SafetyLevel, Tier, classify};
pub use collector::{SchemaCollector, apply, collect, collect_pair};
pub use connection::ConnectionConfig;
pub use diff::{Change, ChangeKind, SchemaDiffer, diff};
pub use error::{DriftError, DriftResult};
pub use snapshot::{
    Column, Constraint, ConstraintKind, ForeignReference, Index, QualifiedName, Sequence, Snapshot,
    Table, quote_ident,
};
pub use sql::{SqlRenderer, render, render_statements};
