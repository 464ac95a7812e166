//! # schemadrift
//!
//! Detect schema drift between two databases and generate the SQL that
//! reconciles them.
//!
//! schemadrift provides:
//! - Snapshots of tables, columns, indexes, constraints and sequences
//! - A deterministic diff producing an ordered list of changes
//! - Safe / risky / destructive classification of every change
//! - SQL rendering where disallowed changes are commented out
//! - A PostgreSQL collector (behind the default `postgres` feature)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use schemadrift::prelude::*;
//! use schemadrift::postgres::{PgCollector, PgConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), schemadrift::Error> {
//!     let mut current = PgCollector::new(PgConfig::from_url("postgres://localhost/staging")?);
//!     let mut desired = PgCollector::new(PgConfig::from_url("postgres://localhost/prod")?);
//!
//!     let (a, b) = collect_pair(&mut current, &mut desired).await?;
//!     println!("{}", render(&diff(&a, &b), SafetyLevel::Warn));
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Snapshot model, diff engine, classifier and renderer.
pub mod core {
    pub use schemadrift_core::*;
}

/// PostgreSQL snapshot collector.
#[cfg(feature = "postgres")]
#[cfg_attr(docsrs, doc(cfg(feature = "postgres")))]
pub mod postgres {
    pub use schemadrift_postgres::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use schemadrift_core::{
        Change, ChangeKind, Column, Constraint, ConnectionConfig, Index, SafetyLevel,
        SchemaCollector, Sequence, Snapshot, Table, Tier, collect_pair, diff, render,
    };
}

// Re-export key types at the crate root
pub use schemadrift_core::{
    Change, ChangeKind, DriftError as Error, DriftResult as Result, SafetyLevel, Snapshot, Tier,
    classify, diff, render, render_statements,
};
