//! The compare command: collect, diff, render, and optionally apply.

use std::path::Path;

use schemadrift_core::{
    SafetyLevel, SchemaCollector, Snapshot, SqlRenderer, apply, collect, diff,
};
use tracing::{debug, info};

use crate::cli::Cli;
use crate::config::{SOURCE_SNAPSHOT_FILE, Source, TARGET_SNAPSHOT_FILE, load_snapshot, save_snapshot};
use crate::error::{CliError, CliResult};
use crate::output;
use crate::registry::{Collector, collector_for};

/// Result of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Number of changes found.
    pub changes: usize,
    /// Number of statements executed with `--apply`.
    pub applied: usize,
}

impl Outcome {
    /// Whether the two schemas differ.
    pub fn has_differences(&self) -> bool {
        self.changes > 0
    }
}

/// One side of the comparison, ready to produce a snapshot.
enum Side<C = Collector> {
    Live(C),
    Saved(Snapshot),
}

impl Side {
    /// Resolve everything that can fail without touching a database.
    fn prepare(source: &Source, concurrency: usize) -> CliResult<Self> {
        match source {
            Source::Database(config) => Ok(Side::Live(collector_for(config, concurrency)?)),
            Source::Saved(path) => Ok(Side::Saved(load_snapshot(path)?)),
        }
    }
}

impl<C: SchemaCollector> Side<C> {
    async fn snapshot(&mut self) -> CliResult<Snapshot> {
        match self {
            Side::Live(collector) => Ok(collect(collector).await?),
            Side::Saved(snapshot) => Ok(snapshot.clone()),
        }
    }

    async fn close(&mut self) -> CliResult<()> {
        if let Side::Live(collector) = self {
            collector.close().await?;
        }
        Ok(())
    }
}

/// Run the compare command.
pub async fn run(cli: Cli) -> CliResult<Outcome> {
    let level = SafetyLevel::from(cli.level);

    let source = Source::resolve(&cli.source)?;
    let target = Source::resolve(&cli.target)?;
    if cli.apply && !source.is_live() {
        return Err(CliError::Command(format!(
            "--apply needs a database as the first connection, got snapshot {}",
            source
        )));
    }

    let mut a = Side::prepare(&source, cli.concurrency)?;
    let mut b = Side::prepare(&target, cli.concurrency)?;

    info!(source = %source, target = %target, level = %level, "Comparing schemas");
    let result = compare(&cli, level, &source, &mut a, &mut b).await;
    finish(result, &mut a, &mut b).await
}

async fn compare<C: SchemaCollector>(
    cli: &Cli,
    level: SafetyLevel,
    source: &Source,
    a: &mut Side<C>,
    b: &mut Side<C>,
) -> CliResult<Outcome> {
    let (before, after) = tokio::try_join!(a.snapshot(), b.snapshot())?;

    if let Some(dir) = &cli.dump_snapshots {
        dump(dir, &before, &after)?;
    }

    let changes = diff(&before, &after);
    debug!(count = changes.len(), "Computed changes");

    let renderer = SqlRenderer::new(level);
    output::sql(&renderer.render(&changes));

    let mut applied = 0;
    if cli.apply {
        let statements = renderer.executable_statements(&changes);
        let skipped = changes.len() - statements.len();
        if skipped > 0 {
            output::warn(&format!(
                "Skipping {} change(s) not allowed at level '{}'",
                skipped, level
            ));
        }
        if let Side::Live(collector) = &*a {
            applied = apply(collector, &statements).await?;
        }
        if applied > 0 {
            output::success(&format!("Applied {} statement(s) to {}", applied, source));
        } else {
            output::info("Nothing to apply");
        }
    }

    Ok(Outcome {
        changes: changes.len(),
        applied,
    })
}

/// Close both sides, then report the first error.
///
/// A comparison error wins over a close error.
async fn finish<C: SchemaCollector, T>(
    result: CliResult<T>,
    a: &mut Side<C>,
    b: &mut Side<C>,
) -> CliResult<T> {
    let closed_a = a.close().await;
    let closed_b = b.close().await;
    let value = result?;
    closed_a?;
    closed_b?;
    Ok(value)
}

fn dump(dir: &Path, before: &Snapshot, after: &Snapshot) -> CliResult<()> {
    let source = save_snapshot(dir, SOURCE_SNAPSHOT_FILE, before)?;
    let target = save_snapshot(dir, TARGET_SNAPSHOT_FILE, after)?;
    output::info("Wrote snapshots");
    output::kv("source", &source.display().to_string());
    output::kv("target", &target.display().to_string());
    Ok(())
}
