//! Connection argument handling.
//!
//! Each positional argument names one side of the comparison:
//! - anything containing `://` is a connection URI,
//! - a path ending in `.json` is a snapshot saved with `--dump-snapshots`,
//! - any other path is a TOML file holding a connection description.

use std::fmt;
use std::path::{Path, PathBuf};

use schemadrift_core::{ConnectionConfig, Snapshot};

use crate::error::{CliError, CliResult};

/// File name used for the first snapshot when dumping.
pub const SOURCE_SNAPSHOT_FILE: &str = "source.json";

/// File name used for the second snapshot when dumping.
pub const TARGET_SNAPSHOT_FILE: &str = "target.json";

/// Where one side of the comparison comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// A live database.
    Database(ConnectionConfig),
    /// A snapshot file.
    Saved(PathBuf),
}

impl Source {
    /// Interpret a positional argument.
    pub fn resolve(arg: &str) -> CliResult<Self> {
        if arg.contains("://") {
            return Ok(Source::Database(ConnectionConfig::from_uri(arg)?));
        }

        let path = PathBuf::from(arg);
        if path.extension().is_some_and(|ext| ext == "json") {
            return Ok(Source::Saved(path));
        }

        Ok(Source::Database(load_connection_file(&path)?))
    }

    /// Whether statements can be executed against this side.
    pub fn is_live(&self) -> bool {
        matches!(self, Source::Database(_))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Database(config) => write!(f, "{}", config),
            Source::Saved(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load a TOML connection file.
pub fn load_connection_file(path: &Path) -> CliResult<ConnectionConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::Config(format!("Failed to read connection file {}: {}", path.display(), e))
    })?;
    let config: ConnectionConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load and validate a saved snapshot.
pub fn load_snapshot(path: &Path) -> CliResult<Snapshot> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CliError::Snapshot(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let snapshot: Snapshot = serde_json::from_str(&content)?;
    snapshot.validate()?;
    Ok(snapshot)
}

/// Write a snapshot as pretty JSON into `dir`, creating it if needed.
pub fn save_snapshot(dir: &Path, file_name: &str, snapshot: &Snapshot) -> CliResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, serde_json::to_string_pretty(snapshot)?)?;
    Ok(path)
}
