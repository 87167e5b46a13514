//! On-disk snapshot of the feed table.
//!
//! The snapshot is a JSON object mapping slug to feed. Writes go to a
//! temporary file next to the target which is then renamed over it, so a
//! crash mid-write leaves the previous snapshot intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::app::Result;
use crate::store::FeedTable;

pub fn encode(table: &FeedTable) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(table)?)
}

/// Read the snapshot at `path`. Missing or unreadable snapshots yield an
/// empty table.
pub fn load(path: &Path) -> FeedTable {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No feed cache yet, starting empty");
            return FeedTable::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read feed cache, starting empty");
            return FeedTable::new();
        }
    };

    match serde_json::from_slice(&content) {
        Ok(table) => table,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Feed cache is corrupt, starting empty");
            FeedTable::new()
        }
    }
}

/// Replace the file at `path` with `bytes` atomically.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
