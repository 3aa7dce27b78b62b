//! Crash-safe file replacement.
//!
//! Content goes to a sibling temp file, is synced, then renamed over the
//! target so readers only ever see the old or the new bytes.

use crate::error::{Result, UpshiftError};
use serde::{de::DeserializeOwned, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Replace `path` with `contents`, creating parent directories as needed.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| UpshiftError::io_with_path(e, parent))?;
    }

    let temp_path = temp_path_for(path);
    let written = write_synced(&temp_path, contents).and_then(|()| {
        fs::rename(&temp_path, path).map_err(|e| UpshiftError::io_with_path(e, path))
    });

    if written.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    written?;

    debug!("Atomically wrote {}", path.display());
    Ok(())
}

/// Read and parse a JSON file. Returns `None` if the file doesn't exist.
pub fn atomic_read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(UpshiftError::io_with_path(e, path)),
    };

    let data = serde_json::from_str(&contents).map_err(|e| UpshiftError::Json {
        message: format!("Failed to parse {}: {}", path.display(), e),
        source: Some(e),
    })?;

    Ok(Some(data))
}

/// Serialize `data` as pretty JSON and write it atomically.
pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let mut serialized = serde_json::to_string_pretty(data).map_err(|e| UpshiftError::Json {
        message: format!("Failed to serialize {}: {}", path.display(), e),
        source: Some(e),
    })?;
    serialized.push('\n');
    atomic_write(path, serialized.as_bytes())
}

fn write_synced(temp_path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)
        .map_err(|e| UpshiftError::io_with_path(e, temp_path))?;

    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| UpshiftError::io_with_path(e, temp_path))
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    path.with_file_name(format!(".{}.{}.tmp", file_name, &suffix[..8]))
}
