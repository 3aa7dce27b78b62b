//! Reverting the working tree to a recorded snapshot.

use super::{Git, Snapshot, SnapshotCatalog};
use crate::config::SnapshotConfig;
use crate::error::{Result, UpshiftError};
use crate::models::FileError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreStatus {
    /// Every recorded layer was restored.
    Full,
    /// At least one step failed or a layer was missing.
    Partial,
}

/// What a restore did, step by step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreReport {
    pub snapshot: Snapshot,
    /// `None` when the snapshot has no git revision.
    pub git_reset: Option<bool>,
    pub restored_files: Vec<PathBuf>,
    /// Files created after the snapshot and removed by the restore.
    pub removed_files: Vec<PathBuf>,
    pub failures: Vec<FileError>,
}

impl RestoreReport {
    pub fn status(&self) -> RestoreStatus {
        let git_ok = self.git_reset != Some(false);
        let has_layer = self.git_reset.is_some() || self.snapshot.file_copy_dir.is_some();
        if git_ok && has_layer && self.failures.is_empty() {
            RestoreStatus::Full
        } else {
            RestoreStatus::Partial
        }
    }
}

/// Restores snapshots recorded by [`SnapshotManager`](super::SnapshotManager).
#[derive(Debug, Clone)]
pub struct RestoreManager {
    project_root: PathBuf,
}

impl RestoreManager {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Restore the snapshot with the given id.
    ///
    /// The git layer is reset first, then the copied files are laid over the
    /// project root. A failed git reset is logged and the overlay still runs.
    ///
    /// # Errors
    ///
    /// `SnapshotNotFound` when the id is not in the catalog. Nothing is
    /// touched in that case.
    pub async fn restore_snapshot(&self, id: &str) -> Result<RestoreReport> {
        let catalog = SnapshotCatalog::load(&self.project_root)?;
        let snapshot = catalog
            .get(id)
            .cloned()
            .ok_or_else(|| UpshiftError::SnapshotNotFound { id: id.to_string() })?;

        info!("Restoring snapshot {} ({})", snapshot.id, snapshot.description);

        let mut report = RestoreReport {
            snapshot: snapshot.clone(),
            git_reset: None,
            restored_files: Vec::new(),
            removed_files: Vec::new(),
            failures: Vec::new(),
        };

        if let Some(revision) = &snapshot.vcs_revision {
            let git = Git::new(&self.project_root);
            match git.reset_hard(revision).await {
                Ok(()) => {
                    debug!("Reset work tree to {}", revision);
                    report.git_reset = Some(true);
                }
                Err(e) => {
                    warn!("git reset to {} failed: {}", revision, e);
                    report.git_reset = Some(false);
                }
            }
        }

        if let Some(copy_dir) = &snapshot.file_copy_dir {
            self.overlay_files(&self.project_root.join(copy_dir), &mut report);
        }

        match report.status() {
            RestoreStatus::Full => info!("Snapshot {} fully restored", id),
            RestoreStatus::Partial => warn!("Snapshot {} only partially restored", id),
        }
        Ok(report)
    }

    fn overlay_files(&self, copy_dir: &Path, report: &mut RestoreReport) {
        if !copy_dir.is_dir() {
            report.failures.push(FileError {
                file: copy_dir.to_path_buf(),
                message: "snapshot copy directory is missing".to_string(),
            });
            return;
        }

        for entry in WalkDir::new(copy_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.failures.push(FileError {
                        file: e.path().map(Path::to_path_buf).unwrap_or_default(),
                        message: e.to_string(),
                    });
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(copy_dir) else {
                continue;
            };

            match restore_file(entry.path(), &self.project_root.join(relative)) {
                Ok(()) => report.restored_files.push(relative.to_path_buf()),
                Err(e) => report.failures.push(FileError {
                    file: relative.to_path_buf(),
                    message: e.to_string(),
                }),
            }
        }

        for generated in SnapshotConfig::GENERATED_FILES {
            let target = self.project_root.join(generated);
            if copy_dir.join(generated).exists() || !target.is_file() {
                continue;
            }
            match std::fs::remove_file(&target) {
                Ok(()) => report.removed_files.push(PathBuf::from(generated)),
                Err(e) => report.failures.push(FileError {
                    file: PathBuf::from(generated),
                    message: e.to_string(),
                }),
            }
        }
    }
}

fn restore_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| UpshiftError::io_with_path(e, parent))?;
    }
    std::fs::copy(source, target).map_err(|e| UpshiftError::io_with_path(e, target))?;
    Ok(())
}
