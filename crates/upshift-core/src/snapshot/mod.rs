//! Reversible checkpoints of the working tree.
//!
//! A snapshot combines two independent layers:
//!
//! - a git checkpoint (a dedicated backup commit), taken only inside a work tree
//! - a file copy of the critical project files under `.upshift/snapshots/<id>/`
//!
//! Either layer may fail on its own; the failure is logged and the other layer
//! still counts. Snapshots are recorded newest first in `.upshift/snapshots.json`.
//! A snapshot that ages out of the catalog loses its file copy.

mod catalog;
mod git;
mod restore;

pub use catalog::{Snapshot, SnapshotCatalog};
pub use git::Git;
pub use restore::{RestoreManager, RestoreReport, RestoreStatus};

use crate::config::{AppConfig, SnapshotConfig};
use crate::error::{Result, UpshiftError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Proof that a backup was attempted, or deliberately skipped, before a
/// migration run. The rewrite engine refuses to mutate files without one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotAttempt {
    snapshot_id: Option<String>,
    skipped: bool,
}

impl SnapshotAttempt {
    /// Token for a run where the user opted out of backups.
    pub fn skipped() -> Self {
        Self {
            snapshot_id: None,
            skipped: true,
        }
    }

    fn succeeded(id: String) -> Self {
        Self {
            snapshot_id: Some(id),
            skipped: false,
        }
    }

    fn failed() -> Self {
        Self {
            snapshot_id: None,
            skipped: false,
        }
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn was_skipped(&self) -> bool {
        self.skipped
    }
}

/// Outcome of [`SnapshotManager::cleanup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    /// Catalog entries dropped.
    pub removed_snapshots: Vec<String>,
    /// Copy directories deleted, including orphans.
    pub removed_dirs: Vec<PathBuf>,
    pub retained: usize,
}

/// Creates snapshots and maintains the catalog of one project.
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    project_root: PathBuf,
}

impl SnapshotManager {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Directory holding per-snapshot file copies.
    pub fn snapshots_dir(&self) -> PathBuf {
        self.project_root
            .join(AppConfig::STATE_DIR_NAME)
            .join(SnapshotConfig::SNAPSHOTS_DIR_NAME)
    }

    /// Create a snapshot and record it in the catalog.
    ///
    /// # Arguments
    ///
    /// * `description` - Free-form label stored with the snapshot and used in
    ///   the backup commit message
    ///
    /// # Returns
    ///
    /// The new snapshot id. Fails only if neither checkpoint layer succeeded or
    /// the catalog cannot be written.
    pub async fn create_snapshot(&self, description: &str) -> Result<String> {
        let timestamp = Utc::now();
        let id = new_snapshot_id(timestamp);
        info!("Creating snapshot {}", id);

        let vcs_revision = self.git_checkpoint(&id, description).await;

        let file_copy_dir = match self.copy_critical_files(&id).await {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!("File copy for snapshot {} failed: {}", id, e);
                None
            }
        };

        if vcs_revision.is_none() && file_copy_dir.is_none() {
            return Err(UpshiftError::snapshot(format!(
                "no checkpoint could be taken for snapshot {}",
                id
            )));
        }

        let mut catalog = SnapshotCatalog::load(&self.project_root)?;
        let evicted = catalog.insert(Snapshot {
            id: id.clone(),
            timestamp,
            description: description.to_string(),
            vcs_revision,
            file_copy_dir,
        });
        catalog.save(&self.project_root)?;
        for old in &evicted {
            debug!("Snapshot {} aged out of the catalog", old.id);
            self.remove_copy_dir(old).await;
        }

        info!("Snapshot {} recorded", id);
        Ok(id)
    }

    /// Attempt a snapshot without failing the caller.
    pub async fn attempt(&self, description: &str) -> SnapshotAttempt {
        match self.create_snapshot(description).await {
            Ok(id) => SnapshotAttempt::succeeded(id),
            Err(e) => {
                warn!("Snapshot failed, continuing without a backup: {}", e);
                SnapshotAttempt::failed()
            }
        }
    }

    /// Catalog entries, newest first.
    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        Ok(SnapshotCatalog::load(&self.project_root)?.to_vec())
    }

    /// Trim the catalog to the most recent entries and delete copy
    /// directories no remaining entry references.
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let mut catalog = SnapshotCatalog::load(&self.project_root)?;
        let dropped = catalog.retain_newest(SnapshotConfig::CLEANUP_RETAIN);
        catalog.save(&self.project_root)?;

        let mut report = CleanupReport {
            removed_snapshots: dropped.iter().map(|s| s.id.clone()).collect(),
            removed_dirs: Vec::new(),
            retained: catalog.len(),
        };

        let snapshots_dir = self.snapshots_dir();
        let mut entries = match tokio::fs::read_dir(&snapshots_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(UpshiftError::io_with_path(e, &snapshots_dir)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| UpshiftError::io_with_path(e, &snapshots_dir))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if catalog.contains(&name) {
                continue;
            }
            let path = entry.path();
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => {
                    debug!("Removed snapshot copy {}", path.display());
                    report.removed_dirs.push(path);
                }
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }

        info!(
            "Cleanup kept {} snapshot(s), removed {} entr(ies) and {} director(ies)",
            report.retained,
            report.removed_snapshots.len(),
            report.removed_dirs.len()
        );
        Ok(report)
    }

    /// Delete the file copy of a snapshot that left the catalog.
    async fn remove_copy_dir(&self, snapshot: &Snapshot) {
        let Some(relative) = &snapshot.file_copy_dir else {
            return;
        };
        let path = self.project_root.join(relative);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => debug!("Removed snapshot copy {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    /// Commit pending work, then a dedicated backup commit.
    async fn git_checkpoint(&self, id: &str, description: &str) -> Option<String> {
        let git = Git::new(&self.project_root);
        if !git.is_work_tree().await {
            debug!("{} is not a git work tree, skipping git checkpoint", self.project_root.display());
            return None;
        }

        match backup_commit(&git, id, description).await {
            Ok(revision) => {
                debug!("Git checkpoint at {}", revision);
                Some(revision)
            }
            Err(e) => {
                warn!("Git checkpoint skipped: {}", e);
                None
            }
        }
    }

    /// Copy allowlisted files into the snapshot directory, keeping their
    /// relative paths. Returns the directory relative to the project root.
    async fn copy_critical_files(&self, id: &str) -> Result<PathBuf> {
        let relative_dir = PathBuf::from(AppConfig::STATE_DIR_NAME)
            .join(SnapshotConfig::SNAPSHOTS_DIR_NAME)
            .join(id);
        let target_dir = self.project_root.join(&relative_dir);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| UpshiftError::io_with_path(e, &target_dir))?;

        let mut copied = 0usize;
        for file in SnapshotConfig::CRITICAL_FILES {
            let source = self.project_root.join(file);
            if !source.is_file() {
                continue;
            }
            let destination = target_dir.join(file);
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| UpshiftError::io_with_path(e, parent))?;
            }
            tokio::fs::copy(&source, &destination)
                .await
                .map_err(|e| UpshiftError::io_with_path(e, &source))?;
            copied += 1;
        }

        debug!("Copied {} file(s) into {}", copied, relative_dir.display());
        Ok(relative_dir)
    }
}

async fn backup_commit(git: &Git, id: &str, description: &str) -> Result<String> {
    if git.has_pending_changes().await? {
        git.add_all().await?;
        git.commit(SnapshotConfig::PENDING_COMMIT_MESSAGE, false).await?;
    }
    let message = format!("{} {}: {}", SnapshotConfig::COMMIT_PREFIX, id, description);
    git.commit(&message, true).await?;
    git.head().await
}

/// `<UTC yyyymmddHHMMSS>-<8 hex chars>`.
pub fn new_snapshot_id(timestamp: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp.format("%Y%m%d%H%M%S"), &suffix[..8])
}
