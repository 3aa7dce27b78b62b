//! Orchestration facade over one project root.

use crate::config::VersionConfig;
use crate::engine::RewriteEngine;
use crate::error::{Result, UpshiftError};
use crate::models::{AnalysisReport, MigrationResult, PlannedChange};
use crate::scanner::{Analyzer, RuntimeProbe};
use crate::snapshot::{
    CleanupReport, RestoreManager, RestoreReport, Snapshot, SnapshotAttempt, SnapshotManager,
};
use crate::transform::TransformRegistry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Per-run switches for [`Migrator::migrate`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    /// List planned changes without touching anything.
    pub dry_run: bool,
    /// Do not take a snapshot before rewriting.
    pub skip_backup: bool,
}

/// What a migration run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum MigrationOutcome {
    DryRun {
        planned: Vec<PlannedChange>,
    },
    Applied {
        snapshot_id: Option<String>,
        result: MigrationResult,
    },
}

/// Entry point wiring the analyzer, rewrite engine and snapshot managers
/// together around one project root.
///
/// # Example
///
/// ```rust,ignore
/// use upshift::{MigrateOptions, Migrator};
///
/// let migrator = Migrator::new("/path/to/site")?;
/// let report = migrator.analyze().await;
/// if report.is_compatible {
///     migrator.migrate(&report, MigrateOptions::default()).await?;
/// }
/// ```
pub struct Migrator {
    project_root: PathBuf,
    analyzer: Analyzer,
    engine: RewriteEngine,
    snapshots: SnapshotManager,
    restore: RestoreManager,
}

impl Migrator {
    /// Create a migrator with the built-in rules.
    pub fn new(project_root: impl Into<PathBuf>) -> Result<Self> {
        Self::with_registry(project_root, TransformRegistry::with_default_rules())
    }

    pub fn with_registry(
        project_root: impl Into<PathBuf>,
        registry: TransformRegistry,
    ) -> Result<Self> {
        let project_root = project_root.into();
        if !project_root.is_dir() {
            return Err(UpshiftError::NotADirectory(project_root));
        }

        let registry = Arc::new(registry);
        Ok(Self {
            analyzer: Analyzer::new(&project_root, Arc::clone(&registry)),
            engine: RewriteEngine::new(&project_root, registry),
            snapshots: SnapshotManager::new(&project_root),
            restore: RestoreManager::new(&project_root),
            project_root,
        })
    }

    /// Replace the Node.js probe used by [`analyze`](Self::analyze).
    pub fn with_runtime_probe(mut self, probe: impl RuntimeProbe + 'static) -> Self {
        self.analyzer = self.analyzer.with_runtime_probe(probe);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub async fn analyze(&self) -> AnalysisReport {
        self.analyzer.analyze().await
    }

    pub fn preview(&self, report: &AnalysisReport) -> Vec<PlannedChange> {
        self.engine.preview_changes(report)
    }

    /// Migrate the files listed in `report`.
    ///
    /// # Errors
    ///
    /// `Incompatible` if the report has blocking issues. Nothing is written in
    /// that case. Per-file failures are reported in the [`MigrationResult`].
    pub async fn migrate(
        &self,
        report: &AnalysisReport,
        options: MigrateOptions,
    ) -> Result<MigrationOutcome> {
        if !report.is_compatible {
            return Err(UpshiftError::Incompatible {
                blocking: report.blocking_issues().count(),
            });
        }

        if options.dry_run {
            info!("Dry run: {} file(s) would change", report.file_records.len());
            return Ok(MigrationOutcome::DryRun {
                planned: self.engine.preview_changes(report),
            });
        }

        let attempt = if options.skip_backup {
            SnapshotAttempt::skipped()
        } else {
            let description = format!(
                "Before {} {} migration",
                VersionConfig::FRAMEWORK_NAME,
                VersionConfig::TARGET_FRAMEWORK_MAJOR
            );
            self.snapshots.attempt(&description).await
        };

        let result = self.engine.migrate(report, &attempt).await;
        Ok(MigrationOutcome::Applied {
            snapshot_id: attempt.snapshot_id().map(str::to_string),
            result,
        })
    }

    pub async fn create_snapshot(&self, description: &str) -> Result<String> {
        self.snapshots.create_snapshot(description).await
    }

    pub fn list_snapshots(&self) -> Result<Vec<Snapshot>> {
        self.snapshots.list_snapshots()
    }

    pub async fn cleanup_snapshots(&self) -> Result<CleanupReport> {
        self.snapshots.cleanup().await
    }

    /// Restore `id`, or the newest snapshot when `id` is `None`.
    pub async fn restore(&self, id: Option<&str>) -> Result<RestoreReport> {
        let id = match id {
            Some(id) => id.to_string(),
            None => self
                .list_snapshots()?
                .into_iter()
                .next()
                .map(|s| s.id)
                .ok_or_else(|| UpshiftError::snapshot("no snapshots recorded"))?,
        };
        self.restore.restore_snapshot(&id).await
    }
}
