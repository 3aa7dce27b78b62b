//! Rewrite engine.
//!
//! Applies the rules named in an [`AnalysisReport`] file by file. Each file
//! runs through an ordered pipeline of immutable [`SyntaxTree`]s; the file is
//! written only when every rule succeeded and the text actually changed.

use crate::atomic::atomic_write;
use crate::error::{Result, UpshiftError};
use crate::models::{AnalysisReport, Change, ChangeKind, FileError, MigrationResult, PlannedChange};
use crate::snapshot::SnapshotAttempt;
use crate::transform::{SyntaxTree, TransformError, TransformRegistry, TransformTag};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress of one file through its pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Transforming(TransformTag),
    Transformed,
    /// Terminal. Remaining tags are not attempted.
    Failed {
        tag: TransformTag,
        error: TransformError,
    },
}

impl FileState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FileState::Transformed | FileState::Failed { .. })
    }
}

/// One rule application.
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub tag: TransformTag,
    pub input: SyntaxTree,
    pub output: SyntaxTree,
}

impl PipelineStep {
    pub fn changed(&self) -> bool {
        self.input.source() != self.output.source()
    }
}

/// Every step taken for one file, plus where it ended up.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub path: PathBuf,
    pub steps: Vec<PipelineStep>,
    pub state: FileState,
}

impl PipelineRun {
    /// Rewritten text, `None` unless the pipeline finished.
    pub fn output(&self) -> Option<&str> {
        match self.state {
            FileState::Transformed => self.steps.last().map(|step| step.output.source()),
            _ => None,
        }
    }

    pub fn changed_steps(&self) -> impl Iterator<Item = &PipelineStep> {
        self.steps.iter().filter(|step| step.changed())
    }
}

/// Applies registered rules to project files.
#[derive(Debug, Clone)]
pub struct RewriteEngine {
    project_root: PathBuf,
    registry: Arc<TransformRegistry>,
}

impl RewriteEngine {
    pub fn new(project_root: impl Into<PathBuf>, registry: Arc<TransformRegistry>) -> Self {
        Self {
            project_root: project_root.into(),
            registry,
        }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Run `tags` over `source` in registry order without touching disk.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the file, used to pick the parser dialect
    /// * `source` - Current file content
    /// * `tags` - Rules to apply; their order is ignored
    pub fn run_pipeline(&self, path: &Path, source: &str, tags: &[TransformTag]) -> PipelineRun {
        let ordered = self.registry.ordered(tags);
        let mut run = PipelineRun {
            path: path.to_path_buf(),
            steps: Vec::with_capacity(ordered.len()),
            state: FileState::Pending,
        };

        let mut current: Option<SyntaxTree> = None;
        for tag in ordered {
            run.state = FileState::Transforming(tag);
            debug!("{}: applying {}", path.display(), tag);

            let step = match current.take() {
                Some(tree) => Ok(tree),
                None => SyntaxTree::parse_file(path, source),
            }
            .and_then(|input| self.apply_rule(tag, input));

            match step {
                Ok(step) => {
                    current = Some(step.output.clone());
                    run.steps.push(step);
                }
                Err(error) => {
                    debug!("{}: {} failed: {}", path.display(), tag, error);
                    run.state = FileState::Failed { tag, error };
                    return run;
                }
            }
        }

        run.state = FileState::Transformed;
        run
    }

    fn apply_rule(
        &self,
        tag: TransformTag,
        input: SyntaxTree,
    ) -> std::result::Result<PipelineStep, TransformError> {
        // `ordered` only yields registered tags
        let Some(rule) = self.registry.get(tag) else {
            return Ok(PipelineStep {
                tag,
                output: input.clone(),
                input,
            });
        };
        let output = rule.rewrite(&input)?;
        Ok(PipelineStep { tag, input, output })
    }

    /// Changes `migrate` would make, in processing order. Pure.
    pub fn preview_changes(&self, report: &AnalysisReport) -> Vec<PlannedChange> {
        report
            .file_records
            .iter()
            .flat_map(|record| {
                self.registry
                    .ordered(&record.transform_tags)
                    .into_iter()
                    .filter_map(|tag| {
                        self.registry.get(tag).map(|rule| PlannedChange {
                            file: record.path.clone(),
                            tag,
                            description: rule.description().to_string(),
                        })
                    })
            })
            .collect()
    }

    /// Rewrite every file in the report, one at a time.
    ///
    /// Requires a [`SnapshotAttempt`] so no file is touched before a backup
    /// was at least tried. A failing file is left as it was on disk and does
    /// not stop the run.
    pub async fn migrate(&self, report: &AnalysisReport, attempt: &SnapshotAttempt) -> MigrationResult {
        match attempt.snapshot_id() {
            Some(id) => info!("Migrating {} file(s), snapshot {}", report.file_records.len(), id),
            None if attempt.was_skipped() => {
                info!("Migrating {} file(s) without a backup", report.file_records.len())
            }
            None => warn!(
                "Migrating {} file(s) after a failed snapshot",
                report.file_records.len()
            ),
        }

        let mut result = MigrationResult::default();
        for record in &report.file_records {
            match self.migrate_file(&record.path, &record.transform_tags).await {
                Ok(changes) => {
                    result.success_count += 1;
                    result.changes.extend(changes);
                }
                Err(e) => {
                    warn!("{}: {}", record.path.display(), e);
                    result.failure_count += 1;
                    result.errors.push(FileError {
                        file: record.path.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Migration finished: {} succeeded, {} failed",
            result.success_count, result.failure_count
        );
        result
    }

    /// Rewrite, write, then rename one file.
    async fn migrate_file(&self, relative: &Path, tags: &[TransformTag]) -> Result<Vec<Change>> {
        let full_path = self.project_root.join(relative);
        let original = tokio::fs::read_to_string(&full_path)
            .await
            .map_err(|e| UpshiftError::io_with_path(e, relative))?;

        let run = self.run_pipeline(relative, &original, tags);
        if let FileState::Failed { tag, error } = &run.state {
            return Err(UpshiftError::Transformation {
                tag: *tag,
                source: error.clone(),
            });
        }

        let rename = run.steps.iter().find_map(|step| {
            self.registry
                .get(step.tag)
                .and_then(|rule| rule.renamed_path(relative))
                .map(|target| (step.tag, target))
        });
        if let Some((tag, target)) = &rename {
            if self.project_root.join(target).exists() {
                return Err(UpshiftError::Transformation {
                    tag: *tag,
                    source: TransformError::TargetExists(target.clone()),
                });
            }
        }

        let mut changes: Vec<Change> = run
            .changed_steps()
            .filter_map(|step| {
                self.registry.get(step.tag).map(|rule| Change {
                    file: relative.to_path_buf(),
                    description: rule.description().to_string(),
                    kind: ChangeKind::Modified,
                })
            })
            .collect();

        match run.output() {
            Some(output) if output != original => {
                atomic_write(&full_path, output.as_bytes())?;
                debug!("Wrote {}", relative.display());
            }
            _ => debug!("{} unchanged", relative.display()),
        }

        if let Some((tag, target)) = rename {
            tokio::fs::rename(&full_path, self.project_root.join(&target))
                .await
                .map_err(|e| UpshiftError::io_with_path(e, &target))?;
            changes.push(Change {
                file: target.clone(),
                description: format!("Renamed {} to {}", relative.display(), target.display()),
                kind: ChangeKind::Renamed,
            });
        }

        Ok(changes)
    }
}
