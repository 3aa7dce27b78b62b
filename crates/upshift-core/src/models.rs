//! Shared data structures handed between the scanner, the rewrite engine and
//! the reporting layer.
//!
//! All of these serialize to camelCase JSON and are treated as immutable once
//! returned by the core.

use crate::config::ScanConfig;
use crate::transform::TransformTag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Coarse classification of a project file by its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Middleware,
    Config,
    Api,
    Component,
    Other,
}

impl FileCategory {
    /// Classify a path relative to the project root.
    pub fn classify(relative: &Path) -> Self {
        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let extension = relative
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let normalized = relative.to_string_lossy().replace('\\', "/");
        let components: Vec<&str> = normalized.split('/').collect();

        if stem.starts_with("next.config") {
            return FileCategory::Config;
        }
        let at_entry_level = components.len() == 1
            || (components.len() == 2 && components[0] == "src");
        if at_entry_level && (stem == "middleware" || stem == "proxy") {
            return FileCategory::Middleware;
        }
        if components.windows(2).any(|w| w == ["app", "api"] || w == ["pages", "api"])
            || stem == "route"
        {
            return FileCategory::Api;
        }
        if components.contains(&"components") || extension == "tsx" || extension == "jsx" {
            return FileCategory::Component;
        }
        FileCategory::Other
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Middleware => "middleware",
            FileCategory::Config => "config",
            FileCategory::Api => "api",
            FileCategory::Component => "component",
            FileCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A file that at least one transform applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Path relative to the project root.
    pub path: PathBuf,
    pub category: FileCategory,
    /// Applicable tags, in registry order.
    pub transform_tags: Vec<TransformTag>,
}

/// What area an issue concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    Configuration,
    FrameworkVersion,
    Dependency,
    RemovedFeature,
    Runtime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Forces `is_compatible = false`.
    Blocking,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub message: String,
}

impl Issue {
    pub fn blocking(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Blocking,
            message: message.into(),
        }
    }

    pub fn warning(kind: IssueKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Rough size of the upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
}

impl ComplexityTier {
    /// Tier from the number of files to migrate and issues found.
    pub fn from_counts(files: usize, issues: usize) -> Self {
        if files > ScanConfig::HIGH_FILE_THRESHOLD || issues > ScanConfig::HIGH_ISSUE_THRESHOLD {
            ComplexityTier::High
        } else if files > ScanConfig::MEDIUM_FILE_THRESHOLD
            || issues > ScanConfig::MEDIUM_ISSUE_THRESHOLD
        {
            ComplexityTier::Medium
        } else {
            ComplexityTier::Low
        }
    }

    pub fn estimated_time(&self) -> &'static str {
        match self {
            ComplexityTier::Low => "15-30 minutes",
            ComplexityTier::Medium => "1-2 hours",
            ComplexityTier::High => "4-8 hours",
        }
    }
}

impl std::fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ComplexityTier::Low => "low",
            ComplexityTier::Medium => "medium",
            ComplexityTier::High => "high",
        };
        write!(f, "{}", name)
    }
}

/// Result of scanning a project. Derived, never edited by hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub is_compatible: bool,
    /// Normalized framework version declared in the manifest.
    pub current_version: Option<String>,
    pub file_records: Vec<FileRecord>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<String>,
    pub complexity_tier: ComplexityTier,
    pub estimated_time: String,
}

impl AnalysisReport {
    /// Blocking issues that close the compatibility gate.
    pub fn blocking_issues(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_blocking())
    }

    pub fn total_transforms(&self) -> usize {
        self.file_records
            .iter()
            .map(|record| record.transform_tags.len())
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Modified,
    Renamed,
}

/// One entry of the migration change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub file: PathBuf,
    pub description: String,
    pub kind: ChangeKind,
}

/// A file that failed to migrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileError {
    pub file: PathBuf,
    pub message: String,
}

/// Accounting for one migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub changes: Vec<Change>,
    pub errors: Vec<FileError>,
}

impl MigrationResult {
    pub fn is_clean(&self) -> bool {
        self.failure_count == 0
    }
}

/// A change `migrate` would make, as listed by a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub file: PathBuf,
    pub tag: TransformTag,
    pub description: String,
}
