//! Project analysis.
//!
//! The analyzer reads the manifest, probes the host runtime and runs every
//! registered detection predicate over the candidate files. The resulting
//! [`AnalysisReport`] gates migration: any blocking issue closes it.

mod candidates;
mod features;
mod manifest;
mod runtime;

pub use candidates::discover;
pub use features::{find_removed_features, RemovedFeature};
pub use manifest::{parse_version_spec, PackageManifest};
pub use runtime::{parse_node_version, NodeRuntime, RuntimeProbe, StaticRuntime};

use crate::config::VersionConfig;
use crate::models::{AnalysisReport, ComplexityTier, FileCategory, FileRecord, Issue, IssueKind};
use crate::transform::TransformRegistry;
use semver::Version;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Issues and recommendations collected while scanning.
#[derive(Debug, Default)]
struct Findings {
    issues: Vec<Issue>,
    recommendations: Vec<String>,
}

impl Findings {
    fn blocking(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.issues.push(Issue::blocking(kind, message));
    }

    fn warning(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.issues.push(Issue::warning(kind, message));
    }

    fn recommend(&mut self, recommendation: impl Into<String>) {
        let recommendation = recommendation.into();
        if !self.recommendations.contains(&recommendation) {
            self.recommendations.push(recommendation);
        }
    }
}

/// Scans one project tree and produces an [`AnalysisReport`].
pub struct Analyzer {
    project_root: PathBuf,
    registry: Arc<TransformRegistry>,
    runtime: Box<dyn RuntimeProbe>,
}

impl Analyzer {
    /// Create an analyzer that probes the real `node` binary.
    pub fn new(project_root: impl Into<PathBuf>, registry: Arc<TransformRegistry>) -> Self {
        Self {
            project_root: project_root.into(),
            registry,
            runtime: Box::new(NodeRuntime),
        }
    }

    /// Replace the runtime probe.
    pub fn with_runtime_probe(mut self, probe: impl RuntimeProbe + 'static) -> Self {
        self.runtime = Box::new(probe);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Analyze the project.
    ///
    /// Never fails: manifest and runtime problems become blocking issues and
    /// unreadable files are skipped.
    pub async fn analyze(&self) -> AnalysisReport {
        info!("Analyzing project at {}", self.project_root.display());
        let mut findings = Findings::default();

        let current_version = match PackageManifest::load(&self.project_root).await {
            Ok(manifest) => {
                let version = self.check_framework_version(&manifest, &mut findings);
                self.check_dependencies(&manifest, &mut findings);
                version
            }
            Err(e) => {
                findings.blocking(IssueKind::Configuration, e.to_string());
                None
            }
        };

        let file_records = self.scan_files(&mut findings).await;
        self.check_runtime(&mut findings).await;

        let complexity_tier = ComplexityTier::from_counts(file_records.len(), findings.issues.len());
        let is_compatible = !findings.issues.iter().any(Issue::is_blocking);

        info!(
            "Analysis complete: {} file(s) to migrate, {} issue(s), complexity {}",
            file_records.len(),
            findings.issues.len(),
            complexity_tier
        );

        AnalysisReport {
            is_compatible,
            current_version: current_version.map(|v| v.to_string()),
            file_records,
            issues: findings.issues,
            recommendations: findings.recommendations,
            complexity_tier,
            estimated_time: complexity_tier.estimated_time().to_string(),
        }
    }

    fn check_framework_version(
        &self,
        manifest: &PackageManifest,
        findings: &mut Findings,
    ) -> Option<Version> {
        let Some(declared) = manifest.dependency(VersionConfig::FRAMEWORK_PACKAGE) else {
            findings.blocking(
                IssueKind::FrameworkVersion,
                format!(
                    "{} is not listed in dependencies or devDependencies",
                    VersionConfig::FRAMEWORK_NAME
                ),
            );
            return None;
        };

        let Some(version) = parse_version_spec(declared) else {
            findings.warning(
                IssueKind::FrameworkVersion,
                format!(
                    "Could not determine the {} version from \"{}\"",
                    VersionConfig::FRAMEWORK_NAME,
                    declared
                ),
            );
            findings.recommend(format!(
                "Pin {} to an explicit {}.x version before migrating",
                VersionConfig::FRAMEWORK_PACKAGE,
                VersionConfig::MIN_FRAMEWORK_MAJOR
            ));
            return None;
        };

        debug!("Declared {} version {} ({})", VersionConfig::FRAMEWORK_NAME, version, declared);

        if version.major < VersionConfig::MIN_FRAMEWORK_MAJOR {
            findings.blocking(
                IssueKind::FrameworkVersion,
                format!(
                    "{} {} is too old; upgrade to {}.x before migrating to {}",
                    VersionConfig::FRAMEWORK_NAME,
                    declared,
                    VersionConfig::MIN_FRAMEWORK_MAJOR,
                    VersionConfig::TARGET_FRAMEWORK_MAJOR
                ),
            );
        } else if version.major >= VersionConfig::TARGET_FRAMEWORK_MAJOR {
            findings.recommend(format!(
                "Project already targets {} {}; remaining rewrites only clean up deprecated APIs",
                VersionConfig::FRAMEWORK_NAME,
                version.major
            ));
        }

        Some(version)
    }

    fn check_dependencies(&self, manifest: &PackageManifest, findings: &mut Findings) {
        for (package, recommendation) in VersionConfig::INCOMPATIBLE_DEPENDENCIES {
            if manifest.has_dependency(package) {
                findings.warning(
                    IssueKind::Dependency,
                    format!(
                        "{} is not compatible with {} {}",
                        package,
                        VersionConfig::FRAMEWORK_NAME,
                        VersionConfig::TARGET_FRAMEWORK_MAJOR
                    ),
                );
                findings.recommend(*recommendation);
            }
        }
    }

    async fn scan_files(&self, findings: &mut Findings) -> Vec<FileRecord> {
        let mut records = Vec::new();
        let mut removed: BTreeMap<RemovedFeature, Vec<PathBuf>> = BTreeMap::new();

        for relative in discover(&self.project_root) {
            let full_path = self.project_root.join(&relative);
            let text = match tokio::fs::read_to_string(&full_path).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", full_path.display(), e);
                    continue;
                }
            };

            let category = FileCategory::classify(&relative);
            for feature in find_removed_features(category, &text) {
                removed.entry(feature).or_default().push(relative.clone());
            }

            let transform_tags = self.registry.detect(&relative, &text);
            if transform_tags.is_empty() {
                continue;
            }

            debug!("{} ({}): {:?}", relative.display(), category, transform_tags);
            records.push(FileRecord {
                path: relative,
                category,
                transform_tags,
            });
        }

        for (feature, files) in removed {
            let listed: Vec<String> = files.iter().map(|p| p.display().to_string()).collect();
            findings.blocking(
                IssueKind::RemovedFeature,
                format!(
                    "{} was removed in {} {} (used in {})",
                    feature.label(),
                    VersionConfig::FRAMEWORK_NAME,
                    VersionConfig::TARGET_FRAMEWORK_MAJOR,
                    listed.join(", ")
                ),
            );
            findings.recommend(feature.recommendation());
        }

        records
    }

    async fn check_runtime(&self, findings: &mut Findings) {
        let (major, minor, patch) = VersionConfig::MIN_NODE_VERSION;
        let minimum = Version::new(major, minor, patch);

        match self.runtime.node_version().await {
            Some(version) if version >= minimum => {
                debug!("Node.js {} satisfies >= {}", version, minimum);
            }
            Some(version) => findings.blocking(
                IssueKind::Runtime,
                format!(
                    "Node.js {} is installed but {} {} requires {} or newer",
                    version,
                    VersionConfig::FRAMEWORK_NAME,
                    VersionConfig::TARGET_FRAMEWORK_MAJOR,
                    minimum
                ),
            ),
            None => findings.blocking(
                IssueKind::Runtime,
                format!("Node.js was not found; {} or newer is required", minimum),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::transform::TransformTag;
    use std::fs;
    use tempfile::TempDir;

    fn project(manifest: &str) -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("package.json"), manifest).unwrap();
        temp_dir
    }

    fn analyzer(root: &Path) -> Analyzer {
        Analyzer::new(root, Arc::new(TransformRegistry::with_default_rules()))
            .with_runtime_probe(StaticRuntime(Some(Version::new(22, 11, 0))))
    }

    #[tokio::test]
    async fn test_compatible_project() {
        let temp_dir = project(r#"{ "dependencies": { "next": "^15.3.1" } }"#);
        fs::create_dir_all(temp_dir.path().join("app")).unwrap();
        fs::write(
            temp_dir.path().join("app/layout.tsx"),
            "export default function Layout({ children }) { return children; }\n",
        )
        .unwrap();

        let report = analyzer(temp_dir.path()).analyze().await;
        assert!(report.is_compatible);
        assert_eq!(report.current_version.as_deref(), Some("15.3.1"));
        assert!(report.issues.is_empty());
        assert!(report.file_records.is_empty());
        assert_eq!(report.complexity_tier, ComplexityTier::Low);
        assert_eq!(report.estimated_time, "15-30 minutes");
    }

    #[tokio::test]
    async fn test_missing_manifest_is_blocking() {
        let temp_dir = TempDir::new().unwrap();
        let report = analyzer(temp_dir.path()).analyze().await;

        assert!(!report.is_compatible);
        assert_eq!(report.issues[0].kind, IssueKind::Configuration);
        assert!(report.issues[0].message.contains("No package.json found"));
    }

    #[tokio::test]
    async fn test_missing_framework_dependency() {
        let temp_dir = project(r#"{ "dependencies": { "react": "19.0.0" } }"#);
        let report = analyzer(temp_dir.path()).analyze().await;

        assert!(!report.is_compatible);
        assert_eq!(report.issues[0].kind, IssueKind::FrameworkVersion);
    }

    #[tokio::test]
    async fn test_dist_tag_is_warning() {
        let temp_dir = project(r#"{ "dependencies": { "next": "latest" } }"#);
        let report = analyzer(temp_dir.path()).analyze().await;

        assert!(report.is_compatible);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Warning);
        assert_eq!(report.current_version, None);
        assert!(!report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_already_on_target_major() {
        let temp_dir = project(r#"{ "dependencies": { "next": "16.0.1" } }"#);
        let report = analyzer(temp_dir.path()).analyze().await;

        assert!(report.is_compatible);
        assert!(report.recommendations[0].contains("already targets"));
    }

    #[tokio::test]
    async fn test_incompatible_dependency_warning() {
        let temp_dir = project(
            r#"{ "dependencies": { "next": "15.0.0", "next-pwa": "5.6.0" } }"#,
        );
        let report = analyzer(temp_dir.path()).analyze().await;

        assert!(report.is_compatible);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].kind, IssueKind::Dependency);
        assert!(report.recommendations.iter().any(|r| r.contains("@serwist/next")));
    }

    #[tokio::test]
    async fn test_removed_feature_blocks() {
        let temp_dir = project(r#"{ "dependencies": { "next": "15.0.0" } }"#);
        fs::write(
            temp_dir.path().join("next.config.js"),
            "module.exports = { experimental: { ppr: true } };\n",
        )
        .unwrap();

        let report = analyzer(temp_dir.path()).analyze().await;
        assert!(!report.is_compatible);
        let issue = report.blocking_issues().next().unwrap();
        assert_eq!(issue.kind, IssueKind::RemovedFeature);
        assert!(issue.message.contains("next.config.js"));
    }

    #[tokio::test]
    async fn test_old_or_missing_node_blocks() {
        let temp_dir = project(r#"{ "dependencies": { "next": "15.0.0" } }"#);

        let old = analyzer(temp_dir.path())
            .with_runtime_probe(StaticRuntime(Some(Version::new(18, 20, 4))))
            .analyze()
            .await;
        assert!(!old.is_compatible);
        assert_eq!(old.issues[0].kind, IssueKind::Runtime);
        assert!(old.issues[0].message.contains("18.20.4"));

        let missing = analyzer(temp_dir.path())
            .with_runtime_probe(StaticRuntime(None))
            .analyze()
            .await;
        assert!(!missing.is_compatible);
    }

    #[tokio::test]
    async fn test_records_tags_in_registry_order() {
        let temp_dir = project(r#"{ "dependencies": { "next": "15.0.0" } }"#);
        fs::create_dir_all(temp_dir.path().join("app/actions")).unwrap();
        fs::write(
            temp_dir.path().join("app/actions/publish.ts"),
            "import { revalidateTag, unstable_cacheTag } from 'next/cache';\n\
             export async function publish() { unstable_cacheTag('x'); revalidateTag('posts'); }\n",
        )
        .unwrap();

        let report = analyzer(temp_dir.path()).analyze().await;
        assert_eq!(report.file_records.len(), 1);
        assert_eq!(
            report.file_records[0].transform_tags,
            vec![TransformTag::StableCacheApis, TransformTag::RevalidateTagProfile]
        );
    }
}
