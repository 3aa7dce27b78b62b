//! `package.json` loading and version extraction.

use crate::config::ScanConfig;
use crate::error::{Result, UpshiftError};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// The subset of `package.json` the analyzer reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageManifest {
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, String>,
}

impl PackageManifest {
    /// Read and parse `package.json` from the project root.
    pub async fn load(project_root: &Path) -> Result<Self> {
        let path = project_root.join(ScanConfig::MANIFEST_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(UpshiftError::config(format!(
                    "No {} found in {}",
                    ScanConfig::MANIFEST_FILE,
                    project_root.display()
                )));
            }
            Err(e) => {
                return Err(UpshiftError::config(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| {
            UpshiftError::config(format!(
                "{} is not valid: {}",
                ScanConfig::MANIFEST_FILE,
                e
            ))
        })
    }

    /// Declared version range of a package, runtime dependencies first.
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies
            .get(name)
            .or_else(|| self.dev_dependencies.get(name))
            .map(String::as_str)
    }

    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependency(name).is_some()
    }
}

/// First `major[.minor[.patch]]` run in a version range such as `^15.2.0`.
static VERSION_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").unwrap());

/// Normalize a declared version range to a concrete version.
///
/// Missing components default to zero and pre-release suffixes are dropped.
/// Returns `None` for dist-tags like `latest` or `canary`.
pub fn parse_version_spec(spec: &str) -> Option<Version> {
    let caps = VERSION_RUN.captures(spec)?;
    let part = |index: usize| -> Option<u64> {
        match caps.get(index) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_version_spec() {
        assert_eq!(parse_version_spec("^15.2.3"), Some(Version::new(15, 2, 3)));
        assert_eq!(parse_version_spec("~14.1"), Some(Version::new(14, 1, 0)));
        assert_eq!(parse_version_spec(">=15"), Some(Version::new(15, 0, 0)));
        assert_eq!(
            parse_version_spec("15.0.0-canary.12"),
            Some(Version::new(15, 0, 0))
        );
        assert_eq!(parse_version_spec("latest"), None);
    }

    #[test]
    fn test_dependency_lookup_prefers_runtime() {
        let manifest = PackageManifest::parse(
            r#"{
                "dependencies": { "next": "15.1.0" },
                "devDependencies": { "next": "14.0.0", "typescript": "5.6.0" }
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.dependency("next"), Some("15.1.0"));
        assert_eq!(manifest.dependency("typescript"), Some("5.6.0"));
        assert!(!manifest.has_dependency("react"));
    }

    #[tokio::test]
    async fn test_load_missing_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let err = PackageManifest::load(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, UpshiftError::Configuration { .. }));
        assert!(err.to_string().contains("No package.json found"));
    }

    #[tokio::test]
    async fn test_load_invalid_manifest() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("package.json"), "{ not json").unwrap();
        let err = PackageManifest::load(temp_dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("package.json is not valid"));
    }
}
