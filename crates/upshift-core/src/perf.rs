//! Build time and bundle size measurement.

use crate::config::ProcessConfig;
use crate::error::{Result, UpshiftError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Command that produces a production build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for BuildCommand {
    fn default() -> Self {
        Self::new("npm", ["run", "build"])
    }
}

impl BuildCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Result of one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetrics {
    pub success: bool,
    pub timed_out: bool,
    pub duration_ms: u64,
    /// Total bytes under `.next/static` after the build.
    pub bundle_bytes: u64,
}

impl BuildMetrics {
    /// Metrics for a build killed at the timeout.
    pub fn after_timeout() -> Self {
        Self {
            timed_out: true,
            ..Self::default()
        }
    }

    /// Signed change from `before` to `self`.
    pub fn delta(&self, before: &BuildMetrics) -> BuildDelta {
        BuildDelta {
            duration_ms: self.duration_ms as i64 - before.duration_ms as i64,
            bundle_bytes: self.bundle_bytes as i64 - before.bundle_bytes as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDelta {
    pub duration_ms: i64,
    pub bundle_bytes: i64,
}

/// Run the build and measure it.
///
/// A timeout or a failing build is reported through the metrics; only a
/// command that cannot be started is an error.
pub async fn measure_build(
    project_root: &Path,
    command: &BuildCommand,
    timeout: Duration,
) -> Result<BuildMetrics> {
    info!("Running `{}` (timeout {:?})", command, timeout);
    let started = Instant::now();

    let child = Command::new(&command.program)
        .args(&command.args)
        .current_dir(project_root)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| UpshiftError::Command {
            command: command.to_string(),
            message: e.to_string(),
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|e| UpshiftError::Command {
            command: command.to_string(),
            message: e.to_string(),
        })?,
        Err(_) => {
            warn!("`{}` timed out after {:?}", command, timeout);
            return Ok(BuildMetrics::after_timeout());
        }
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!("`{}` exited with {}", command, output.status);
        debug!("Build stderr: {}", stderr.trim());
        return Ok(BuildMetrics {
            success: false,
            timed_out: false,
            duration_ms,
            bundle_bytes: 0,
        });
    }

    let bundle_bytes = bundle_size(project_root);
    info!("Build finished in {} ms, bundle {} bytes", duration_ms, bundle_bytes);
    Ok(BuildMetrics {
        success: true,
        timed_out: false,
        duration_ms,
        bundle_bytes,
    })
}

/// Measure with the default command and timeout.
pub async fn measure_default_build(project_root: &Path) -> Result<BuildMetrics> {
    measure_build(project_root, &BuildCommand::default(), ProcessConfig::BUILD_TIMEOUT).await
}

/// Byte total of the static build output.
pub fn bundle_size(project_root: &Path) -> u64 {
    WalkDir::new(project_root.join(ProcessConfig::BUILD_OUTPUT_DIR))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_bundle_size() {
        let temp_dir = TempDir::new().unwrap();
        let chunks = temp_dir.path().join(".next/static/chunks");
        fs::create_dir_all(&chunks).unwrap();
        fs::write(chunks.join("main.js"), vec![0u8; 1200]).unwrap();
        fs::write(chunks.join("app.js"), vec![0u8; 300]).unwrap();
        fs::write(temp_dir.path().join(".next/trace"), vec![0u8; 999]).unwrap();

        assert_eq!(bundle_size(temp_dir.path()), 1500);
    }

    #[test]
    fn test_bundle_size_without_build() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(bundle_size(temp_dir.path()), 0);
    }

    #[test]
    fn test_delta() {
        let before = BuildMetrics {
            success: true,
            timed_out: false,
            duration_ms: 9000,
            bundle_bytes: 500,
        };
        let after = BuildMetrics {
            duration_ms: 7000,
            bundle_bytes: 650,
            ..before
        };
        assert_eq!(
            after.delta(&before),
            BuildDelta {
                duration_ms: -2000,
                bundle_bytes: 150
            }
        );
    }

    #[test]
    fn test_default_command() {
        assert_eq!(BuildCommand::default().to_string(), "npm run build");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_reports_degraded_metrics() {
        let temp_dir = TempDir::new().unwrap();
        let command = BuildCommand::new("sleep", ["5"]);

        let metrics = measure_build(temp_dir.path(), &command, Duration::from_millis(100))
            .await
            .unwrap();
        assert_eq!(metrics, BuildMetrics::after_timeout());
        assert!(!metrics.success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_build() {
        let temp_dir = TempDir::new().unwrap();
        let metrics = measure_build(
            temp_dir.path(),
            &BuildCommand::new("false", Vec::<String>::new()),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert!(!metrics.success);
        assert!(!metrics.timed_out);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let command = BuildCommand::new("upshift-no-such-build-tool", ["build"]);
        let err = measure_build(temp_dir.path(), &command, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, UpshiftError::Command { .. }));
    }
}
