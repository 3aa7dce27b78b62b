//! Host runtime detection.

use crate::config::ProcessConfig;
use async_trait::async_trait;
use semver::Version;
use tokio::process::Command;
use tracing::debug;

/// Reports the installed Node.js version.
#[async_trait]
pub trait RuntimeProbe: Send + Sync {
    /// `None` when Node.js is missing or its version cannot be read.
    async fn node_version(&self) -> Option<Version>;
}

/// Probe that runs `node --version`.
#[derive(Debug, Clone, Default)]
pub struct NodeRuntime;

#[async_trait]
impl RuntimeProbe for NodeRuntime {
    async fn node_version(&self) -> Option<Version> {
        let output = Command::new("node")
            .arg("--version")
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(ProcessConfig::SUBPROCESS_QUICK_TIMEOUT, output).await {
            Ok(Ok(output)) if output.status.success() => {
                parse_node_version(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(Ok(output)) => {
                debug!("node --version exited with {}", output.status);
                None
            }
            Ok(Err(e)) => {
                debug!("Failed to run node: {}", e);
                None
            }
            Err(_) => {
                debug!("node --version timed out");
                None
            }
        }
    }
}

/// Probe returning a fixed answer.
#[derive(Debug, Clone)]
pub struct StaticRuntime(pub Option<Version>);

#[async_trait]
impl RuntimeProbe for StaticRuntime {
    async fn node_version(&self) -> Option<Version> {
        self.0.clone()
    }
}

/// Parse `v20.11.1` style output.
pub fn parse_node_version(output: &str) -> Option<Version> {
    let trimmed = output.trim();
    Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()
}
