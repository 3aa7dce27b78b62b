//! Thin async wrapper over the `git` binary.

use crate::config::{AppConfig, ProcessConfig, SnapshotConfig};
use crate::error::{Result, UpshiftError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Git commands run inside one work tree.
#[derive(Debug, Clone)]
pub struct Git {
    work_dir: PathBuf,
}

impl Git {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Whether `git` is installed and the directory is inside a work tree.
    pub async fn is_work_tree(&self) -> bool {
        match self
            .run(&["rev-parse", "--is-inside-work-tree"], ProcessConfig::SUBPROCESS_QUICK_TIMEOUT)
            .await
        {
            Ok(output) => output == "true",
            Err(e) => {
                debug!("Not a git work tree: {}", e);
                false
            }
        }
    }

    /// Whether anything outside the state directory is modified or untracked.
    pub async fn has_pending_changes(&self) -> Result<bool> {
        let exclude = state_dir_exclusion();
        let output = self
            .run(
                &["status", "--porcelain", "--", ".", &exclude],
                ProcessConfig::SUBPROCESS_STANDARD_TIMEOUT,
            )
            .await?;
        Ok(!output.is_empty())
    }

    /// Stage every change except the state directory.
    pub async fn add_all(&self) -> Result<()> {
        let exclude = state_dir_exclusion();
        self.run(
            &["add", "-A", "--", ".", &exclude],
            ProcessConfig::SUBPROCESS_STANDARD_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    /// Commit the index, supplying a fallback identity when none is configured.
    pub async fn commit(&self, message: &str, allow_empty: bool) -> Result<()> {
        let mut args: Vec<String> = Vec::new();
        if !self.has_identity().await {
            debug!("No git identity configured, using fallback committer");
            args.extend([
                "-c".to_string(),
                format!("user.name={}", SnapshotConfig::FALLBACK_GIT_NAME),
                "-c".to_string(),
                format!("user.email={}", SnapshotConfig::FALLBACK_GIT_EMAIL),
            ]);
        }
        args.extend(["commit".to_string(), "--no-verify".to_string()]);
        if allow_empty {
            args.push("--allow-empty".to_string());
        }
        args.extend(["-m".to_string(), message.to_string()]);

        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args, ProcessConfig::SUBPROCESS_STANDARD_TIMEOUT)
            .await
            .map(|_| ())
    }

    /// Full SHA of `HEAD`.
    pub async fn head(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"], ProcessConfig::SUBPROCESS_QUICK_TIMEOUT)
            .await
    }

    pub async fn reset_hard(&self, revision: &str) -> Result<()> {
        self.run(
            &["reset", "--hard", revision],
            ProcessConfig::SUBPROCESS_STANDARD_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn has_identity(&self) -> bool {
        self.run(&["config", "user.email"], ProcessConfig::SUBPROCESS_QUICK_TIMEOUT)
            .await
            .is_ok_and(|email| !email.is_empty())
    }

    /// Run git and return trimmed stdout.
    async fn run(&self, args: &[&str], timeout: Duration) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| UpshiftError::Timeout(timeout))?
            .map_err(|e| UpshiftError::Command {
                command: command.clone(),
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("{} failed: {}", command, stderr);
            return Err(UpshiftError::Command {
                command,
                message: if stderr.is_empty() {
                    output.status.to_string()
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn state_dir_exclusion() -> String {
    format!(":(exclude){}", AppConfig::STATE_DIR_NAME)
}
