//! Upshift CLI - upgrade a Next.js project to the next major version.
//!
//! Thin front end over the `upshift` library: every command builds a
//! [`Migrator`] for the project root and renders what it returns.

mod output;
mod prompt;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use upshift::perf::measure_default_build;
use upshift::{
    BuildMetrics, MigrateOptions, MigrationOutcome, Migrator, RestoreStatus, UpshiftError,
};

#[derive(Parser, Debug)]
#[command(name = "upshift")]
#[command(version, about = "Upgrade a Next.js 15 project to Next.js 16")]
struct Cli {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report what needs to change and whether the upgrade can proceed
    Analyze {
        /// Measure build time and bundle size
        #[arg(long)]
        performance: bool,

        /// List every file and the rewrites it needs
        #[arg(long)]
        detailed: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rewrite the project
    Migrate {
        /// Show planned changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Skip the snapshot taken before rewriting
        #[arg(long)]
        no_backup: bool,

        /// Measure the build before and after migrating
        #[arg(long)]
        performance: bool,

        /// Non-interactive; print the result as JSON
        #[arg(long)]
        batch: bool,
    },

    /// Restore a snapshot (the newest one by default)
    Rollback {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Snapshot to restore
        #[arg(long)]
        id: Option<String>,
    },

    /// List recorded snapshots
    Snapshots,

    /// Drop old snapshots and their file copies
    Cleanup,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();
}

/// Execute one command. `Ok(false)` means a failure was reported to the user.
async fn run(cli: Cli) -> Result<bool> {
    let root = match cli.root {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let migrator = Migrator::new(&root)?;
    info!("Project root: {}", root.display());

    match cli.command {
        Command::Analyze {
            performance,
            detailed,
            json,
        } => analyze(&migrator, performance, detailed, json).await,
        Command::Migrate {
            dry_run,
            yes,
            no_backup,
            performance,
            batch,
        } => {
            let options = MigrateOptions {
                dry_run,
                skip_backup: no_backup,
            };
            migrate(&migrator, options, yes || batch, performance, batch).await
        }
        Command::Rollback { yes, id } => rollback(&migrator, yes, id.as_deref()).await,
        Command::Snapshots => {
            output::print_snapshots(&migrator.list_snapshots()?);
            Ok(true)
        }
        Command::Cleanup => {
            output::print_cleanup(&migrator.cleanup_snapshots().await?);
            Ok(true)
        }
    }
}

async fn analyze(
    migrator: &Migrator,
    performance: bool,
    detailed: bool,
    json: bool,
) -> Result<bool> {
    let report = migrator.analyze().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        output::print_report(&report, detailed);
    }

    if performance {
        let metrics = measure(migrator).await?;
        output::print_metrics("Current build", &metrics);
    }

    Ok(report.is_compatible)
}

async fn migrate(
    migrator: &Migrator,
    options: MigrateOptions,
    assume_yes: bool,
    performance: bool,
    batch: bool,
) -> Result<bool> {
    let report = migrator.analyze().await;

    if !report.is_compatible {
        if batch {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            output::print_report(&report, false);
            println!("Migration aborted: resolve the blocking issues above first.");
        }
        return Ok(false);
    }

    if report.file_records.is_empty() {
        if batch {
            println!("{}", serde_json::to_string_pretty(&upshift::MigrationResult::default())?);
        } else {
            println!("Nothing to migrate.");
        }
        return Ok(true);
    }

    if !batch {
        output::print_report(&report, options.dry_run);
    }

    if !options.dry_run && !assume_yes {
        let question = format!("Migrate {} file(s)?", report.file_records.len());
        if !prompt::confirm(&question)? {
            println!("Migration cancelled.");
            return Ok(true);
        }
    }

    let before = if performance && !options.dry_run {
        Some(measure(migrator).await?)
    } else {
        None
    };

    let outcome = match migrator.migrate(&report, options).await {
        Ok(outcome) => outcome,
        Err(UpshiftError::Incompatible { blocking }) => {
            warn!("{} blocking issue(s) appeared after analysis", blocking);
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    match outcome {
        MigrationOutcome::DryRun { planned } => {
            if batch {
                println!("{}", serde_json::to_string_pretty(&planned)?);
            } else {
                output::print_planned(&planned);
            }
            Ok(true)
        }
        MigrationOutcome::Applied {
            snapshot_id,
            result,
        } => {
            if batch {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                output::print_result(&result, snapshot_id.as_deref(), options.skip_backup);
            }

            if let Some(before) = before {
                let after = measure(migrator).await?;
                if !batch {
                    output::print_metrics("Before", &before);
                    output::print_metrics("After", &after);
                    output::print_delta(&after.delta(&before));
                }
            }

            Ok(result.is_clean())
        }
    }
}

async fn rollback(migrator: &Migrator, assume_yes: bool, id: Option<&str>) -> Result<bool> {
    let snapshots = migrator.list_snapshots()?;
    let target = match id {
        Some(id) => snapshots.iter().find(|s| s.id == id),
        None => snapshots.first(),
    };

    let Some(target) = target else {
        match id {
            Some(id) => println!(
                "Snapshot {} not found. Run `upshift snapshots` to list them.",
                id
            ),
            None => println!("No snapshots recorded."),
        }
        return Ok(false);
    };

    if !assume_yes {
        let question = format!(
            "Restore snapshot {} ({}) from {}?",
            target.id,
            target.description,
            target.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !prompt::confirm(&question)? {
            println!("Rollback cancelled.");
            return Ok(true);
        }
    }

    let report = migrator.restore(Some(&target.id)).await?;
    output::print_restore(&report);
    Ok(report.status() == RestoreStatus::Full)
}

async fn measure(migrator: &Migrator) -> Result<BuildMetrics> {
    measure_default_build(migrator.project_root())
        .await
        .context("Failed to run the build")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_migrate_flags() {
        let cli = Cli::try_parse_from([
            "upshift", "--root", "/srv/site", "migrate", "--dry-run", "--no-backup", "--batch",
        ])
        .unwrap();

        assert_eq!(cli.root, Some(PathBuf::from("/srv/site")));
        match cli.command {
            Command::Migrate {
                dry_run,
                yes,
                no_backup,
                performance,
                batch,
            } => {
                assert!(dry_run && no_backup && batch);
                assert!(!yes && !performance);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["upshift", "rollback", "--id", "abc", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Rollback { yes: false, id: Some(ref id) } if id == "abc"
        ));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["upshift", "upgrade"]).is_err());
    }

    #[tokio::test]
    async fn test_rollback_without_snapshots_fails() {
        let temp_dir = TempDir::new().unwrap();
        let cli = Cli::try_parse_from([
            "upshift",
            "--root",
            temp_dir.path().to_str().unwrap(),
            "rollback",
            "--yes",
        ])
        .unwrap();

        assert!(!run(cli).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let cli =
            Cli::try_parse_from(["upshift", "--root", missing.to_str().unwrap(), "snapshots"])
                .unwrap();

        assert!(run(cli).await.is_err());
    }
}
