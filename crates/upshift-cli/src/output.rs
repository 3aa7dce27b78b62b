//! Plain-text rendering of core results.

use upshift::snapshot::CleanupReport;
use upshift::{
    AnalysisReport, BuildDelta, BuildMetrics, ChangeKind, MigrationResult, PlannedChange,
    RestoreReport, RestoreStatus, Severity, Snapshot,
};

pub fn print_report(report: &AnalysisReport, detailed: bool) {
    println!("Upgrade analysis");
    println!(
        "  Current version: {}",
        report.current_version.as_deref().unwrap_or("unknown")
    );
    println!(
        "  Compatible:      {}",
        if report.is_compatible { "yes" } else { "no" }
    );
    println!("  Files to change: {}", report.file_records.len());
    println!("  Rewrites:        {}", report.total_transforms());
    println!(
        "  Complexity:      {} (about {})",
        report.complexity_tier, report.estimated_time
    );

    if !report.issues.is_empty() {
        println!();
        println!("Issues:");
        for issue in &report.issues {
            let marker = match issue.severity {
                Severity::Blocking => "BLOCKING",
                Severity::Warning => "warning",
            };
            println!("  [{}] {}", marker, issue.message);
        }
    }

    if !report.recommendations.is_empty() {
        println!();
        println!("Recommendations:");
        for recommendation in &report.recommendations {
            println!("  - {}", recommendation);
        }
    }

    if detailed && !report.file_records.is_empty() {
        println!();
        println!("Files:");
        for record in &report.file_records {
            let tags: Vec<&str> = record.transform_tags.iter().map(|t| t.as_str()).collect();
            println!(
                "  {} ({}): {}",
                record.path.display(),
                record.category,
                tags.join(", ")
            );
        }
    }
}

pub fn print_planned(planned: &[PlannedChange]) {
    println!();
    println!("Dry run, {} planned change(s):", planned.len());
    for change in planned {
        println!("  {} [{}] {}", change.file.display(), change.tag, change.description);
    }
}

pub fn print_result(result: &MigrationResult, snapshot_id: Option<&str>, skipped_backup: bool) {
    println!();
    match snapshot_id {
        Some(id) => println!("Snapshot: {} (undo with `upshift rollback --id {}`)", id, id),
        None if skipped_backup => println!("Snapshot: skipped"),
        None => println!("Snapshot: failed, see log output"),
    }

    println!(
        "Migrated {} file(s), {} failed",
        result.success_count, result.failure_count
    );
    for change in &result.changes {
        let marker = match change.kind {
            ChangeKind::Modified => "M",
            ChangeKind::Renamed => "R",
        };
        println!("  {} {}: {}", marker, change.file.display(), change.description);
    }

    if !result.errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &result.errors {
            println!("  {}: {}", error.file.display(), error.message);
        }
    }
}

pub fn print_snapshots(snapshots: &[Snapshot]) {
    if snapshots.is_empty() {
        println!("No snapshots recorded.");
        return;
    }
    for snapshot in snapshots {
        let layers = match (&snapshot.vcs_revision, &snapshot.file_copy_dir) {
            (Some(_), Some(_)) => "git+files",
            (Some(_), None) => "git",
            (None, Some(_)) => "files",
            (None, None) => "none",
        };
        println!(
            "{}  {}  [{}]  {}",
            snapshot.id,
            snapshot.timestamp.format("%Y-%m-%d %H:%M:%S"),
            layers,
            snapshot.description
        );
    }
}

pub fn print_restore(report: &RestoreReport) {
    match report.git_reset {
        Some(true) => println!(
            "Git reset to {}",
            report.snapshot.vcs_revision.as_deref().unwrap_or("?")
        ),
        Some(false) => println!("Git reset failed, see log output"),
        None => {}
    }
    println!("Restored {} file(s)", report.restored_files.len());
    for removed in &report.removed_files {
        println!("  removed {}", removed.display());
    }
    for failure in &report.failures {
        println!("  failed {}: {}", failure.file.display(), failure.message);
    }
    match report.status() {
        RestoreStatus::Full => println!("Snapshot {} restored.", report.snapshot.id),
        RestoreStatus::Partial => {
            println!("Snapshot {} only partially restored.", report.snapshot.id)
        }
    }
}

pub fn print_cleanup(report: &CleanupReport) {
    println!(
        "Kept {} snapshot(s), removed {} and {} copy director(ies).",
        report.retained,
        report.removed_snapshots.len(),
        report.removed_dirs.len()
    );
}

pub fn print_metrics(label: &str, metrics: &BuildMetrics) {
    if metrics.timed_out {
        println!("{}: build timed out", label);
    } else if !metrics.success {
        println!("{}: build failed after {} ms", label, metrics.duration_ms);
    } else {
        println!(
            "{}: {} ms, bundle {}",
            label,
            metrics.duration_ms,
            format_bytes(metrics.bundle_bytes as f64)
        );
    }
}

pub fn print_delta(delta: &BuildDelta) {
    let sign = |n: i64| if n > 0 { "+" } else { "" };
    println!(
        "Change: {}{} ms build time, {}{} bundle",
        sign(delta.duration_ms),
        delta.duration_ms,
        sign(delta.bundle_bytes),
        format_bytes(delta.bundle_bytes as f64)
    );
}

fn format_bytes(bytes: f64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes;
    let mut unit = 0;
    while value.abs() >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", value, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512.0), "512 B");
        assert_eq!(format_bytes(1536.0), "1.5 KB");
        assert_eq!(format_bytes(-2048.0), "-2.0 KB");
        assert_eq!(format_bytes(5.0 * 1024.0 * 1024.0), "5.0 MB");
    }
}
