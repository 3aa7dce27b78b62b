//! Integration tests for snapshot creation, cataloguing and restore.

use semver::Version;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;
use upshift::{
    MigrateOptions, MigrationOutcome, Migrator, RestoreStatus, SnapshotCatalog, StaticRuntime,
    UpshiftError,
};

const MIDDLEWARE: &str = "export function middleware(request) {\n  return request;\n}\n";

fn create_project() -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::write(
        root.join("package.json"),
        r#"{ "dependencies": { "next": "15.4.0" } }"#,
    )
    .unwrap();
    fs::write(root.join("next.config.js"), "module.exports = {};\n").unwrap();
    fs::write(root.join("middleware.js"), MIDDLEWARE).unwrap();
    fs::write(root.join(".env"), "API_URL=http://localhost\n").unwrap();
    temp_dir
}

fn migrator(root: &Path) -> Migrator {
    Migrator::new(root)
        .unwrap()
        .with_runtime_probe(StaticRuntime(Some(Version::new(20, 11, 1))))
}

fn git(root: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(root)
        .output()
        .is_ok_and(|o| o.status.success())
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let temp_dir = create_project();
    let root = temp_dir.path();
    let migrator = migrator(root);

    let id = migrator.create_snapshot("round trip").await.unwrap();

    fs::write(root.join("package.json"), r#"{ "dependencies": {} }"#).unwrap();
    fs::write(root.join(".env"), "API_URL=https://prod\n").unwrap();
    fs::remove_file(root.join("next.config.js")).unwrap();

    let report = migrator.restore(Some(&id)).await.unwrap();
    assert_eq!(report.status(), RestoreStatus::Full);
    assert_eq!(
        fs::read_to_string(root.join("package.json")).unwrap(),
        r#"{ "dependencies": { "next": "15.4.0" } }"#
    );
    assert_eq!(
        fs::read_to_string(root.join(".env")).unwrap(),
        "API_URL=http://localhost\n"
    );
    assert!(root.join("next.config.js").exists());
}

#[tokio::test]
async fn test_migration_then_rollback() {
    let temp_dir = create_project();
    let root = temp_dir.path();
    let migrator = migrator(root);

    let report = migrator.analyze().await;
    let outcome = migrator
        .migrate(&report, MigrateOptions::default())
        .await
        .unwrap();
    let MigrationOutcome::Applied { snapshot_id, result } = outcome else {
        panic!("expected an applied migration");
    };
    assert_eq!(result.failure_count, 0);
    assert!(root.join("proxy.js").exists());

    let restored = migrator.restore(snapshot_id.as_deref()).await.unwrap();
    assert_eq!(fs::read_to_string(root.join("middleware.js")).unwrap(), MIDDLEWARE);
    assert!(!root.join("proxy.js").exists());
    assert_eq!(restored.status(), RestoreStatus::Full);
}

#[tokio::test]
async fn test_catalog_keeps_ten_newest() {
    let temp_dir = create_project();
    let migrator = migrator(temp_dir.path());

    let mut ids = Vec::new();
    for n in 0..11 {
        ids.push(migrator.create_snapshot(&format!("run {}", n)).await.unwrap());
    }

    let listed = migrator.list_snapshots().unwrap();
    assert_eq!(listed.len(), 10);
    let listed_ids: Vec<&str> = listed.iter().map(|s| s.id.as_str()).collect();
    let expected: Vec<&str> = ids.iter().rev().take(10).map(String::as_str).collect();
    assert_eq!(listed_ids, expected);

    // The catalog on disk is a JSON array in the same order
    let raw = fs::read_to_string(SnapshotCatalog::path(temp_dir.path())).unwrap();
    let entries: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
    assert_eq!(entries.len(), 10);
    assert_eq!(entries[0]["id"], ids[10].as_str());
    assert!(entries[0]["timestamp"].is_string());
    assert_eq!(entries[0]["description"], "run 10");
}

#[tokio::test]
async fn test_cleanup_keeps_five() {
    let temp_dir = create_project();
    let migrator = migrator(temp_dir.path());
    for n in 0..8 {
        migrator.create_snapshot(&format!("run {}", n)).await.unwrap();
    }

    let report = migrator.cleanup_snapshots().await.unwrap();
    assert_eq!(report.retained, 5);
    assert_eq!(report.removed_snapshots.len(), 3);
    assert_eq!(migrator.list_snapshots().unwrap().len(), 5);
}

#[tokio::test]
async fn test_unknown_snapshot_leaves_tree_untouched() {
    let temp_dir = create_project();
    let root = temp_dir.path();
    let migrator = migrator(root);
    migrator.create_snapshot("existing").await.unwrap();
    fs::write(root.join("middleware.js"), "// edited\n").unwrap();

    let err = migrator
        .restore(Some("20200101000000-ffffffff"))
        .await
        .unwrap_err();

    assert!(matches!(err, UpshiftError::SnapshotNotFound { ref id } if id == "20200101000000-ffffffff"));
    assert_eq!(fs::read_to_string(root.join("middleware.js")).unwrap(), "// edited\n");
}

#[tokio::test]
async fn test_git_checkpoint_restores_whole_tree() {
    let temp_dir = create_project();
    let root = temp_dir.path();
    if !git(root, &["init", "-q"]) {
        return;
    }
    fs::create_dir_all(root.join("app")).unwrap();
    let page = "import Image from 'next/legacy/image';\nexport default function Page() { return <Image />; }\n";
    fs::write(root.join("app/page.tsx"), page).unwrap();

    let migrator = migrator(root);
    let report = migrator.analyze().await;
    let outcome = migrator
        .migrate(&report, MigrateOptions::default())
        .await
        .unwrap();
    let MigrationOutcome::Applied { snapshot_id, .. } = outcome else {
        panic!("expected an applied migration");
    };

    let snapshot = migrator.list_snapshots().unwrap().remove(0);
    assert_eq!(Some(snapshot.id.clone()), snapshot_id);
    assert!(snapshot.vcs_revision.is_some());
    assert!(fs::read_to_string(root.join("app/page.tsx"))
        .unwrap()
        .contains("'next/image'"));

    let restored = migrator.restore(None).await.unwrap();
    assert_eq!(restored.git_reset, Some(true));
    assert_eq!(fs::read_to_string(root.join("app/page.tsx")).unwrap(), page);
    assert_eq!(fs::read_to_string(root.join("middleware.js")).unwrap(), MIDDLEWARE);
}
