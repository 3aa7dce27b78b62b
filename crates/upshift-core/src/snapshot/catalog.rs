//! Bounded, newest-first snapshot catalog persisted as JSON.

use crate::atomic::{atomic_read_json, atomic_write_json};
use crate::config::{AppConfig, SnapshotConfig};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use tracing::warn;

/// One backup point. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Commit recorded by the git checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_revision: Option<String>,
    /// Copy directory, relative to the project root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_copy_dir: Option<PathBuf>,
}

/// Fixed-capacity list of snapshots, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotCatalog {
    entries: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for SnapshotCatalog {
    fn default() -> Self {
        Self::with_capacity(SnapshotConfig::CATALOG_CAPACITY)
    }
}

impl SnapshotCatalog {
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "snapshot catalog capacity must be positive");
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Build from persisted entries, which are already newest first.
    pub fn from_entries(entries: Vec<Snapshot>) -> Self {
        let mut catalog = Self::default();
        if entries.len() > catalog.capacity {
            warn!(
                "Snapshot catalog holds {} entries, keeping the newest {}",
                entries.len(),
                catalog.capacity
            );
        }
        catalog.entries = entries.into_iter().take(catalog.capacity).collect();
        catalog.check_bound();
        catalog
    }

    /// Catalog file for a project.
    pub fn path(project_root: &Path) -> PathBuf {
        project_root
            .join(AppConfig::STATE_DIR_NAME)
            .join(SnapshotConfig::CATALOG_FILENAME)
    }

    /// Load the catalog, empty when no snapshot was ever taken.
    pub fn load(project_root: &Path) -> Result<Self> {
        let entries: Option<Vec<Snapshot>> = atomic_read_json(&Self::path(project_root))?;
        Ok(Self::from_entries(entries.unwrap_or_default()))
    }

    pub fn save(&self, project_root: &Path) -> Result<()> {
        atomic_write_json(&Self::path(project_root), &self.entries)
    }

    /// Prepend a snapshot, returning entries pushed out by the bound.
    pub fn insert(&mut self, snapshot: Snapshot) -> Vec<Snapshot> {
        self.entries.push_front(snapshot);
        let evicted = self.truncate(self.capacity);
        self.check_bound();
        evicted
    }

    /// Keep the `keep` newest entries, returning the dropped ones.
    pub fn retain_newest(&mut self, keep: usize) -> Vec<Snapshot> {
        let dropped = self.truncate(keep);
        self.check_bound();
        dropped
    }

    pub fn get(&self, id: &str) -> Option<&Snapshot> {
        self.entries.iter().find(|s| s.id == id)
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries.front()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Snapshot> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn truncate(&mut self, keep: usize) -> Vec<Snapshot> {
        if self.entries.len() <= keep {
            return Vec::new();
        }
        self.entries.split_off(keep).into_iter().collect()
    }

    fn check_bound(&self) {
        debug_assert!(
            self.entries.len() <= self.capacity,
            "snapshot catalog exceeded capacity {}",
            self.capacity
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn snapshot(n: u32) -> Snapshot {
        Snapshot {
            id: format!("snap-{:02}", n),
            timestamp: Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, n).unwrap(),
            description: format!("backup {}", n),
            vcs_revision: None,
            file_copy_dir: Some(PathBuf::from(format!(".upshift/snapshots/snap-{:02}", n))),
        }
    }

    #[test]
    fn test_insert_keeps_newest_first() {
        let mut catalog = SnapshotCatalog::default();
        for n in 0..3 {
            assert!(catalog.insert(snapshot(n)).is_empty());
        }

        let ids: Vec<&str> = catalog.entries().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["snap-02", "snap-01", "snap-00"]);
        assert_eq!(catalog.latest().unwrap().id, "snap-02");
    }

    #[test]
    fn test_insert_evicts_oldest_at_capacity() {
        let mut catalog = SnapshotCatalog::default();
        for n in 0..10 {
            catalog.insert(snapshot(n));
        }

        let evicted = catalog.insert(snapshot(10));
        assert_eq!(catalog.len(), SnapshotConfig::CATALOG_CAPACITY);
        assert_eq!(evicted, vec![snapshot(0)]);
        assert!(!catalog.contains("snap-00"));
    }

    #[test]
    fn test_retain_newest() {
        let mut catalog = SnapshotCatalog::default();
        for n in 0..8 {
            catalog.insert(snapshot(n));
        }

        let dropped = catalog.retain_newest(SnapshotConfig::CLEANUP_RETAIN);
        assert_eq!(catalog.len(), 5);
        assert_eq!(dropped.len(), 3);
        assert_eq!(dropped[0].id, "snap-02");
        assert!(catalog.retain_newest(5).is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let mut catalog = SnapshotCatalog::default();
        catalog.insert(snapshot(1));
        catalog.insert(snapshot(2));
        catalog.save(temp_dir.path()).unwrap();

        let loaded = SnapshotCatalog::load(temp_dir.path()).unwrap();
        assert_eq!(loaded, catalog);

        let raw = std::fs::read_to_string(SnapshotCatalog::path(temp_dir.path())).unwrap();
        assert!(raw.contains("\"fileCopyDir\""));
        assert!(!raw.contains("vcsRevision"));
    }

    #[test]
    fn test_load_truncates_oversized_catalog() {
        let entries: Vec<Snapshot> = (0..12).rev().map(snapshot).collect();
        let catalog = SnapshotCatalog::from_entries(entries);
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.latest().unwrap().id, "snap-11");
    }
}
