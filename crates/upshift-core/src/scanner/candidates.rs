//! Candidate file discovery.

use crate::config::ScanConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Source files the rules should look at, relative to `project_root`, sorted.
pub fn discover(project_root: &Path) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();

    for file in ScanConfig::CANDIDATE_FILES {
        if project_root.join(file).is_file() {
            found.insert(PathBuf::from(file));
        }
    }

    for tree in ScanConfig::CANDIDATE_TREES {
        let tree_root = project_root.join(tree);
        if !tree_root.is_dir() {
            continue;
        }

        for entry in WalkDir::new(&tree_root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_ignored_dir(e))
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(project_root) {
                found.insert(relative.to_path_buf());
            }
        }
    }

    found.into_iter().collect()
}

fn is_ignored_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ScanConfig::IGNORED_DIRS.contains(&name))
}

fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ScanConfig::SOURCE_EXTENSIONS.contains(&ext))
}
