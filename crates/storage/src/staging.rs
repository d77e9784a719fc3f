// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clone staging tree: the local waypoint between pull and push.
//!
//! Layout: `<work_dir>/clone_<timestamp>/storage/<relative path>` where the
//! relative path mirrors the device tree below the cloned storage root.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// One clone operation's staging directory.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
    storage: PathBuf,
}

impl StagingArea {
    /// Create a fresh timestamped staging tree under `work_dir`.
    pub fn create(work_dir: &Path) -> std::io::Result<Self> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let root = work_dir.join(format!("clone_{}", stamp));
        let storage = root.join("storage");
        fs::create_dir_all(&storage)?;
        Ok(Self { root, storage })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the mirrored device tree.
    pub fn storage_root(&self) -> &Path {
        &self.storage
    }

    /// Scratch space for the nested side-channel backups.
    pub fn side_channel_dir(&self) -> PathBuf {
        self.root.join("app_transfer")
    }

    /// Map a remote path below `storage_path` to its staged location.
    /// Returns `None` when the path is outside the cloned root.
    pub fn staged_path(&self, storage_path: &str, remote: &str) -> Option<PathBuf> {
        let rel = remote
            .strip_prefix(storage_path)?
            .trim_start_matches('/');
        if rel.is_empty() {
            return None;
        }
        Some(self.storage.join(rel))
    }

    /// Map a staged file back to its remote path below `storage_path`.
    pub fn remote_path(&self, storage_path: &str, staged: &Path) -> Option<String> {
        let rel = staged.strip_prefix(&self.storage).ok()?;
        let rel = rel.to_string_lossy().replace('\\', "/");
        Some(format!("{}/{}", storage_path.trim_end_matches('/'), rel))
    }

    /// All staged files, relative paths in deterministic order.
    pub fn staged_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        collect_files(&self.storage, &mut files);
        files.sort();
        files
    }

    /// Remove the whole staging tree.
    pub fn cleanup(self) -> std::io::Result<()> {
        fs::remove_dir_all(&self.root)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}
