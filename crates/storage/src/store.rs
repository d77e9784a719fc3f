// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup store: one directory per backup, gated by its manifest.
//!
//! The manifest is the validity marker — a directory without
//! `manifest.json` is not a backup and enumeration skips it. Manifests are
//! written atomically (temp file + rename) so a crash mid-save never
//! produces a half-valid backup.

use chrono::Local;
use mdt_core::{BackupKind, BackupManifest, Device};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest file name inside each backup directory.
pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backup not found: {0}")]
    NotFound(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// Filesystem-backed collection of backups.
#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory for a new backup and mint its id:
    /// `<model-or-serial>_<kind>_<timestamp>`.
    pub fn create_backup_dir(
        &self,
        device: &Device,
        kind: BackupKind,
    ) -> Result<(PathBuf, String), StoreError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let label = if device.model.is_empty() {
            device.serial.clone()
        } else {
            device.model.replace(' ', "_")
        };
        let backup_id = format!("{}_{}_{}", label, kind, stamp);
        let dir = self.root.join(&backup_id);
        fs::create_dir_all(&dir)?;
        Ok((dir, backup_id))
    }

    pub fn backup_dir(&self, backup_id: &str) -> PathBuf {
        self.root.join(backup_id)
    }

    /// Enumerate valid backups, newest first. Directories without a
    /// manifest are ignored; unreadable manifests are logged and skipped.
    pub fn list(&self) -> Vec<BackupManifest> {
        let mut manifests = Vec::new();
        let Ok(entries) = fs::read_dir(&self.root) else {
            return manifests;
        };
        for entry in entries.flatten() {
            let manifest_path = entry.path().join(MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            match self.read_manifest(&manifest_path) {
                Ok(manifest) => manifests.push(manifest),
                Err(err) => {
                    tracing::warn!(path = %manifest_path.display(), error = %err, "skipping unreadable manifest");
                }
            }
        }
        manifests.sort_by(|a, b| b.backup_id.cmp(&a.backup_id));
        manifests
    }

    /// Load one backup's manifest.
    pub fn manifest(&self, backup_id: &str) -> Result<BackupManifest, StoreError> {
        let path = self.backup_dir(backup_id).join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(StoreError::NotFound(backup_id.to_string()));
        }
        self.read_manifest(&path)
    }

    fn read_manifest(&self, path: &Path) -> Result<BackupManifest, StoreError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Atomically persist a manifest into its backup directory.
    pub fn save_manifest(&self, manifest: &BackupManifest) -> Result<(), StoreError> {
        let dir = self.backup_dir(&manifest.backup_id);
        fs::create_dir_all(&dir)?;
        let text = serde_json::to_string_pretty(manifest)?;
        let tmp = dir.join(".manifest.json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, dir.join(MANIFEST_FILE))?;
        Ok(())
    }

    /// Delete a backup directory and everything in it.
    pub fn delete(&self, backup_id: &str) -> Result<(), StoreError> {
        let dir = self.backup_dir(backup_id);
        if !dir.exists() {
            return Err(StoreError::NotFound(backup_id.to_string()));
        }
        fs::remove_dir_all(&dir)?;
        tracing::info!(backup_id, "backup deleted");
        Ok(())
    }

    /// Total on-disk size of a backup in bytes.
    pub fn backup_size(&self, backup_id: &str) -> u64 {
        dir_size(&self.backup_dir(backup_id))
    }
}

fn dir_size(dir: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                dir_size(&path)
            } else {
                entry.metadata().map(|m| m.len()).unwrap_or(0)
            }
        })
        .sum()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
