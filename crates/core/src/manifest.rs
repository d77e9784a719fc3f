// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup manifest: the persisted descriptor of a completed backup.
//!
//! A backup directory is valid only if it contains a `manifest.json`;
//! directories without one are ignored by enumeration.

use crate::device::Device;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a backup contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    Full,
    Files,
    Apps,
    Contacts,
    Sms,
    Messaging,
    UnsyncedApps,
    Custom,
}

impl BackupKind {
    pub const ALL: [BackupKind; 8] = [
        BackupKind::Full,
        BackupKind::Files,
        BackupKind::Apps,
        BackupKind::Contacts,
        BackupKind::Sms,
        BackupKind::Messaging,
        BackupKind::UnsyncedApps,
        BackupKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Files => "files",
            BackupKind::Apps => "apps",
            BackupKind::Contacts => "contacts",
            BackupKind::Sms => "sms",
            BackupKind::Messaging => "messaging",
            BackupKind::UnsyncedApps => "unsynced_apps",
            BackupKind::Custom => "custom",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about one completed backup.
///
/// Created atomically at operation completion; mutated only by explicit
/// delete of the whole backup directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub backup_id: String,
    pub backup_type: BackupKind,
    #[serde(default)]
    pub device_serial: String,
    #[serde(default)]
    pub device_model: String,
    #[serde(default)]
    pub device_manufacturer: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub categories: Vec<String>,
    /// ISO-8601 creation timestamp
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub app_count: u64,
    #[serde(default)]
    pub apps: Vec<String>,
    #[serde(default)]
    pub custom_paths: Vec<String>,
    #[serde(default)]
    pub messaging_apps: Vec<String>,
    #[serde(default)]
    pub unsynced_packages: Vec<String>,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub compressed: bool,
    #[serde(default)]
    pub duration_seconds: f64,
    /// Free-form record of which strategies actually produced data
    #[serde(default)]
    pub notes: String,
}

impl BackupManifest {
    pub fn new(backup_id: impl Into<String>, kind: BackupKind, device: &Device) -> Self {
        Self {
            backup_id: backup_id.into(),
            backup_type: kind,
            device_serial: device.serial.clone(),
            device_model: device.model.clone(),
            device_manufacturer: device.manufacturer.clone(),
            os_version: device.os_version.clone(),
            categories: Vec::new(),
            timestamp: String::new(),
            size_bytes: 0,
            file_count: 0,
            app_count: 0,
            apps: Vec::new(),
            custom_paths: Vec::new(),
            messaging_apps: Vec::new(),
            unsynced_packages: Vec::new(),
            encrypted: false,
            compressed: false,
            duration_seconds: 0.0,
            notes: String::new(),
        }
    }
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
