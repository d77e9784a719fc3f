// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Restore operations: the mirror of each backup kind.
//!
//! Contacts and SMS try multiple fallbacks in order because platform
//! restrictions block different paths on different OS versions. The first
//! strategy that succeeds is the source of truth; later ones only run
//! when everything before them failed.

use crate::backup::{staged_pairs, SmsRecord};
use crate::batch::{push_with_progress, BatchSpec};
use crate::error::OperationError;
use crate::op::Operation;
use mdt_adapters::subprocess::BACKUP_RESTORE_TIMEOUT;
use mdt_adapters::{shell_quote, Bridge, BridgeOps};
use mdt_core::{
    safe_percent, BackupManifest, OperationProgress, ParallelismConfig, Phase,
};
use mdt_storage::BackupStore;
use std::path::PathBuf;
use std::time::Duration;

/// Which restore strategy ended up delivering the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreMethod {
    ContentProvider,
    BridgeArchive,
    DatabasePush,
}

impl std::fmt::Display for RestoreMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RestoreMethod::ContentProvider => "content_provider",
            RestoreMethod::BridgeArchive => "bridge_archive",
            RestoreMethod::DatabasePush => "database_push",
        };
        write!(f, "{}", s)
    }
}

/// Manages restores from the backup store onto a device.
pub struct RestoreManager<B: Bridge> {
    bridge: B,
    store: BackupStore,
    op: Operation,
    parallel: ParallelismConfig,
}

impl<B: Bridge> RestoreManager<B> {
    pub fn new(bridge: B, store: BackupStore) -> Self {
        Self {
            bridge,
            store,
            op: Operation::new(),
            parallel: ParallelismConfig::default(),
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn manifest(&self, backup_id: &str) -> Result<BackupManifest, OperationError> {
        Ok(self.store.manifest(backup_id)?)
    }

    // ------------------------------------------------------------------
    // Full archive restore
    // ------------------------------------------------------------------

    pub async fn restore_full(&self, serial: &str, backup_id: &str) -> Result<Phase, OperationError> {
        self.op.begin();
        let _ = self.manifest(backup_id)?;
        let archive = self.store.backup_dir(backup_id).join("backup.ab");
        if !archive.is_file() {
            return Err(OperationError::Validation(format!(
                "backup {} has no full archive",
                backup_id
            )));
        }
        let archive_str = archive.display().to_string();
        self.op.emit(OperationProgress {
            phase: Phase::Restoring,
            sub_phase: "full".to_string(),
            ..Default::default()
        });
        let result = self
            .op
            .run_with_confirmation(
                &self.bridge,
                serial,
                &["restore", &archive_str],
                "Full restore",
                "Tap 'Restore my data' on the device screen.",
                BACKUP_RESTORE_TIMEOUT,
            )
            .await;
        if let Err(err) = result {
            self.op.record_error(format!("full restore: {}", err));
        }
        Ok(self.op.emit_terminal())
    }

    // ------------------------------------------------------------------
    // Staged file trees (files / custom / messaging)
    // ------------------------------------------------------------------

    pub async fn restore_files(&self, serial: &str, backup_id: &str) -> Result<Phase, OperationError> {
        self.restore_staged_tree(serial, backup_id, "files").await
    }

    pub async fn restore_custom(&self, serial: &str, backup_id: &str) -> Result<Phase, OperationError> {
        self.restore_staged_tree(serial, backup_id, "custom").await
    }

    pub async fn restore_messaging(
        &self,
        serial: &str,
        backup_id: &str,
    ) -> Result<Phase, OperationError> {
        self.restore_staged_tree(serial, backup_id, "messaging").await
    }

    async fn restore_staged_tree(
        &self,
        serial: &str,
        backup_id: &str,
        subtree: &str,
    ) -> Result<Phase, OperationError> {
        self.op.begin();
        let _ = self.manifest(backup_id)?;
        let root = self.store.backup_dir(backup_id).join(subtree);
        if !root.is_dir() {
            return Err(OperationError::Validation(format!(
                "backup {} has no {} tree",
                backup_id, subtree
            )));
        }
        let pairs = staged_pairs(&root);
        push_with_progress(
            &self.bridge,
            serial,
            &self.op,
            &pairs,
            &self.parallel,
            BatchSpec {
                phase: Phase::Restoring,
                sub_phase: subtree.to_string(),
                ..Default::default()
            },
        )
        .await;
        Ok(self.op.emit_terminal())
    }

    // ------------------------------------------------------------------
    // Apps (single and split APK)
    // ------------------------------------------------------------------

    /// Reinstall APKs from a backup. The on-disk shape distinguishes
    /// split packages (a per-package directory) from single APKs (a flat
    /// file); splits go through `install-multiple`.
    /// Returns `(installed, total)`.
    pub async fn restore_apps(
        &self,
        serial: &str,
        backup_id: &str,
        selected: Option<&[String]>,
        restore_data: bool,
    ) -> Result<(u64, u64), OperationError> {
        self.op.begin();
        let _ = self.manifest(backup_id)?;
        let apk_dir = self.store.backup_dir(backup_id).join("apks");
        if !apk_dir.is_dir() {
            return Err(OperationError::Validation(format!(
                "backup {} has no APKs",
                backup_id
            )));
        }

        // Collect installable items from the directory shape
        let mut items: Vec<(String, PathBuf, bool)> = Vec::new();
        if let Ok(entries) = std::fs::read_dir(&apk_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                    continue;
                };
                if path.is_dir() {
                    items.push((name, path, true));
                } else if name.ends_with(".apk") {
                    let package = name.trim_end_matches(".apk").to_string();
                    items.push((package, path, false));
                }
            }
        }
        items.sort();
        if let Some(selected) = selected {
            items.retain(|(package, _, _)| selected.contains(package));
        }

        let total = items.len() as u64;
        let mut installed = 0u64;
        for (idx, (package, path, is_split)) in items.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            self.op.emit(OperationProgress {
                phase: Phase::Installing,
                sub_phase: "apps".to_string(),
                current_item: package.clone(),
                items_done: idx as u64,
                items_total: total,
                percent: safe_percent(idx as u64, total),
                ..Default::default()
            });

            let ok = if *is_split {
                let parts: Vec<String> = std::fs::read_dir(path)
                    .map(|entries| {
                        entries
                            .flatten()
                            .map(|e| e.path())
                            .filter(|p| p.extension().map(|x| x == "apk").unwrap_or(false))
                            .map(|p| p.display().to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                if parts.is_empty() {
                    false
                } else {
                    tracing::info!(package, parts = parts.len(), "installing split APK");
                    self.bridge.install_multiple(serial, &parts).await
                }
            } else {
                self.bridge.install(serial, path).await
            };
            if ok {
                installed += 1;
            } else {
                self.op.record_error(format!("install failed: {}", package));
            }
        }

        if restore_data {
            let data_archive = self.store.backup_dir(backup_id).join("app_data.ab");
            if data_archive.is_file()
                && std::fs::metadata(&data_archive).map(|m| m.len()).unwrap_or(0) > 24
            {
                let archive_str = data_archive.display().to_string();
                let result = self
                    .op
                    .run_with_confirmation(
                        &self.bridge,
                        serial,
                        &["restore", &archive_str],
                        "App data restore",
                        "Tap 'Restore my data' on the device screen.",
                        BACKUP_RESTORE_TIMEOUT,
                    )
                    .await;
                if let Err(err) = result {
                    self.op.record_error(format!("app data restore: {}", err));
                }
            }
        }

        self.op.emit_terminal();
        tracing::info!(installed, total, "app restore finished");
        Ok((installed, total))
    }

    // ------------------------------------------------------------------
    // Contacts
    // ------------------------------------------------------------------

    /// Restore contacts: VCF + view intent, then the bridge archive, then
    /// (privileged builds) the raw database.
    pub async fn restore_contacts(
        &self,
        serial: &str,
        backup_id: &str,
    ) -> Result<Option<RestoreMethod>, OperationError> {
        self.op.begin();
        let _ = self.manifest(backup_id)?;
        let folder = self.store.backup_dir(backup_id);
        let mut method = None;

        self.op.emit(OperationProgress {
            phase: Phase::Restoring,
            sub_phase: "contacts".to_string(),
            ..Default::default()
        });

        // Strategy 1: push the VCF and fire the import intent
        let vcf = folder.join("contacts.vcf");
        if std::fs::metadata(&vcf).map(|m| m.len()).unwrap_or(0) > 10 {
            let remote_vcf = "/sdcard/contacts_restore.vcf";
            if self.bridge.push(serial, &vcf, remote_vcf).await {
                self.bridge
                    .run_shell(
                        serial,
                        "am start -a android.intent.action.VIEW -d file:///sdcard/contacts_restore.vcf -t text/x-vcard",
                        Duration::from_secs(30),
                    )
                    .await;
                tracing::info!("contacts VCF pushed, import intent sent");
                method = Some(RestoreMethod::ContentProvider);
            }
        }

        // Strategy 2: bridge-level restore (empty archives are skipped;
        // newer OS versions produce them when the provider is protected)
        if method.is_none() {
            let archive = folder.join("contacts.ab");
            if std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0) > 24 {
                let archive_str = archive.display().to_string();
                let result = self
                    .op
                    .run_with_confirmation(
                        &self.bridge,
                        serial,
                        &["restore", &archive_str],
                        "Contacts restore",
                        "Tap 'Restore my data' on the device screen.",
                        Duration::from_secs(300),
                    )
                    .await;
                if matches!(result, Ok(ref output) if output.success()) {
                    method = Some(RestoreMethod::BridgeArchive);
                }
            }
        }

        // Strategy 3: direct database push; only works with elevated
        // privileges, so it is compiled out of normal builds
        #[cfg(feature = "privileged")]
        if method.is_none() {
            let db = folder.join("contacts2.db");
            if db.is_file()
                && self
                    .bridge
                    .push(
                        serial,
                        &db,
                        "/data/data/com.android.providers.contacts/databases/contacts2.db",
                    )
                    .await
            {
                method = Some(RestoreMethod::DatabasePush);
            }
        }

        if method.is_none() {
            self.op.record_error(
                "no viable contacts restore path; import the VCF manually or use account sync"
                    .to_string(),
            );
        }
        self.op.emit_terminal();
        Ok(method)
    }

    // ------------------------------------------------------------------
    // SMS
    // ------------------------------------------------------------------

    /// Restore SMS: per-message `content insert` from the JSON dump, then
    /// the bridge archive, then (privileged builds) the raw database.
    pub async fn restore_sms(
        &self,
        serial: &str,
        backup_id: &str,
    ) -> Result<Option<RestoreMethod>, OperationError> {
        self.op.begin();
        let _ = self.manifest(backup_id)?;
        let folder = self.store.backup_dir(backup_id);
        let mut method = None;

        // Strategy 1: content provider inserts
        let dump = folder.join("sms_backup.json");
        if let Ok(json) = std::fs::read_to_string(&dump) {
            match serde_json::from_str::<Vec<SmsRecord>>(&json) {
                Ok(messages) => {
                    let total = messages.len() as u64;
                    let mut restored = 0u64;
                    for (idx, message) in messages.iter().enumerate() {
                        if self.op.is_cancelled() {
                            break;
                        }
                        if message.address.is_empty() || message.body.is_empty() {
                            continue;
                        }
                        let mut cmd = format!(
                            "content insert --uri content://sms --bind address:s:{} --bind body:s:{} --bind type:i:{} --bind read:i:{}",
                            shell_quote(&message.address),
                            shell_quote(&message.body),
                            message.r#type,
                            message.read,
                        );
                        if !message.date.is_empty() {
                            cmd.push_str(&format!(" --bind date:l:{}", message.date));
                        }
                        let out = self
                            .bridge
                            .run_shell(serial, &cmd, Duration::from_secs(10))
                            .await;
                        if !out.contains("Exception") {
                            restored += 1;
                        }
                        if idx % 50 == 0 {
                            self.op.emit(OperationProgress {
                                phase: Phase::Restoring,
                                sub_phase: "sms".to_string(),
                                current_item: format!("message {}/{}", idx + 1, total),
                                items_done: idx as u64 + 1,
                                items_total: total,
                                percent: 10.0 + safe_percent(idx as u64, total) * 0.7,
                                ..Default::default()
                            });
                        }
                    }
                    if restored > 0 {
                        tracing::info!(restored, total, "SMS restored via content provider");
                        method = Some(RestoreMethod::ContentProvider);
                    }
                }
                Err(err) => self.op.record_error(format!("sms dump parse: {}", err)),
            }
        }

        // Strategy 2: bridge-level restore
        if method.is_none() {
            let archive = folder.join("sms.ab");
            if std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0) > 24 {
                let archive_str = archive.display().to_string();
                let result = self
                    .op
                    .run_with_confirmation(
                        &self.bridge,
                        serial,
                        &["restore", &archive_str],
                        "SMS restore",
                        "Tap 'Restore my data' on the device screen.",
                        Duration::from_secs(300),
                    )
                    .await;
                if matches!(result, Ok(ref output) if output.success()) {
                    method = Some(RestoreMethod::BridgeArchive);
                }
            }
        }

        // Strategy 3: raw database push (privileged builds)
        #[cfg(feature = "privileged")]
        if method.is_none() {
            let db = folder.join("mmssms.db");
            if db.is_file()
                && self
                    .bridge
                    .push(
                        serial,
                        &db,
                        "/data/data/com.android.providers.telephony/databases/mmssms.db",
                    )
                    .await
            {
                method = Some(RestoreMethod::DatabasePush);
            }
        }

        if method.is_none() {
            self.op
                .record_error("no viable SMS restore path on this device".to_string());
        }
        self.op.emit_terminal();
        Ok(method)
    }

    // ------------------------------------------------------------------
    // Unsynced-app archives
    // ------------------------------------------------------------------

    pub async fn restore_unsynced(&self, serial: &str, backup_id: &str) -> Result<Phase, OperationError> {
        self.op.begin();
        let manifest = self.manifest(backup_id)?;
        let unsynced_dir = self.store.backup_dir(backup_id).join("unsynced");
        let total = manifest.unsynced_packages.len() as u64;
        for (idx, package) in manifest.unsynced_packages.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            let archive = unsynced_dir.join(format!("{}.ab", package));
            if !archive.is_file() {
                self.op
                    .record_error(format!("missing archive for {}", package));
                continue;
            }
            self.op.emit(OperationProgress {
                phase: Phase::Restoring,
                sub_phase: "unsynced_apps".to_string(),
                current_item: package.clone(),
                items_done: idx as u64,
                items_total: total,
                percent: safe_percent(idx as u64, total),
                ..Default::default()
            });
            let archive_str = archive.display().to_string();
            let result = self
                .op
                .run_with_confirmation(
                    &self.bridge,
                    serial,
                    &["restore", &archive_str],
                    "App data restore",
                    &format!("Tap 'Restore my data' to restore {}.", package),
                    Duration::from_secs(600),
                )
                .await;
            if let Err(err) = result {
                self.op.record_error(format!("{}: {}", package, err));
            }
        }
        Ok(self.op.emit_terminal())
    }
}

#[cfg(test)]
#[path = "restore_tests.rs"]
mod tests;
