// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup operations: full archives, media trees, APKs, contacts, SMS,
//! messaging-app media, unsynced-app data and custom paths.
//!
//! Every completed backup ends with a manifest written atomically into its
//! directory; a directory without a manifest does not exist as far as
//! enumeration is concerned.

use crate::batch::{pull_with_progress, BatchSpec};
use crate::error::OperationError;
use crate::explorer::MessagingDetector;
use crate::index::list_remote_files;
use crate::op::Operation;
use mdt_adapters::subprocess::BACKUP_RESTORE_TIMEOUT;
use mdt_adapters::{Bridge, BridgeOps};
use mdt_core::{
    remote_basename, safe_percent, BackupKind, BackupManifest, Device, DeviceState, FilterOptions,
    OperationProgress, ParallelismConfig, Phase,
};
use mdt_storage::BackupStore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File categories with their default media roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCategory {
    Photos,
    Videos,
    Music,
    Documents,
    Internal,
}

impl FileCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Photos => "photos",
            FileCategory::Videos => "videos",
            FileCategory::Music => "music",
            FileCategory::Documents => "documents",
            FileCategory::Internal => "internal",
        }
    }

    pub fn paths(&self) -> &'static [&'static str] {
        match self {
            FileCategory::Photos => &["/sdcard/DCIM", "/sdcard/Pictures"],
            FileCategory::Videos => &["/sdcard/Movies", "/sdcard/DCIM"],
            FileCategory::Music => &["/sdcard/Music"],
            FileCategory::Documents => &["/sdcard/Documents", "/sdcard/Download"],
            FileCategory::Internal => &["/sdcard"],
        }
    }
}

/// Flags for the bridge-level full backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullBackupOptions {
    pub include_apks: bool,
    pub include_shared: bool,
    pub include_system: bool,
}

impl Default for FullBackupOptions {
    fn default() -> Self {
        Self {
            include_apks: true,
            include_shared: true,
            include_system: false,
        }
    }
}

/// One exported SMS message, as dumped from the content provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRecord {
    pub address: String,
    pub body: String,
    #[serde(default)]
    pub date: String,
    /// 1 = inbox, 2 = sent
    #[serde(default = "default_sms_type")]
    pub r#type: String,
    #[serde(default = "default_sms_read")]
    pub read: String,
}

fn default_sms_type() -> String {
    "1".to_string()
}

fn default_sms_read() -> String {
    "1".to_string()
}

/// Manages device backups over the bridge.
pub struct BackupManager<B: Bridge> {
    bridge: B,
    store: BackupStore,
    op: Operation,
    parallel: ParallelismConfig,
}

impl<B: Bridge> BackupManager<B> {
    pub fn new(bridge: B, store: BackupStore) -> Self {
        Self {
            bridge,
            store,
            op: Operation::new(),
            parallel: ParallelismConfig::default(),
        }
    }

    pub fn with_parallelism(mut self, parallel: ParallelismConfig) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    pub fn list_backups(&self) -> Vec<BackupManifest> {
        self.store.list()
    }

    pub fn delete_backup(&self, backup_id: &str) -> Result<(), OperationError> {
        Ok(self.store.delete(backup_id)?)
    }

    // ------------------------------------------------------------------
    // Full bridge-level backup
    // ------------------------------------------------------------------

    pub async fn backup_full(
        &self,
        serial: &str,
        options: FullBackupOptions,
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Full)?;
        let archive = folder.join("backup.ab");
        let archive_str = archive.display().to_string();

        self.op.emit(OperationProgress {
            phase: Phase::BackingUp,
            sub_phase: "full".to_string(),
            current_item: "full device backup".to_string(),
            ..Default::default()
        });

        let args: Vec<&str> = vec![
            "backup",
            "-all",
            if options.include_apks { "-apk" } else { "-noapk" },
            if options.include_shared { "-shared" } else { "-noshared" },
            if options.include_system { "-system" } else { "-nosystem" },
            "-f",
            &archive_str,
        ];
        let result = self
            .op
            .run_with_confirmation(
                &self.bridge,
                serial,
                &args,
                "Full backup",
                "Confirm the backup on the device screen to continue.",
                BACKUP_RESTORE_TIMEOUT,
            )
            .await;
        if let Err(err) = result {
            self.op.record_error(format!("full backup: {}", err));
        }
        let archive_size = std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
        if archive_size <= 24 {
            // The .ab header alone is 24 bytes; anything at or below that
            // means the user declined or the OS blocked the backup
            self.op
                .record_error("full backup produced an empty archive".to_string());
        }

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Full, &device);
        manifest.compressed = true;
        manifest.file_count = u64::from(archive_size > 24);
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // Media / file backups
    // ------------------------------------------------------------------

    pub async fn backup_files(
        &self,
        serial: &str,
        categories: &[FileCategory],
        custom_paths: &[String],
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Files)?;

        let mut roots: Vec<String> = Vec::new();
        for category in categories {
            for path in category.paths() {
                if !roots.iter().any(|r| r == path) {
                    roots.push(path.to_string());
                }
            }
        }
        roots.extend(custom_paths.iter().cloned());

        self.op.emit(OperationProgress {
            phase: Phase::Indexing,
            sub_phase: "files".to_string(),
            ..Default::default()
        });
        let files = list_remote_files(
            &self.bridge,
            serial,
            &roots,
            FilterOptions::all(),
            &self.op.cancel_token(),
        )
        .await;

        let outcome = pull_with_progress(
            &self.bridge,
            serial,
            &self.op,
            &files,
            &folder.join("files"),
            &self.parallel,
            BatchSpec {
                phase: Phase::BackingUp,
                sub_phase: "files".to_string(),
                strip_prefix: "/".to_string(),
                pct_range: (5.0, 100.0),
            },
        )
        .await;

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Files, &device);
        manifest.categories = categories.iter().map(|c| c.as_str().to_string()).collect();
        manifest.custom_paths = custom_paths.to_vec();
        manifest.file_count = outcome.succeeded;
        self.finalize(manifest, &folder)
    }

    pub async fn backup_custom(
        &self,
        serial: &str,
        paths: &[String],
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Custom)?;

        let files = list_remote_files(
            &self.bridge,
            serial,
            paths,
            FilterOptions::none(),
            &self.op.cancel_token(),
        )
        .await;
        let outcome = pull_with_progress(
            &self.bridge,
            serial,
            &self.op,
            &files,
            &folder.join("custom"),
            &self.parallel,
            BatchSpec {
                phase: Phase::BackingUp,
                sub_phase: "custom".to_string(),
                strip_prefix: "/".to_string(),
                pct_range: (5.0, 100.0),
            },
        )
        .await;

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Custom, &device);
        manifest.custom_paths = paths.to_vec();
        manifest.file_count = outcome.succeeded;
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // APK backup (single and split)
    // ------------------------------------------------------------------

    pub async fn backup_apps(
        &self,
        serial: &str,
        include_data: bool,
        selected: Option<&[String]>,
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Apps)?;
        let apk_dir = folder.join("apks");
        std::fs::create_dir_all(&apk_dir).map_err(mdt_storage::StoreError::from)?;

        let packages: Vec<String> = match selected {
            Some(selected) => selected.to_vec(),
            None => self.bridge.list_packages(serial, true).await,
        };
        let total = packages.len();
        tracing::info!(total, "backing up apps");

        let mut backed_up: Vec<String> = Vec::new();
        for (idx, package) in packages.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            self.op.emit(OperationProgress {
                phase: Phase::BackingUp,
                sub_phase: "apps".to_string(),
                current_item: package.clone(),
                items_done: idx as u64,
                items_total: total as u64,
                percent: safe_percent(idx as u64, total as u64),
                ..Default::default()
            });

            let paths = self.bridge.apk_paths(serial, package).await;
            if paths.is_empty() {
                self.op.record_error(format!("no APK path for {}", package));
                continue;
            }
            let pulled = if paths.len() > 1 {
                // Split APK: one subdirectory per package, base + splits
                let package_dir = apk_dir.join(package);
                let _ = std::fs::create_dir_all(&package_dir);
                let mut count = 0;
                for remote in &paths {
                    let local = package_dir.join(remote_basename(remote));
                    if self.bridge.pull(serial, remote, &local).await {
                        count += 1;
                    }
                }
                count > 0
            } else {
                let local = apk_dir.join(format!("{}.apk", package));
                self.bridge.pull(serial, &paths[0], &local).await
            };
            if pulled {
                backed_up.push(package.clone());
            } else {
                self.op
                    .record_error(format!("APK pull failed: {}", package));
            }
        }

        if include_data && !backed_up.is_empty() {
            let data_archive = folder.join("app_data.ab");
            let data_archive_str = data_archive.display().to_string();
            let mut args = vec!["backup", "-noapk", "-noshared"];
            args.extend(backed_up.iter().map(String::as_str));
            args.push("-f");
            args.push(&data_archive_str);
            let result = self
                .op
                .run_with_confirmation(
                    &self.bridge,
                    serial,
                    &args,
                    "App data backup",
                    "Confirm the app-data backup on the device screen.",
                    BACKUP_RESTORE_TIMEOUT,
                )
                .await;
            if let Err(err) = result {
                self.op.record_error(format!("app data backup: {}", err));
            }
        }

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Apps, &device);
        manifest.app_count = backed_up.len() as u64;
        manifest.apps = backed_up;
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // Contacts / SMS
    // ------------------------------------------------------------------

    /// Backup contacts without requiring root: VCF via the content
    /// provider first, then the bridge-level archive, then (behind the
    /// `privileged` feature) the raw database.
    pub async fn backup_contacts(&self, serial: &str) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Contacts)?;
        let mut methods: Vec<&str> = Vec::new();

        self.op.emit(OperationProgress {
            phase: Phase::BackingUp,
            sub_phase: "contacts".to_string(),
            current_item: "exporting contacts".to_string(),
            ..Default::default()
        });

        // Method 1: content query → minimal VCF
        let raw = self
            .bridge
            .run_shell(
                serial,
                "content query --uri content://com.android.contacts/contacts --projection _id:display_name:lookup",
                Duration::from_secs(60),
            )
            .await;
        let names = parse_contact_names(&raw);
        if !names.is_empty() {
            let mut vcf = String::new();
            for name in &names {
                vcf.push_str("BEGIN:VCARD\nVERSION:3.0\n");
                vcf.push_str(&format!("FN:{}\nN:{};;;;\n", name, name));
                vcf.push_str("END:VCARD\n");
            }
            if std::fs::write(folder.join("contacts.vcf"), vcf).is_ok() {
                methods.push("vcf_content_query");
                tracing::info!(contacts = names.len(), "exported contacts via content query");
            }
        }

        // Method 2: bridge-level archive of the contacts provider
        let archive = folder.join("contacts.ab");
        let archive_str = archive.display().to_string();
        let result = self
            .op
            .run_with_confirmation(
                &self.bridge,
                serial,
                &[
                    "backup",
                    "-noapk",
                    "com.android.providers.contacts",
                    "-f",
                    &archive_str,
                ],
                "Contacts backup",
                "Confirm the backup on the device screen.",
                Duration::from_secs(300),
            )
            .await;
        if result.is_ok() && std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0) > 24 {
            methods.push("adb_backup");
        }

        // Method 3: raw database (elevated privileges only)
        #[cfg(feature = "privileged")]
        {
            let db = folder.join("contacts2.db");
            if self
                .bridge
                .pull(
                    serial,
                    "/data/data/com.android.providers.contacts/databases/contacts2.db",
                    &db,
                )
                .await
            {
                methods.push("db_pull");
            }
        }

        if methods.is_empty() {
            self.op
                .record_error("no contacts export method succeeded".to_string());
        }
        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Contacts, &device);
        manifest.file_count = methods.len() as u64;
        manifest.notes = methods.join(",");
        self.finalize(manifest, &folder)
    }

    /// Backup SMS: JSON dump via the content provider, then the
    /// bridge-level archive, then (privileged) the raw database.
    pub async fn backup_sms(&self, serial: &str) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Sms)?;
        let mut methods: Vec<&str> = Vec::new();

        self.op.emit(OperationProgress {
            phase: Phase::BackingUp,
            sub_phase: "sms".to_string(),
            current_item: "exporting messages".to_string(),
            ..Default::default()
        });

        let raw = self
            .bridge
            .run_shell(
                serial,
                "content query --uri content://sms --projection address:body:date:type:read",
                Duration::from_secs(120),
            )
            .await;
        let messages = parse_sms_rows(&raw);
        if !messages.is_empty() {
            match serde_json::to_string_pretty(&messages) {
                Ok(json) => {
                    if std::fs::write(folder.join("sms_backup.json"), json).is_ok() {
                        methods.push("content_query_json");
                        tracing::info!(messages = messages.len(), "exported SMS via content query");
                    }
                }
                Err(err) => self.op.record_error(format!("sms export encode: {}", err)),
            }
        }

        let archive = folder.join("sms.ab");
        let archive_str = archive.display().to_string();
        let result = self
            .op
            .run_with_confirmation(
                &self.bridge,
                serial,
                &[
                    "backup",
                    "-noapk",
                    "com.android.providers.telephony",
                    "-f",
                    &archive_str,
                ],
                "SMS backup",
                "Confirm the backup on the device screen.",
                Duration::from_secs(300),
            )
            .await;
        if result.is_ok() && std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0) > 24 {
            methods.push("adb_backup");
        }

        #[cfg(feature = "privileged")]
        {
            let db = folder.join("mmssms.db");
            if self
                .bridge
                .pull(
                    serial,
                    "/data/data/com.android.providers.telephony/databases/mmssms.db",
                    &db,
                )
                .await
            {
                methods.push("db_pull");
            }
        }

        if methods.is_empty() {
            self.op
                .record_error("no SMS export method succeeded".to_string());
        }
        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Sms, &device);
        manifest.file_count = messages.len() as u64;
        manifest.notes = methods.join(",");
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // Messaging-app media
    // ------------------------------------------------------------------

    pub async fn backup_messaging(
        &self,
        serial: &str,
        app_keys: Option<&[String]>,
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self.store.create_backup_dir(&device, BackupKind::Messaging)?;

        let detector = MessagingDetector::new(self.bridge.clone());
        let detected = detector.detect(serial).await;
        let selected: Vec<_> = detected
            .into_iter()
            .filter(|app| {
                app_keys
                    .map(|keys| keys.iter().any(|k| k == &app.key))
                    .unwrap_or(true)
            })
            .collect();

        let mut file_count = 0u64;
        let mut keys = Vec::new();
        let total = selected.len();
        for (idx, app) in selected.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            let files = list_remote_files(
                &self.bridge,
                serial,
                &app.existing_paths,
                FilterOptions::all(),
                &self.op.cancel_token(),
            )
            .await;
            let lo = safe_percent(idx as u64, total as u64);
            let hi = safe_percent(idx as u64 + 1, total as u64);
            let outcome = pull_with_progress(
                &self.bridge,
                serial,
                &self.op,
                &files,
                &folder.join("messaging"),
                &self.parallel,
                BatchSpec {
                    phase: Phase::BackingUp,
                    sub_phase: app.name.clone(),
                    strip_prefix: "/".to_string(),
                    pct_range: (lo, hi),
                },
            )
            .await;
            file_count += outcome.succeeded;
            keys.push(app.key.clone());
        }

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::Messaging, &device);
        manifest.messaging_apps = keys;
        manifest.file_count = file_count;
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // Unsynced-app data
    // ------------------------------------------------------------------

    pub async fn backup_unsynced(
        &self,
        serial: &str,
        packages: &[String],
    ) -> Result<BackupManifest, OperationError> {
        self.op.begin();
        let device = self.validated_device(serial).await?;
        let (folder, backup_id) = self
            .store
            .create_backup_dir(&device, BackupKind::UnsyncedApps)?;
        let unsynced_dir = folder.join("unsynced");
        std::fs::create_dir_all(&unsynced_dir).map_err(mdt_storage::StoreError::from)?;

        let mut saved = Vec::new();
        for (idx, package) in packages.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            self.op.emit(OperationProgress {
                phase: Phase::BackingUp,
                sub_phase: "unsynced_apps".to_string(),
                current_item: package.clone(),
                items_done: idx as u64,
                items_total: packages.len() as u64,
                percent: safe_percent(idx as u64, packages.len() as u64),
                ..Default::default()
            });
            let archive = unsynced_dir.join(format!("{}.ab", package));
            let archive_str = archive.display().to_string();
            let result = self
                .op
                .run_with_confirmation(
                    &self.bridge,
                    serial,
                    &["backup", "-noapk", package, "-f", &archive_str],
                    "App data backup",
                    &format!("Confirm the backup of {} on the device.", package),
                    Duration::from_secs(600),
                )
                .await;
            match result {
                Ok(_) if std::fs::metadata(&archive).map(|m| m.len()).unwrap_or(0) > 24 => {
                    saved.push(package.clone());
                }
                Ok(_) => self
                    .op
                    .record_error(format!("empty archive for {}", package)),
                Err(err) => self.op.record_error(format!("{}: {}", package, err)),
            }
        }

        let mut manifest = BackupManifest::new(&backup_id, BackupKind::UnsyncedApps, &device);
        manifest.unsynced_packages = saved;
        self.finalize(manifest, &folder)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// The target must be enumerated and in the connected state.
    async fn validated_device(&self, serial: &str) -> Result<Device, OperationError> {
        let devices = self.bridge.enumerate().await?;
        let listed = devices
            .into_iter()
            .find(|d| d.serial == serial)
            .ok_or_else(|| OperationError::Validation(format!("device {} not connected", serial)))?;
        if listed.state != DeviceState::Connected {
            return Err(OperationError::Validation(format!(
                "device {} is {}, expected connected",
                serial, listed.state
            )));
        }
        let mut device = self.bridge.device_details(serial).await;
        if device.model.is_empty() {
            device.model = listed.model;
        }
        device.product = if device.product.is_empty() {
            listed.product
        } else {
            device.product
        };
        Ok(device)
    }

    /// Stamp, size, persist and report. The manifest write is the commit
    /// point that makes the backup visible to enumeration.
    fn finalize(
        &self,
        mut manifest: BackupManifest,
        folder: &Path,
    ) -> Result<BackupManifest, OperationError> {
        manifest.timestamp = chrono::Local::now().to_rfc3339();
        manifest.duration_seconds = self.op.elapsed_seconds();
        manifest.size_bytes = self.store.backup_size(&manifest.backup_id);
        self.store.save_manifest(&manifest)?;
        let phase = self.op.emit_terminal();
        tracing::info!(
            backup_id = %manifest.backup_id,
            kind = %manifest.backup_type,
            size = manifest.size_bytes,
            %phase,
            folder = %folder.display(),
            "backup finished"
        );
        Ok(manifest)
    }
}

/// Extract display names from a `content query` contacts dump.
fn parse_contact_names(raw: &str) -> Vec<String> {
    let mut names = Vec::new();
    for line in raw.lines() {
        let Some(rest) = line.split("display_name=").nth(1) else {
            continue;
        };
        let name = rest.split(", lookup=").next().unwrap_or(rest).trim();
        if !name.is_empty() && name != "NULL" {
            names.push(name.to_string());
        }
    }
    names
}

/// Parse `content query` SMS rows into records.
///
/// Rows look like `Row: 0 address=+15551234, body=hi, there, date=…,
/// type=1, read=1`. Splitting on commas would shred bodies, so fields are
/// sliced between known-key markers instead.
fn parse_sms_rows(raw: &str) -> Vec<SmsRecord> {
    const KEYS: [&str; 5] = ["address", "body", "date", "type", "read"];
    let mut records = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if !line.starts_with("Row:") {
            continue;
        }
        let fields = parse_row_fields(line, &KEYS);
        let address = fields.get("address").cloned().unwrap_or_default();
        let body = fields.get("body").cloned().unwrap_or_default();
        if address.is_empty() || body.is_empty() || address == "NULL" || body == "NULL" {
            continue;
        }
        records.push(SmsRecord {
            address,
            body,
            date: fields.get("date").cloned().unwrap_or_default(),
            r#type: fields
                .get("type")
                .cloned()
                .unwrap_or_else(default_sms_type),
            read: fields
                .get("read")
                .cloned()
                .unwrap_or_else(default_sms_read),
        });
    }
    records
}

/// Slice a `key=value, key=value` row between known-key markers so values
/// may themselves contain commas.
fn parse_row_fields(line: &str, keys: &[&str]) -> HashMap<String, String> {
    // Find each key's marker position, then cut values between markers
    let mut markers: Vec<(usize, &str)> = Vec::new();
    for key in keys {
        let marker = format!("{}=", key);
        let mut search_from = 0;
        while let Some(found) = line[search_from..].find(&marker) {
            let at = search_from + found;
            let preceded_ok = at == 0
                || line[..at].ends_with(", ")
                || line[..at].ends_with(' ');
            if preceded_ok {
                markers.push((at, key));
                break;
            }
            search_from = at + marker.len();
        }
    }
    markers.sort_by_key(|(at, _)| *at);

    let mut fields = HashMap::new();
    for (idx, (at, key)) in markers.iter().enumerate() {
        let value_start = at + key.len() + 1;
        let value_end = markers
            .get(idx + 1)
            .map(|(next, _)| *next)
            .unwrap_or(line.len());
        let value = line[value_start..value_end]
            .trim_end()
            .trim_end_matches(',')
            .trim();
        fields.insert(key.to_string(), value.to_string());
    }
    fields
}

/// Local file set of a staged backup subtree, as `(local, remote)` pairs
/// with the remote path reconstructed from the relative layout.
pub(crate) fn staged_pairs(root: &Path) -> Vec<(PathBuf, String)> {
    let mut pairs = Vec::new();
    collect_staged(root, root, &mut pairs);
    pairs.sort();
    pairs
}

fn collect_staged(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, String)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_staged(base, &path, out);
        } else if let Ok(rel) = path.strip_prefix(base) {
            let remote = format!("/{}", rel.to_string_lossy().replace('\\', "/"));
            out.push((path, remote));
        }
    }
}

#[cfg(test)]
#[path = "backup_tests.rs"]
mod tests;
