// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cross-device transfer and the full-storage clone.
//!
//! The clone is the most demanding workflow: index the source, pull
//! everything into a local staging tree (0–50 %), push it to the target
//! (50–80 %), verify checksums (80–90 %), then move the side-channel data
//! (apps, contacts, SMS, messaging) through nested backup→restore
//! (90–100 %). Partial failure accumulates; the workflow keeps going so
//! the user recovers as much as possible.

use crate::backup::{BackupManager, FileCategory};
use crate::batch::{pull_with_progress, push_with_progress, BatchSpec};
use crate::error::OperationError;
use crate::index::{index_adaptive, ScanSpec};
use crate::op::{Operation, ProgressSink};
use crate::restore::RestoreManager;
use mdt_adapters::{Bridge, BridgeOps, ConfirmAdapter};
use mdt_core::{
    Device, DeviceState, FilterOptions, OperationProgress, ParallelismConfig, Phase,
    TransferOptions,
};
use mdt_storage::{BackupStore, StagingArea};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default storage root cloned between devices.
pub const DEFAULT_STORAGE_PATH: &str = "/storage/emulated/0";

/// Remote checksums are fetched in batches of this many paths.
const VERIFY_BATCH: usize = 50;
/// Concurrent local hashing tasks during verification.
const HASH_WORKERS: usize = 8;

/// What a category transfer moves.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub apps: bool,
    pub app_data: bool,
    pub files: bool,
    pub categories: Vec<FileCategory>,
    pub contacts: bool,
    pub sms: bool,
    pub messaging: bool,
    pub messaging_keys: Vec<String>,
    pub unsynced_packages: Vec<String>,
    pub custom_paths: Vec<String>,
}

impl Default for TransferPlan {
    fn default() -> Self {
        Self {
            apps: true,
            app_data: false,
            files: true,
            categories: vec![
                FileCategory::Photos,
                FileCategory::Videos,
                FileCategory::Music,
                FileCategory::Documents,
            ],
            contacts: true,
            sms: true,
            messaging: false,
            messaging_keys: Vec::new(),
            unsynced_packages: Vec::new(),
            custom_paths: Vec::new(),
        }
    }
}

impl TransferPlan {
    /// Everything the pipeline can move.
    pub fn everything() -> Self {
        Self {
            app_data: true,
            messaging: true,
            ..Self::default()
        }
    }
}

/// Outcome of a full-storage clone.
#[derive(Debug, Clone, Default)]
pub struct CloneReport {
    pub indexed: u64,
    pub pulled: u64,
    pub pushed: u64,
    pub verified_matched: u64,
    pub verified_mismatched: u64,
    pub phase: Phase,
    pub errors: Vec<String>,
}

/// Orchestrates device-to-device migration.
pub struct TransferManager<B: Bridge> {
    bridge: B,
    work_dir: PathBuf,
    op: Operation,
    parallel: ParallelismConfig,
    options: TransferOptions,
    confirm: parking_lot::Mutex<Option<Arc<dyn ConfirmAdapter>>>,
}

impl<B: Bridge> TransferManager<B> {
    pub fn new(bridge: B, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            bridge,
            work_dir: work_dir.into(),
            op: Operation::new(),
            parallel: ParallelismConfig::default(),
            options: TransferOptions::default(),
            confirm: parking_lot::Mutex::new(None),
        }
    }

    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_parallelism(mut self, parallel: ParallelismConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Confirmation adapter forwarded to the nested backup/restore
    /// managers (full-backup style steps need the device-side prompt).
    pub fn set_confirm(&self, confirm: Arc<dyn ConfirmAdapter>) {
        self.op.set_confirm(Arc::clone(&confirm));
        *self.confirm.lock() = Some(confirm);
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    // ------------------------------------------------------------------
    // Pre-flight
    // ------------------------------------------------------------------

    /// Both devices present, distinct and in the connected state.
    pub async fn validate(
        &self,
        source: &str,
        target: &str,
    ) -> Result<(Device, Device), OperationError> {
        if source == target {
            return Err(OperationError::Validation(
                "source and target cannot be the same device".to_string(),
            ));
        }
        let devices = self.bridge.enumerate().await?;
        let by_serial: HashMap<&str, &Device> =
            devices.iter().map(|d| (d.serial.as_str(), d)).collect();

        let mut checked = Vec::with_capacity(2);
        for (role, serial) in [("source", source), ("target", target)] {
            let device = by_serial.get(serial).ok_or_else(|| {
                OperationError::Validation(format!("{} device {} not connected", role, serial))
            })?;
            if device.state != DeviceState::Connected {
                return Err(OperationError::Validation(format!(
                    "{} device state: {} (expected connected)",
                    role, device.state
                )));
            }
            checked.push((*device).clone());
        }
        let target_device = checked.pop().unwrap_or_else(|| Device::new(target, DeviceState::Connected));
        let source_device = checked.pop().unwrap_or_else(|| Device::new(source, DeviceState::Connected));
        Ok((source_device, target_device))
    }

    // ------------------------------------------------------------------
    // Category transfer
    // ------------------------------------------------------------------

    /// Move the selected categories from source to target through nested
    /// backup→restore steps. Single-step failure never aborts the rest.
    pub async fn transfer(
        &self,
        source: &str,
        target: &str,
        plan: &TransferPlan,
    ) -> Result<Phase, OperationError> {
        self.op.begin();
        let (source_device, target_device) = self.validate(source, target).await?;
        tracing::info!(
            source = %source_device.friendly_name(),
            target = %target_device.friendly_name(),
            "starting transfer"
        );

        let (backup, restore) = self.nested_managers(&source_device, &target_device)?;

        let mut steps: Vec<&str> = Vec::new();
        if plan.apps {
            steps.push("apps");
        }
        if plan.files {
            steps.push("files");
        }
        if plan.contacts {
            steps.push("contacts");
        }
        if plan.sms {
            steps.push("sms");
        }
        if plan.messaging {
            steps.push("messaging");
        }
        if !plan.unsynced_packages.is_empty() {
            steps.push("unsynced_apps");
        }
        if !plan.custom_paths.is_empty() {
            steps.push("custom");
        }
        let total = steps.len() as u64;

        for (idx, step) in steps.iter().enumerate() {
            if self.op.is_cancelled() {
                break;
            }
            let lo = idx as f64 / total.max(1) as f64 * 100.0;
            let mid = (idx as f64 + 0.5) / total.max(1) as f64 * 100.0;
            self.emit_step(Phase::BackingUp, step, idx as u64, total, lo);
            let result = self
                .run_step(step, source, target, plan, &backup, &restore, mid)
                .await;
            if let Err(err) = result {
                self.op.record_error(format!("{}: {}", step, err));
            }
            self.adopt_nested_errors(&backup, &restore);
        }

        let phase = self.op.emit_terminal();
        tracing::info!(%phase, errors = self.op.errors().len(), "transfer finished");
        Ok(phase)
    }

    /// Full clone through the category pipeline: everything movable.
    pub async fn clone_device(&self, source: &str, target: &str) -> Result<Phase, OperationError> {
        self.transfer(source, target, &TransferPlan::everything()).await
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_step(
        &self,
        step: &str,
        source: &str,
        target: &str,
        plan: &TransferPlan,
        backup: &BackupManager<B>,
        restore: &RestoreManager<B>,
        restore_percent: f64,
    ) -> Result<(), OperationError> {
        match step {
            "apps" => {
                let manifest = backup.backup_apps(source, plan.app_data, None).await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                let (installed, count) = restore
                    .restore_apps(target, &manifest.backup_id, None, plan.app_data)
                    .await?;
                if installed < count {
                    self.op
                        .record_error(format!("apps: {}/{} installed", installed, count));
                }
            }
            "files" => {
                let manifest = backup
                    .backup_files(source, &plan.categories, &plan.custom_paths)
                    .await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                if manifest.file_count > 0 {
                    restore.restore_files(target, &manifest.backup_id).await?;
                }
            }
            "contacts" => {
                let manifest = backup.backup_contacts(source).await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                if restore
                    .restore_contacts(target, &manifest.backup_id)
                    .await?
                    .is_none()
                {
                    self.op
                        .record_error("contacts restore may be incomplete".to_string());
                }
            }
            "sms" => {
                let manifest = backup.backup_sms(source).await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                if restore.restore_sms(target, &manifest.backup_id).await?.is_none() {
                    self.op
                        .record_error("sms restore may be incomplete".to_string());
                }
            }
            "messaging" => {
                let keys = (!plan.messaging_keys.is_empty()).then_some(plan.messaging_keys.as_slice());
                let manifest = backup.backup_messaging(source, keys).await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                if manifest.file_count > 0 {
                    restore.restore_messaging(target, &manifest.backup_id).await?;
                }
            }
            "unsynced_apps" => {
                let manifest = backup
                    .backup_unsynced(source, &plan.unsynced_packages)
                    .await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                restore.restore_unsynced(target, &manifest.backup_id).await?;
            }
            "custom" => {
                let manifest = backup.backup_custom(source, &plan.custom_paths).await?;
                self.emit_step(Phase::Restoring, step, 0, 0, restore_percent);
                if manifest.file_count > 0 {
                    restore.restore_custom(target, &manifest.backup_id).await?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Full-storage clone
    // ------------------------------------------------------------------

    /// Clone the whole storage tree, then the side-channel data.
    pub async fn clone_full_storage(
        &self,
        source: &str,
        target: &str,
        storage_path: &str,
    ) -> Result<CloneReport, OperationError> {
        self.op.begin();
        let mut report = CloneReport::default();
        let (source_device, target_device) = self.validate(source, target).await?;
        tracing::info!(
            source = %source_device.friendly_name(),
            target = %target_device.friendly_name(),
            storage_path,
            "full storage clone"
        );

        // 1. Index the source
        self.op.emit(OperationProgress {
            phase: Phase::Indexing,
            sub_phase: "internal storage".to_string(),
            source_device: source_device.friendly_name(),
            target_device: target_device.friendly_name(),
            ..Default::default()
        });
        let spec = ScanSpec {
            filters: FilterOptions {
                ignore_cache: self.options.ignore_cache,
                ignore_thumbnails: self.options.ignore_thumbnails,
            },
            max_depth: 12,
            ..Default::default()
        };
        let op = self.op.clone();
        let scan_progress = move |label: &str, _pct: f64| {
            op.emit(OperationProgress {
                phase: Phase::Indexing,
                current_item: label.to_string(),
                ..Default::default()
            });
        };
        let files = index_adaptive(
            &self.bridge,
            source,
            &[storage_path.to_string()],
            &spec,
            &self.op.cancel_token(),
            &scan_progress,
        )
        .await;
        report.indexed = files.len() as u64;
        tracing::info!(files = report.indexed, "indexed source storage");
        if files.is_empty() {
            self.op
                .record_error(format!("no files found under {}", storage_path));
        }

        // 2. Pull into the staging tree (0–50 %)
        let staging =
            StagingArea::create(&self.work_dir).map_err(mdt_storage::StoreError::from)?;
        let pull = pull_with_progress(
            &self.bridge,
            source,
            &self.op,
            &files,
            staging.storage_root(),
            &self.parallel,
            BatchSpec {
                phase: Phase::BackingUp,
                sub_phase: "internal storage".to_string(),
                strip_prefix: storage_path.to_string(),
                pct_range: (0.0, 50.0),
            },
        )
        .await;
        report.pulled = pull.succeeded;

        // 3. Push to the target (50–80 %)
        let mut push_pairs: Vec<(PathBuf, String)> = Vec::new();
        for staged in staging.staged_files() {
            if let Some(remote) = staging.remote_path(storage_path, &staged) {
                push_pairs.push((staged, remote));
            }
        }
        if !self.op.is_cancelled() {
            let push = push_with_progress(
                &self.bridge,
                target,
                &self.op,
                &push_pairs,
                &self.parallel,
                BatchSpec {
                    phase: Phase::Restoring,
                    sub_phase: "internal storage".to_string(),
                    pct_range: (50.0, 80.0),
                    ..Default::default()
                },
            )
            .await;
            report.pushed = push.succeeded;
        }

        // 4. Verify (80–90 %): local SHA-256 in parallel, remote in
        // batches; mismatches are reported, never fatal
        if self.options.verify_checksums && report.pushed > 0 && !self.op.is_cancelled() {
            self.op.emit(OperationProgress {
                phase: Phase::Verifying,
                sub_phase: "checksums".to_string(),
                percent: 80.0,
                ..Default::default()
            });
            let (matched, mismatched) = self.verify_clone(target, &push_pairs).await;
            report.verified_matched = matched;
            report.verified_mismatched = mismatched;
            if mismatched > 0 {
                self.op.record_error(format!(
                    "verification: {} of {} files with differing checksums",
                    mismatched,
                    matched + mismatched
                ));
            }
            self.op.emit(OperationProgress {
                phase: Phase::Verifying,
                sub_phase: "checksums".to_string(),
                items_done: matched,
                items_total: matched + mismatched,
                percent: 90.0,
                ..Default::default()
            });
        }

        // 5. Side-channel data (90–100 %)
        if !self.op.is_cancelled() {
            let nested_dir = staging.side_channel_dir();
            let backup_store = BackupStore::open(&nested_dir)?;
            let backup = BackupManager::new(self.bridge.clone(), backup_store.clone());
            let restore = RestoreManager::new(self.bridge.clone(), backup_store);
            if let Some(confirm) = self.confirm.lock().clone() {
                backup.operation().set_confirm(Arc::clone(&confirm));
                restore.operation().set_confirm(confirm);
            }

            let side_steps = ["apps", "contacts", "sms", "messaging"];
            let span = 10.0 / side_steps.len() as f64;
            for (idx, step) in side_steps.iter().enumerate() {
                if self.op.is_cancelled() {
                    break;
                }
                let base = 90.0 + idx as f64 * span;
                self.op.emit(OperationProgress {
                    phase: Phase::BackingUp,
                    sub_phase: step.to_string(),
                    percent: base,
                    ..Default::default()
                });
                let plan = TransferPlan {
                    app_data: true,
                    ..TransferPlan::default()
                };
                let result = self
                    .run_step(step, source, target, &plan, &backup, &restore, base + span / 2.0)
                    .await;
                if let Err(err) = result {
                    self.op.record_error(format!("{}: {}", step, err));
                }
                self.adopt_nested_errors(&backup, &restore);
            }
        }

        report.errors = self.op.errors();
        report.phase = self.op.emit_terminal();
        tracing::info!(
            pulled = report.pulled,
            pushed = report.pushed,
            mismatched = report.verified_mismatched,
            phase = %report.phase,
            "full storage clone finished"
        );
        Ok(report)
    }

    /// Compare local staged checksums against the target's `sha256sum`.
    async fn verify_clone(&self, target: &str, pairs: &[(PathBuf, String)]) -> (u64, u64) {
        // Local digests, bounded parallel hashing off the async runtime
        let semaphore = Arc::new(Semaphore::new(HASH_WORKERS));
        let mut tasks = JoinSet::new();
        for (local, remote) in pairs.iter().cloned() {
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return None;
                };
                tokio::task::spawn_blocking(move || {
                    hash_file(&local).map(|digest| (remote, digest))
                })
                .await
                .ok()
                .flatten()
            });
        }
        let mut local_hashes: HashMap<String, String> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some((remote, digest))) = joined {
                local_hashes.insert(remote, digest);
            }
        }

        let remote_paths: Vec<String> = pairs.iter().map(|(_, r)| r.clone()).collect();
        let remote_hashes = self
            .bridge
            .sha256_batched(target, &remote_paths, VERIFY_BATCH)
            .await;

        let mut matched = 0u64;
        let mut mismatched = 0u64;
        for (remote, local_digest) in &local_hashes {
            match remote_hashes.get(remote) {
                Some(remote_digest) if remote_digest == local_digest => matched += 1,
                _ => {
                    tracing::warn!(remote, "checksum mismatch after push");
                    mismatched += 1;
                }
            }
        }
        (matched, mismatched)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn nested_managers(
        &self,
        source_device: &Device,
        target_device: &Device,
    ) -> Result<(BackupManager<B>, RestoreManager<B>), OperationError> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let dir = self.work_dir.join(format!("transfer_{}", stamp));
        let store = BackupStore::open(&dir)?;
        let backup = BackupManager::new(self.bridge.clone(), store.clone())
            .with_parallelism(self.parallel.clone());
        let restore = RestoreManager::new(self.bridge.clone(), store);
        // Relay nested progress into this operation's sink with device
        // labels attached
        let outer = self.op.clone();
        let source_label = source_device.friendly_name();
        let target_label = target_device.friendly_name();
        let relay: ProgressSink = Arc::new(move |mut progress: OperationProgress| {
            if progress.phase.is_terminal() {
                // Terminal phases belong to the outer workflow alone
                return;
            }
            progress.source_device = source_label.clone();
            progress.target_device = target_label.clone();
            outer.emit(progress);
        });
        backup.operation().set_progress_sink(Arc::clone(&relay));
        restore.operation().set_progress_sink(relay);
        if let Some(confirm) = self.confirm.lock().clone() {
            backup.operation().set_confirm(Arc::clone(&confirm));
            restore.operation().set_confirm(confirm);
        }
        Ok((backup, restore))
    }

    fn emit_step(&self, phase: Phase, step: &str, done: u64, total: u64, percent: f64) {
        self.op.emit(OperationProgress {
            phase,
            sub_phase: step.to_string(),
            items_done: done,
            items_total: total,
            percent: percent.clamp(0.0, 100.0),
            ..Default::default()
        });
    }

    /// Surface errors the nested managers accumulated into this
    /// operation's list (skipping strings already recorded).
    fn adopt_nested_errors(&self, backup: &BackupManager<B>, restore: &RestoreManager<B>) {
        let mut nested = backup.operation().errors();
        nested.extend(restore.operation().errors());
        let seen = self.op.errors();
        for error in nested {
            if !seen.contains(&error) {
                self.op.record_error(error);
            }
        }
    }
}

/// Streaming SHA-256 of a local file.
fn hash_file(path: &Path) -> Option<String> {
    let mut file = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).ok()?;
    Some(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "transfer_tests.rs"]
mod tests;
