// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subcommand implementations

use crate::output::progress_sink;
use anyhow::{bail, Context, Result};
use clap::Args;
use mdt_adapters::{AdbBridge, Bridge, BridgeOps, NoopConfirm};
use mdt_core::{format_bytes, ToolkitConfig};
use mdt_engine::{
    BackupManager, CleanupEngine, CleanupMode, DedupEngine, DedupOptions, FileCategory,
    MessagingDetector, PathResolver, RestoreManager, TransferManager, TransferPlan,
    UnsyncedDetector,
};
use mdt_storage::BackupStore;
use std::path::Path;
use std::sync::Arc;

pub async fn devices(bridge: &AdbBridge) -> Result<()> {
    let devices = bridge.enumerate().await.context("enumerating devices")?;
    if devices.is_empty() {
        bail!("no devices connected");
    }
    for listed in devices {
        let device = if listed.state == mdt_core::DeviceState::Connected {
            let mut detailed = bridge.device_details(&listed.serial).await;
            if detailed.model.is_empty() {
                detailed.model = listed.model.clone();
            }
            detailed
        } else {
            listed
        };
        println!("{}  {}  {}", device.serial, device.state, device.short_label());
    }
    Ok(())
}

pub fn backups(store: &BackupStore) -> Result<()> {
    let manifests = store.list();
    if manifests.is_empty() {
        println!("no backups in {}", store.root().display());
        return Ok(());
    }
    for manifest in manifests {
        println!(
            "{}  {}  {}  files={} apps={}",
            manifest.backup_id,
            manifest.backup_type,
            format_bytes(manifest.size_bytes),
            manifest.file_count,
            manifest.app_count,
        );
    }
    Ok(())
}

pub fn delete_backup(store: &BackupStore, backup_id: &str) -> Result<()> {
    store
        .delete(backup_id)
        .with_context(|| format!("deleting {}", backup_id))?;
    println!("deleted {}", backup_id);
    Ok(())
}

// ---------------------------------------------------------------------
// Backup
// ---------------------------------------------------------------------

#[derive(Args)]
pub struct BackupArgs {
    /// Device serial
    #[arg(short = 'd', long)]
    pub device: String,
    /// What to back up: full, files, apps, contacts, sms, messaging,
    /// unsynced, custom
    pub kind: String,
    /// File categories for `files` (photos, videos, music, documents)
    #[arg(long, value_delimiter = ',')]
    pub categories: Vec<String>,
    /// Remote paths for `custom` (repeatable)
    #[arg(long)]
    pub path: Vec<String>,
    /// Packages for `unsynced` (repeatable)
    #[arg(long)]
    pub package: Vec<String>,
    /// Include app data in the `apps` backup (device confirmation needed)
    #[arg(long)]
    pub with_data: bool,
}

fn parse_categories(names: &[String]) -> Result<Vec<FileCategory>> {
    if names.is_empty() {
        return Ok(vec![
            FileCategory::Photos,
            FileCategory::Videos,
            FileCategory::Music,
            FileCategory::Documents,
        ]);
    }
    names
        .iter()
        .map(|name| match name.as_str() {
            "photos" => Ok(FileCategory::Photos),
            "videos" => Ok(FileCategory::Videos),
            "music" => Ok(FileCategory::Music),
            "documents" => Ok(FileCategory::Documents),
            "internal" => Ok(FileCategory::Internal),
            other => bail!("unknown category: {}", other),
        })
        .collect()
}

pub async fn backup(
    bridge: &AdbBridge,
    store: &BackupStore,
    config: &ToolkitConfig,
    args: BackupArgs,
) -> Result<()> {
    let manager = BackupManager::new(bridge.clone(), store.clone())
        .with_parallelism(config.parallelism.clone());
    manager.operation().set_progress_sink(progress_sink());
    manager.operation().set_confirm(Arc::new(NoopConfirm::new()));

    let manifest = match args.kind.as_str() {
        "full" => manager.backup_full(&args.device, Default::default()).await?,
        "files" => {
            let categories = parse_categories(&args.categories)?;
            manager
                .backup_files(&args.device, &categories, &args.path)
                .await?
        }
        "apps" => manager.backup_apps(&args.device, args.with_data, None).await?,
        "contacts" => manager.backup_contacts(&args.device).await?,
        "sms" => manager.backup_sms(&args.device).await?,
        "messaging" => manager.backup_messaging(&args.device, None).await?,
        "unsynced" => {
            if args.package.is_empty() {
                bail!("--package required for unsynced backups");
            }
            manager.backup_unsynced(&args.device, &args.package).await?
        }
        "custom" => {
            if args.path.is_empty() {
                bail!("--path required for custom backups");
            }
            manager.backup_custom(&args.device, &args.path).await?
        }
        other => bail!("unknown backup kind: {}", other),
    };

    println!(
        "backup {} created ({})",
        manifest.backup_id,
        format_bytes(manifest.size_bytes)
    );
    let errors = manager.operation().errors();
    if !errors.is_empty() {
        println!("completed with {} errors (see log)", errors.len());
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------

#[derive(Args)]
pub struct RestoreArgs {
    /// Target device serial
    #[arg(short = 'd', long)]
    pub device: String,
    /// Backup id to restore
    pub backup_id: String,
    /// Restrict an apps restore to these packages (repeatable)
    #[arg(long)]
    pub package: Vec<String>,
    /// Also restore app data where available
    #[arg(long)]
    pub with_data: bool,
}

pub async fn restore(bridge: &AdbBridge, store: &BackupStore, args: RestoreArgs) -> Result<()> {
    let manager = RestoreManager::new(bridge.clone(), store.clone());
    manager.operation().set_progress_sink(progress_sink());
    manager.operation().set_confirm(Arc::new(NoopConfirm::new()));

    let manifest = manager.manifest(&args.backup_id)?;
    use mdt_core::BackupKind;
    match manifest.backup_type {
        BackupKind::Full => {
            manager.restore_full(&args.device, &args.backup_id).await?;
        }
        BackupKind::Files => {
            manager.restore_files(&args.device, &args.backup_id).await?;
        }
        BackupKind::Custom => {
            manager.restore_custom(&args.device, &args.backup_id).await?;
        }
        BackupKind::Apps => {
            let selected = (!args.package.is_empty()).then_some(args.package.as_slice());
            let (installed, total) = manager
                .restore_apps(&args.device, &args.backup_id, selected, args.with_data)
                .await?;
            println!("installed {}/{} apps", installed, total);
        }
        BackupKind::Contacts => {
            match manager.restore_contacts(&args.device, &args.backup_id).await? {
                Some(method) => println!("contacts restored via {}", method),
                None => println!("contacts restore incomplete; see log"),
            }
        }
        BackupKind::Sms => match manager.restore_sms(&args.device, &args.backup_id).await? {
            Some(method) => println!("messages restored via {}", method),
            None => println!("sms restore incomplete; see log"),
        },
        BackupKind::Messaging => {
            manager
                .restore_messaging(&args.device, &args.backup_id)
                .await?;
        }
        BackupKind::UnsyncedApps => {
            manager
                .restore_unsynced(&args.device, &args.backup_id)
                .await?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Clone / transfer
// ---------------------------------------------------------------------

#[derive(Args)]
pub struct CloneArgs {
    /// Source device serial
    #[arg(long)]
    pub from: String,
    /// Target device serial
    #[arg(long)]
    pub to: String,
    /// Storage root to clone
    #[arg(long, default_value = mdt_engine::transfer::DEFAULT_STORAGE_PATH)]
    pub storage_path: String,
}

pub async fn clone(
    bridge: &AdbBridge,
    work_dir: &Path,
    config: &ToolkitConfig,
    args: CloneArgs,
) -> Result<()> {
    let manager = TransferManager::new(bridge.clone(), work_dir.join("transfers"))
        .with_options(config.transfer.clone())
        .with_parallelism(config.parallelism.clone());
    manager.operation().set_progress_sink(progress_sink());
    manager.set_confirm(Arc::new(NoopConfirm::new()));

    let report = manager
        .clone_full_storage(&args.from, &args.to, &args.storage_path)
        .await?;
    println!(
        "clone finished: indexed={} pulled={} pushed={} verified={}/{} phase={}",
        report.indexed,
        report.pulled,
        report.pushed,
        report.verified_matched,
        report.verified_matched + report.verified_mismatched,
        report.phase,
    );
    if !report.errors.is_empty() {
        bail!("clone completed with {} errors", report.errors.len());
    }
    Ok(())
}

#[derive(Args)]
pub struct TransferArgs {
    #[arg(long)]
    pub from: String,
    #[arg(long)]
    pub to: String,
    /// Skip APK transfer
    #[arg(long)]
    pub no_apps: bool,
    /// Skip media files
    #[arg(long)]
    pub no_files: bool,
    /// Skip contacts
    #[arg(long)]
    pub no_contacts: bool,
    /// Skip SMS
    #[arg(long)]
    pub no_sms: bool,
    /// Include messaging-app media
    #[arg(long)]
    pub messaging: bool,
}

pub async fn transfer(
    bridge: &AdbBridge,
    work_dir: &Path,
    config: &ToolkitConfig,
    args: TransferArgs,
) -> Result<()> {
    let manager = TransferManager::new(bridge.clone(), work_dir.join("transfers"))
        .with_options(config.transfer.clone())
        .with_parallelism(config.parallelism.clone());
    manager.operation().set_progress_sink(progress_sink());
    manager.set_confirm(Arc::new(NoopConfirm::new()));

    let plan = TransferPlan {
        apps: !args.no_apps,
        files: !args.no_files,
        contacts: !args.no_contacts,
        sms: !args.no_sms,
        messaging: args.messaging,
        ..Default::default()
    };
    let phase = manager.transfer(&args.from, &args.to, &plan).await?;
    println!("transfer finished: {}", phase);
    Ok(())
}

// ---------------------------------------------------------------------
// Dedup
// ---------------------------------------------------------------------

#[derive(Args)]
pub struct DedupArgs {
    #[arg(short = 'd', long)]
    pub device: String,
    /// Detect only; delete nothing
    #[arg(long)]
    pub dry_run: bool,
    /// Scan roots (repeatable; defaults to the media directories)
    #[arg(long)]
    pub root: Vec<String>,
    /// Minimum file size in bytes
    #[arg(long)]
    pub min_size: Option<u64>,
}

pub async fn dedup(bridge: &AdbBridge, config: &ToolkitConfig, args: DedupArgs) -> Result<()> {
    let engine = DedupEngine::new(bridge.clone(), &args.device);
    engine.operation().set_progress_sink(progress_sink());

    let mut options = DedupOptions {
        dry_run: args.dry_run,
        min_size: args.min_size.unwrap_or(config.dedup.min_size_bytes),
        max_depth: config.dedup.max_depth,
        ..Default::default()
    };
    if !args.root.is_empty() {
        options.roots = args.root.clone();
    }

    let report = engine.run(&options).await;
    println!(
        "scanned {} files; {} duplicate groups; {} duplicates{}; ~{} freed",
        report.files_scanned,
        report.confirmed_groups,
        report.duplicates_found,
        if args.dry_run { " (dry-run)" } else { "" },
        format_bytes(report.bytes_freed),
    );
    for kept in &report.kept_originals {
        println!("  keep {}", kept);
    }
    if args.dry_run {
        for planned in &report.planned_deletions {
            println!("  would remove {} ({})", planned.path, format_bytes(planned.size));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Cleanup
// ---------------------------------------------------------------------

#[derive(Args)]
pub struct CleanArgs {
    #[arg(short = 'd', long)]
    pub device: String,
    /// Modes to run (default: all). app_cache, junk_dirs, junk_files,
    /// known_junk, orphans, duplicates
    #[arg(long, value_delimiter = ',')]
    pub modes: Vec<String>,
    /// Estimate only; delete nothing
    #[arg(long)]
    pub scan_only: bool,
}

fn parse_modes(names: &[String]) -> Result<Vec<CleanupMode>> {
    if names.is_empty() {
        return Ok(CleanupMode::ORDER.to_vec());
    }
    names
        .iter()
        .map(|name| match name.as_str() {
            "app_cache" => Ok(CleanupMode::AppCache),
            "junk_dirs" => Ok(CleanupMode::JunkDirs),
            "junk_files" => Ok(CleanupMode::JunkFiles),
            "known_junk" => Ok(CleanupMode::KnownJunk),
            "orphans" => Ok(CleanupMode::Orphans),
            "duplicates" => Ok(CleanupMode::Duplicates),
            other => bail!("unknown cleanup mode: {}", other),
        })
        .collect()
}

pub async fn clean(bridge: &AdbBridge, args: CleanArgs) -> Result<()> {
    let engine = CleanupEngine::new(bridge.clone());
    let modes = parse_modes(&args.modes)?;

    let estimates = engine.estimate(&args.device, &modes).await;
    for mode in &modes {
        let Some(estimate) = estimates.get(mode) else {
            continue;
        };
        match &estimate.error {
            Some(error) => println!("{:<12} refused: {}", mode.to_string(), error),
            None => println!(
                "{:<12} {} items, {}",
                mode.to_string(),
                estimate.total_items,
                format_bytes(estimate.total_bytes)
            ),
        }
    }
    if args.scan_only {
        return Ok(());
    }

    let results = engine.execute(&args.device, &estimates).await;
    let mut freed = 0u64;
    for (mode, result) in &results {
        freed += result.bytes_freed;
        println!(
            "{:<12} removed {} items ({})",
            mode.to_string(),
            result.items_removed,
            format_bytes(result.bytes_freed)
        );
    }
    println!("total freed: ~{}", format_bytes(freed));
    Ok(())
}

// ---------------------------------------------------------------------
// Explorer helpers
// ---------------------------------------------------------------------

pub async fn unsynced(bridge: &AdbBridge, device: &str) -> Result<()> {
    let detector = UnsyncedDetector::new(bridge.clone());
    let apps = detector.detect(device).await;
    if apps.is_empty() {
        println!("no apps with local-only data detected");
        return Ok(());
    }
    for app in apps {
        println!(
            "{:<9} {:<40} {} ({})",
            app.risk.to_string(),
            app.package,
            app.name,
            format_bytes(app.data_bytes)
        );
    }
    Ok(())
}

pub async fn resolve(bridge: &AdbBridge, device: &str) -> Result<()> {
    let resolver = PathResolver::new(bridge.clone());
    let resolved = resolver.resolve_all(device).await;
    let mut keys: Vec<_> = resolved.keys().collect();
    keys.sort();
    for key in keys {
        println!("{:<18} {}", key, resolved[key]);
    }

    let detector = MessagingDetector::new(bridge.clone());
    for app in detector.detect(device).await {
        println!(
            "messaging: {} ({} media paths)",
            app.name,
            app.existing_paths.len()
        );
    }
    Ok(())
}

pub async fn reboot(bridge: &AdbBridge, device: &str, mode: Option<&str>) -> Result<()> {
    if let Some(mode) = mode {
        if !matches!(mode, "recovery" | "bootloader") {
            bail!("unknown reboot mode: {}", mode);
        }
    }
    if !BridgeOps::reboot(bridge, device, mode).await {
        bail!("reboot command failed");
    }
    Ok(())
}
