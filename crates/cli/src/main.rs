// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdt - Mobile Device Toolkit CLI

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mdt_adapters::AdbBridge;
use mdt_core::ToolkitConfig;
use mdt_storage::BackupStore;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "mdt",
    version,
    about = "Mobile Device Toolkit - backup, restore and migrate device data"
)]
struct Cli {
    /// Directory holding backups (default: platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    backup_dir: Option<PathBuf>,

    /// Config file path (default: platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected devices
    Devices,
    /// List stored backups
    Backups,
    /// Create a backup
    Backup(commands::BackupArgs),
    /// Restore a backup to a device
    Restore(commands::RestoreArgs),
    /// Delete a stored backup
    DeleteBackup {
        backup_id: String,
    },
    /// Clone one device's full storage onto another
    Clone(commands::CloneArgs),
    /// Transfer selected categories between two devices
    Transfer(commands::TransferArgs),
    /// Find and remove duplicate media files on a device
    Dedup(commands::DedupArgs),
    /// Scan and run the cleanup modes
    Clean(commands::CleanArgs),
    /// List apps whose data exists only on the device
    Unsynced {
        #[arg(short = 'd', long)]
        device: String,
    },
    /// Resolve well-known directories on a device
    Resolve {
        #[arg(short = 'd', long)]
        device: String,
    },
    /// Reboot a device
    Reboot {
        #[arg(short = 'd', long)]
        device: String,
        /// Optional mode: recovery or bootloader
        #[arg(long)]
        mode: Option<String>,
    },
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn default_backup_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdt")
        .join("backups")
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mdt")
        .join("config.toml")
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = ToolkitConfig::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let bridge = AdbBridge::discover(&base_dir)
        .context("adb not found: install platform-tools or add adb to PATH")?;
    bridge.start_server().await.ok();

    let store_dir = cli.backup_dir.clone().unwrap_or_else(default_backup_dir);
    let store = BackupStore::open(&store_dir)
        .with_context(|| format!("opening backup store at {}", store_dir.display()))?;

    match cli.command {
        Commands::Devices => commands::devices(&bridge).await,
        Commands::Backups => commands::backups(&store),
        Commands::Backup(args) => commands::backup(&bridge, &store, &config, args).await,
        Commands::Restore(args) => commands::restore(&bridge, &store, args).await,
        Commands::DeleteBackup { backup_id } => commands::delete_backup(&store, &backup_id),
        Commands::Clone(args) => commands::clone(&bridge, &store_dir, &config, args).await,
        Commands::Transfer(args) => commands::transfer(&bridge, &store_dir, &config, args).await,
        Commands::Dedup(args) => commands::dedup(&bridge, &config, args).await,
        Commands::Clean(args) => commands::clean(&bridge, args).await,
        Commands::Unsynced { device } => commands::unsynced(&bridge, &device).await,
        Commands::Resolve { device } => commands::resolve(&bridge, &device).await,
        Commands::Reboot { device, mode } => commands::reboot(&bridge, &device, mode.as_deref()).await,
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {}", err);
            std::process::exit(1);
        }
    };
    match runtime.block_on(run(cli)) {
        Ok(()) => {}
        Err(err) => {
            eprintln!("error: {:#}", err);
            std::process::exit(1);
        }
    }
}
