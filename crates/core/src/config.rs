// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-side configuration, persisted as TOML.
//!
//! A missing file yields defaults; unknown keys are ignored so older
//! binaries can read newer files.

use crate::parallel::ParallelismConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Bridge-facing knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Device-registry poll interval in seconds
    pub poll_interval_seconds: f64,
    /// Shell command timeout in seconds
    pub shell_timeout_seconds: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 2.0,
            shell_timeout_seconds: 60,
        }
    }
}

/// Transfer / clone options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub verify_checksums: bool,
    pub ignore_cache: bool,
    pub ignore_thumbnails: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
            ignore_cache: true,
            ignore_thumbnails: true,
        }
    }
}

/// Dedup engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Files smaller than this are never considered
    pub min_size_bytes: u64,
    pub max_depth: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1024,
            max_depth: 10,
        }
    }
}

/// Top-level toolkit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub bridge: BridgeConfig,
    pub transfer: TransferConfig,
    pub dedup: DedupConfig,
    pub parallelism: ParallelismConfig,
}

impl ToolkitConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
        Ok(())
    }
}
