// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed operations over the bridge's on-device shell vocabulary.
//!
//! Parsers here must tolerate malformed output — field boundaries from
//! `ls`, `stat` and `dumpsys` vary across OEMs and OS versions, and
//! discarding one bad line beats refusing the whole listing.

use super::{shell_quote, Bridge};
use crate::subprocess::{INSTALL_MULTIPLE_TIMEOUT, INSTALL_TIMEOUT, SHELL_TIMEOUT};
use async_trait::async_trait;
use mdt_core::{Device, DeviceState};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

const DU_TIMEOUT: Duration = Duration::from_secs(60);
const HASH_TIMEOUT: Duration = Duration::from_secs(120);

/// Chunk size for batched remote `mkdir -p`.
const MKDIR_BATCH: usize = 50;

/// Typed helpers shared by every manager. Blanket-implemented for all
/// bridges so the fake gets them for free.
#[async_trait]
pub trait BridgeOps: Bridge {
    /// Populate detailed properties for a device.
    async fn device_details(&self, serial: &str) -> Device {
        let mut device = Device::new(serial, DeviceState::Connected);
        device.model = self.getprop(serial, "ro.product.model").await;
        device.manufacturer = self.getprop(serial, "ro.product.manufacturer").await;
        device.os_version = self.getprop(serial, "ro.build.version.release").await;
        device.sdk_version = self.getprop(serial, "ro.build.version.sdk").await;
        device.product = self.getprop(serial, "ro.product.name").await;

        let battery = self.run_shell(serial, "dumpsys battery", SHELL_TIMEOUT).await;
        for line in battery.lines() {
            if let Some(value) = line.trim().strip_prefix("level:") {
                if let Ok(level) = value.trim().parse() {
                    device.battery_level = level;
                }
                break;
            }
        }

        // df output: header line, then "<fs> <total> <used> <free> ..." in KB
        let df = self.run_shell(serial, "df /data", SHELL_TIMEOUT).await;
        if let Some(line) = df.lines().nth(1) {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() >= 4 {
                device.storage_total = cols[1].parse::<u64>().unwrap_or(0) * 1024;
                device.storage_free = cols[3].parse::<u64>().unwrap_or(0) * 1024;
            }
        }
        device
    }

    async fn getprop(&self, serial: &str, prop: &str) -> String {
        self.run_shell(serial, &format!("getprop {}", prop), SHELL_TIMEOUT)
            .await
            .trim()
            .to_string()
    }

    /// Installed package identifiers (`pm list packages`).
    async fn list_packages(&self, serial: &str, third_party: bool) -> Vec<String> {
        let flag = if third_party { " -3" } else { "" };
        let out = self
            .run_shell(serial, &format!("pm list packages{}", flag), SHELL_TIMEOUT)
            .await;
        out.lines()
            .filter_map(|line| line.trim().strip_prefix("package:"))
            .map(str::to_string)
            .collect()
    }

    /// All APK paths for a package: base plus splits.
    async fn apk_paths(&self, serial: &str, package: &str) -> Vec<String> {
        let out = self
            .run_shell(
                serial,
                &format!("pm path {}", shell_quote(package)),
                SHELL_TIMEOUT,
            )
            .await;
        out.lines()
            .filter_map(|line| line.trim().strip_prefix("package:"))
            .map(str::to_string)
            .collect()
    }

    async fn install(&self, serial: &str, apk: &Path) -> bool {
        let apk_str = apk.display().to_string();
        matches!(
            self.run(Some(serial), &["install", "-r", &apk_str], INSTALL_TIMEOUT)
                .await,
            Ok(output) if output.success()
        )
    }

    /// Install a split-APK bundle via `install-multiple`.
    async fn install_multiple(&self, serial: &str, apks: &[String]) -> bool {
        if apks.is_empty() {
            return false;
        }
        let mut args = vec!["install-multiple", "-r"];
        args.extend(apks.iter().map(String::as_str));
        matches!(
            self.run(Some(serial), &args, INSTALL_MULTIPLE_TIMEOUT).await,
            Ok(output) if output.success()
        )
    }

    async fn reboot(&self, serial: &str, mode: Option<&str>) -> bool {
        let mut args = vec!["reboot"];
        if let Some(mode) = mode {
            args.push(mode);
        }
        matches!(
            self.run(Some(serial), &args, SHELL_TIMEOUT).await,
            Ok(output) if output.success()
        )
    }

    /// Ask the package manager to flush every app cache.
    async fn trim_caches(&self, serial: &str) {
        self.run_shell(serial, "pm trim-caches 999999999999", SHELL_TIMEOUT)
            .await;
    }

    async fn remote_dir_exists(&self, serial: &str, path: &str) -> bool {
        let cmd = format!("test -d {} && echo Y || echo N", shell_quote(path));
        self.run_shell(serial, &cmd, Duration::from_secs(5))
            .await
            .starts_with('Y')
    }

    async fn remote_file_size(&self, serial: &str, path: &str) -> Option<u64> {
        let cmd = format!("stat -c '%s' {} 2>/dev/null", shell_quote(path));
        self.run_shell(serial, &cmd, Duration::from_secs(5))
            .await
            .trim()
            .parse()
            .ok()
    }

    /// Pre-create remote directories, 50 per invocation, retrying each
    /// directory individually when a batch fails.
    async fn mkdir_batches(&self, serial: &str, dirs: &[String]) {
        for chunk in dirs.chunks(MKDIR_BATCH) {
            let quoted: Vec<String> = chunk.iter().map(|d| shell_quote(d)).collect();
            let cmd = format!("mkdir -p {}", quoted.join(" "));
            let out = self
                .run(Some(serial), &["shell", &cmd], SHELL_TIMEOUT)
                .await;
            let batch_ok = matches!(out, Ok(ref output) if output.success());
            if !batch_ok {
                for dir in chunk {
                    let single = format!("mkdir -p {}", shell_quote(dir));
                    self.run_shell(serial, &single, SHELL_TIMEOUT).await;
                }
            }
        }
    }

    /// Batched `rm -f`. Returns the number of paths submitted.
    async fn remove_files_batched(&self, serial: &str, paths: &[String], batch: usize) -> usize {
        let mut submitted = 0;
        for chunk in paths.chunks(batch.max(1)) {
            let quoted: Vec<String> = chunk.iter().map(|p| shell_quote(p)).collect();
            let cmd = format!("rm -f {} 2>/dev/null", quoted.join(" "));
            self.run_shell(serial, &cmd, SHELL_TIMEOUT).await;
            submitted += chunk.len();
        }
        submitted
    }

    /// Batched `rm -rf`. Returns the number of paths submitted.
    async fn remove_dirs_batched(&self, serial: &str, paths: &[String], batch: usize) -> usize {
        let mut submitted = 0;
        for chunk in paths.chunks(batch.max(1)) {
            let quoted: Vec<String> = chunk.iter().map(|p| shell_quote(p)).collect();
            let cmd = format!("rm -rf {} 2>/dev/null", quoted.join(" "));
            self.run_shell(serial, &cmd, SHELL_TIMEOUT).await;
            submitted += chunk.len();
        }
        submitted
    }

    /// Best-effort `du -sk` over directories, in batches. Values in bytes.
    async fn du_sizes(&self, serial: &str, dirs: &[String], batch: usize) -> HashMap<String, u64> {
        let mut sizes = HashMap::new();
        for chunk in dirs.chunks(batch.max(1)) {
            let quoted: Vec<String> = chunk.iter().map(|d| shell_quote(d)).collect();
            let cmd = format!("du -sk {} 2>/dev/null", quoted.join(" "));
            let out = self.run_shell(serial, &cmd, DU_TIMEOUT).await;
            for line in out.lines() {
                let mut parts = line.splitn(2, char::is_whitespace);
                let (Some(kb), Some(path)) = (parts.next(), parts.next()) else {
                    continue;
                };
                if let Ok(kb) = kb.trim().parse::<u64>() {
                    sizes.insert(path.trim().to_string(), kb * 1024);
                }
            }
        }
        sizes
    }

    /// Batched `stat -c '%n|%s'` over files. Values in bytes.
    async fn stat_sizes(&self, serial: &str, files: &[String], batch: usize) -> HashMap<String, u64> {
        let mut sizes = HashMap::new();
        for chunk in files.chunks(batch.max(1)) {
            let quoted: Vec<String> = chunk.iter().map(|f| shell_quote(f)).collect();
            let cmd = format!("stat -c '%n|%s' {} 2>/dev/null", quoted.join(" "));
            let out = self.run_shell(serial, &cmd, SHELL_TIMEOUT).await;
            for line in out.lines() {
                let Some((path, size)) = line.trim().rsplit_once('|') else {
                    continue;
                };
                if let Ok(size) = size.parse::<u64>() {
                    sizes.insert(path.to_string(), size);
                }
            }
        }
        sizes
    }

    /// Batched `sha256sum`. Returns path → lowercase hex digest.
    async fn sha256_batched(
        &self,
        serial: &str,
        files: &[String],
        batch: usize,
    ) -> HashMap<String, String> {
        let mut hashes = HashMap::new();
        for chunk in files.chunks(batch.max(1)) {
            let quoted: Vec<String> = chunk.iter().map(|f| shell_quote(f)).collect();
            let cmd = format!("sha256sum {} 2>/dev/null", quoted.join(" "));
            let out = self.run_shell(serial, &cmd, HASH_TIMEOUT).await;
            for line in out.lines() {
                let mut parts = line.trim().splitn(2, char::is_whitespace);
                let (Some(hash), Some(path)) = (parts.next(), parts.next()) else {
                    continue;
                };
                if hash.len() == 64 {
                    hashes.insert(path.trim().to_string(), hash.to_string());
                }
            }
        }
        hashes
    }
}

impl<B: Bridge> BridgeOps for B {}

#[cfg(test)]
#[path = "ops_tests.rs"]
mod tests;
