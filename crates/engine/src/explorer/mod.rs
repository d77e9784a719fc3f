// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device explorer: path resolution, app detection, lazy listing.

pub mod catalog;

pub use catalog::{Risk, CLOUD_SYNCED_PACKAGES, KNOWN_DIRS, MESSAGING_APPS, UNSYNCED_CATALOG};

use mdt_adapters::subprocess::SHELL_TIMEOUT;
use mdt_adapters::{shell_quote, Bridge, BridgeOps};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Resolves logical directory keys to actual on-device paths.
///
/// One combined shell invocation probes every candidate; first match wins
/// per key. Results are cached per serial for the session.
pub struct PathResolver<B: Bridge> {
    bridge: B,
    cache: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
}

impl<B: Bridge> PathResolver<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolve every known key for this device.
    pub async fn resolve_all(&self, serial: &str) -> HashMap<String, String> {
        if let Some(cached) = self.cache.lock().get(serial) {
            return cached.clone();
        }

        let mut probes = Vec::new();
        for dir in KNOWN_DIRS {
            for candidate in dir.candidates {
                probes.push(format!(
                    "test -d {} && echo {}",
                    shell_quote(candidate),
                    shell_quote(&format!("FOUND:{}:{}", dir.key, candidate))
                ));
            }
        }
        let cmd = probes.join(" ; ");
        let out = self
            .bridge
            .run_shell(serial, &cmd, Duration::from_secs(20))
            .await;

        let mut results: HashMap<String, String> = HashMap::new();
        for line in out.lines() {
            let line = line.trim();
            let Some(rest) = line.strip_prefix("FOUND:") else {
                continue;
            };
            let Some((key, path)) = rest.split_once(':') else {
                continue;
            };
            // First match wins per key
            results
                .entry(key.to_string())
                .or_insert_with(|| path.to_string());
        }

        if results.is_empty() {
            // Combined probe can fail on exotic shells; fall back per key
            for dir in KNOWN_DIRS {
                for candidate in dir.candidates {
                    if self.bridge.remote_dir_exists(serial, candidate).await {
                        results.insert(dir.key.to_string(), candidate.to_string());
                        break;
                    }
                }
            }
        }

        self.cache
            .lock()
            .insert(serial.to_string(), results.clone());
        results
    }

    /// Resolve one key, using the session cache.
    pub async fn resolve(&self, serial: &str, key: &str) -> Option<String> {
        self.resolve_all(serial).await.get(key).cloned()
    }
}

/// A messaging app found installed, with its live media paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedMessagingApp {
    pub key: String,
    pub name: String,
    pub installed_packages: Vec<String>,
    pub existing_paths: Vec<String>,
}

/// Detects installed messaging apps and their on-device media trees.
pub struct MessagingDetector<B: Bridge> {
    bridge: B,
}

impl<B: Bridge> MessagingDetector<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub async fn detect(&self, serial: &str) -> Vec<DetectedMessagingApp> {
        let installed: HashSet<String> = self
            .bridge
            .list_packages(serial, true)
            .await
            .into_iter()
            .collect();

        let mut detected = Vec::new();
        for app in MESSAGING_APPS {
            let hits: Vec<String> = app
                .packages
                .iter()
                .filter(|p| installed.contains(**p))
                .map(|p| p.to_string())
                .collect();
            if hits.is_empty() {
                continue;
            }
            let existing = self.existing_paths(serial, app.media_paths).await;
            detected.push(DetectedMessagingApp {
                key: app.key.to_string(),
                name: app.name.to_string(),
                installed_packages: hits,
                existing_paths: existing,
            });
        }
        detected
    }

    /// Which of an app's candidate media paths exist, probed in one call.
    async fn existing_paths(&self, serial: &str, paths: &[&str]) -> Vec<String> {
        let probes: Vec<String> = paths
            .iter()
            .map(|p| {
                format!(
                    "test -d {} && echo {}",
                    shell_quote(p),
                    shell_quote(&format!("EXISTS:{}", p))
                )
            })
            .collect();
        let out = self
            .bridge
            .run_shell(serial, &probes.join(" ; "), Duration::from_secs(10))
            .await;
        out.lines()
            .filter_map(|line| line.trim().strip_prefix("EXISTS:"))
            .map(str::to_string)
            .collect()
    }

    /// Estimated media footprint across `paths`.
    pub async fn backup_size(&self, serial: &str, paths: &[String]) -> u64 {
        self.bridge
            .du_sizes(serial, paths, 20)
            .await
            .values()
            .sum()
    }
}

/// An app holding data that exists nowhere but on this device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsyncedApp {
    pub package: String,
    pub name: String,
    pub category: String,
    pub risk: Risk,
    pub data_bytes: u64,
}

/// Two-pass detector for apps with local-only data.
pub struct UnsyncedDetector<B: Bridge> {
    bridge: B,
    /// Pass-2 floor: smaller data dirs are noise
    pub min_data_bytes: u64,
}

impl<B: Bridge> UnsyncedDetector<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            min_data_bytes: 256 * 1024,
        }
    }

    pub async fn detect(&self, serial: &str) -> Vec<UnsyncedApp> {
        let installed = self.bridge.list_packages(serial, true).await;
        let mut results = Vec::new();
        let mut unknown: Vec<String> = Vec::new();

        // Pass 1: curated catalog
        for package in &installed {
            if let Some(entry) = catalog::catalog_app(package) {
                results.push(UnsyncedApp {
                    package: package.clone(),
                    name: entry.name.to_string(),
                    category: entry.category.to_string(),
                    risk: entry.risk,
                    data_bytes: 0,
                });
            } else if !CLOUD_SYNCED_PACKAGES.contains(&package.as_str()) {
                unknown.push(package.clone());
            }
        }

        // Pass 2: size the data dirs of everything not classified
        if !unknown.is_empty() {
            let data_dirs: Vec<String> = unknown
                .iter()
                .map(|p| format!("/data/data/{}", p))
                .collect();
            let sizes = self.bridge.du_sizes(serial, &data_dirs, 20).await;
            for package in unknown {
                let dir = format!("/data/data/{}", package);
                let bytes = sizes.get(&dir).copied().unwrap_or(0);
                if bytes >= self.min_data_bytes {
                    results.push(UnsyncedApp {
                        package: package.clone(),
                        name: package,
                        category: "unknown".to_string(),
                        risk: Risk::Unknown,
                        data_bytes: bytes,
                    });
                }
            }
        }

        // Highest stakes first, then alphabetical
        results.sort_by(|a, b| a.risk.cmp(&b.risk).then(a.package.cmp(&b.package)));
        results
    }
}

/// One entry of a lazily-listed remote directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

/// List a remote directory via `ls -la`, dropping malformed lines.
pub async fn list_dir<B: Bridge>(bridge: &B, serial: &str, path: &str) -> Vec<RemoteEntry> {
    let cmd = format!("ls -la {} 2>/dev/null", shell_quote(path));
    let out = bridge.run_shell(serial, &cmd, SHELL_TIMEOUT).await;
    out.lines()
        .filter_map(|line| parse_ls_line(line, path))
        .collect()
}

/// Parse one `ls -la` line. OEM `ls` output varies wildly; anything that
/// does not look like a file entry is silently dropped.
pub fn parse_ls_line(line: &str, parent: &str) -> Option<RemoteEntry> {
    let line = line.trim();
    let first = line.chars().next()?;
    if !matches!(first, '-' | 'd' | 'l') {
        return None;
    }
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 6 {
        return None;
    }
    let is_dir = first == 'd';
    // Size column position varies; take the last all-digit field before
    // the date-ish columns as the size for regular files.
    let size = if is_dir {
        0
    } else {
        fields
            .iter()
            .skip(2)
            .filter_map(|f| f.parse::<u64>().ok())
            .next_back()
            .unwrap_or(0)
    };
    // Name is everything after the time field; symlinks keep their target
    let name = fields.last()?.to_string();
    if name == "." || name == ".." {
        return None;
    }
    Some(RemoteEntry {
        path: format!("{}/{}", parent.trim_end_matches('/'), name),
        name,
        is_dir,
        size,
    })
}

#[cfg(test)]
#[path = "explorer_tests.rs"]
mod tests;
