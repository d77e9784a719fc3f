// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Modular device cleanup: estimate → review → execute.
//!
//! Each mode scans independently (a dry-run that prices what it would
//! free) and executes only what a previous scan nominated. Scans of
//! independent modes run concurrently, capped at three workers so they
//! queue politely behind the single bridge serialization lock.
//!
//! Orphan removal is gated hard: deleting a live app's directories is
//! catastrophic, so the installed-package list must pass a minimum-size
//! check, a canary-package check and a `pm path` spot-check before any
//! orphan is even nominated. A failed gate yields a clean zero-deletion
//! estimate, not an error.

use crate::dedup::{DedupEngine, DedupOptions};
use mdt_adapters::subprocess::SHELL_TIMEOUT;
use mdt_adapters::{shell_quote, Bridge, BridgeOps};
use mdt_core::{canonical_remote, format_bytes, is_package_name, CancelToken};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Concurrent mode scans; more would just pile up on the bridge lock.
const SCAN_WORKERS: usize = 3;
/// Packages sampled by `du` to extrapolate total app-cache size.
const APP_CACHE_SAMPLE: usize = 50;
/// Reject installed-package lists smaller than this; even stripped ROMs
/// carry more.
const MIN_PACKAGES_THRESHOLD: usize = 15;

/// System packages that must exist on any real device. Used as canaries
/// for the installed-package list.
const CANARY_PACKAGES: &[&str] = &[
    "android",
    "com.android.settings",
    "com.android.systemui",
    "com.android.phone",
    "com.android.providers.settings",
];

const SCAN_ROOTS: &[&str] = &[
    "/sdcard",
    "/storage/emulated/0",
    "/data/data",
    "/data/user/0",
    "/data/local",
    "/data/media/0",
];

const FILE_SCAN_ROOTS: &[&str] = &["/sdcard", "/storage/emulated/0", "/data/local"];

/// Always-safe expendable locations.
const KNOWN_JUNK_PATHS: &[&str] = &[
    "/data/log",
    "/data/logs",
    "/data/logcat",
    "/data/tombstones",
    "/data/anr",
    "/data/local/tmp",
    "/data/vendor/logs",
    "/sdcard/LOST.DIR",
    "/storage/emulated/0/LOST.DIR",
    "/sdcard/.thumbnails",
    "/storage/emulated/0/.thumbnails",
    "/sdcard/.thumbs",
    "/sdcard/Android/data/com.android.providers.media/albumthumbs",
    "/sdcard/DCIM/.thumbnails",
    "/storage/emulated/0/DCIM/.thumbnails",
];

const ORPHAN_ROOTS: &[&str] = &[
    "/sdcard/Android/data",
    "/sdcard/Android/media",
    "/sdcard/Android/obb",
    "/storage/emulated/0/Android/data",
    "/storage/emulated/0/Android/media",
    "/storage/emulated/0/Android/obb",
    "/data/data",
    "/data/user/0",
];

const DUPLICATE_SCAN_ROOTS: &[&str] = &[
    "/sdcard/DCIM",
    "/sdcard/Pictures",
    "/sdcard/Download",
    "/sdcard/Documents",
    "/sdcard/Movies",
    "/sdcard/Music",
];

/// Directory name patterns nominated by the junk-dir scan.
const JUNK_DIR_NAMES: &[&str] = &[
    "*cache*",
    "*preload*",
    "dump",
    "dumps",
    "core_dump*",
    "log",
    "logs",
    "logcat",
    "bugreport*",
    ".thumbnails",
    "thumbnails",
    ".thumbs",
    "thumbs",
    "LOST.DIR",
    ".Trash",
    ".trashbin",
    "tmp",
    "temp",
];

/// Top-level paths never nominated, whatever matches.
const PROTECTED_PATHS: &[&str] = &["/data", "/sdcard", "/storage", "/system", "/vendor"];

/// One cleanup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanupMode {
    AppCache,
    JunkDirs,
    JunkFiles,
    KnownJunk,
    Orphans,
    Duplicates,
}

impl CleanupMode {
    /// Execution order; duplicates last so earlier modes shrink its input.
    pub const ORDER: [CleanupMode; 6] = [
        CleanupMode::AppCache,
        CleanupMode::JunkDirs,
        CleanupMode::JunkFiles,
        CleanupMode::KnownJunk,
        CleanupMode::Orphans,
        CleanupMode::Duplicates,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            CleanupMode::AppCache => "App caches",
            CleanupMode::JunkDirs => "Junk directories",
            CleanupMode::JunkFiles => "Loose junk files",
            CleanupMode::KnownJunk => "Known junk locations",
            CleanupMode::Orphans => "Uninstalled-app leftovers",
            CleanupMode::Duplicates => "Duplicate files",
        }
    }
}

impl fmt::Display for CleanupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CleanupMode::AppCache => "app_cache",
            CleanupMode::JunkDirs => "junk_dirs",
            CleanupMode::JunkFiles => "junk_files",
            CleanupMode::KnownJunk => "known_junk",
            CleanupMode::Orphans => "orphans",
            CleanupMode::Duplicates => "duplicates",
        };
        write!(f, "{}", s)
    }
}

/// Whether a nominated item is a directory or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    Dir,
    File,
}

/// One file or directory that can be removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupItem {
    pub path: String,
    pub size_bytes: u64,
    pub kind: ItemKind,
    pub detail: String,
    /// For duplicates: the hash group linking copies
    pub group: String,
}

/// Result of scanning one mode.
#[derive(Debug, Clone, Default)]
pub struct ModeEstimate {
    pub items: Vec<CleanupItem>,
    pub total_bytes: u64,
    pub total_items: u64,
    /// A safety refusal or scan failure; items stay empty
    pub error: Option<String>,
}

/// Result of executing one mode.
#[derive(Debug, Clone, Default)]
pub struct ModeResult {
    pub items_removed: u64,
    pub bytes_freed: u64,
    pub errors: Vec<String>,
}

/// Per-mode progress phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModePhase {
    Scanning,
    Cleaning,
    Complete,
    Error,
}

/// Progress for one cleanup mode; each mode gets its own callback so the
/// front-end can render independent bars.
#[derive(Debug, Clone)]
pub struct ModeProgress {
    pub mode: CleanupMode,
    pub phase: ModePhase,
    pub message: String,
    pub percent: f64,
    pub items_done: u64,
    pub items_total: u64,
    pub bytes_freed: u64,
}

pub type ModeProgressSink = Arc<dyn Fn(ModeProgress) + Send + Sync>;

/// Scan-then-execute cleanup over all six modes.
#[derive(Clone)]
pub struct CleanupEngine<B: Bridge> {
    bridge: B,
    cancel: CancelToken,
    sinks: Arc<Mutex<HashMap<CleanupMode, ModeProgressSink>>>,
}

impl<B: Bridge> CleanupEngine<B> {
    pub fn new(bridge: B) -> Self {
        Self {
            bridge,
            cancel: CancelToken::new(),
            sinks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn set_mode_progress(&self, mode: CleanupMode, sink: ModeProgressSink) {
        self.sinks.lock().insert(mode, sink);
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn reset(&self) {
        self.cancel.reset();
    }

    // ------------------------------------------------------------------
    // Estimate (dry-run scan)
    // ------------------------------------------------------------------

    /// Scan the requested modes and price what each would free.
    pub async fn estimate(
        &self,
        serial: &str,
        modes: &[CleanupMode],
    ) -> HashMap<CleanupMode, ModeEstimate> {
        self.cancel.reset();
        let mut results = HashMap::new();

        if modes.len() <= 1 {
            for mode in modes {
                if self.cancel.is_cancelled() {
                    break;
                }
                results.insert(*mode, self.scan_mode(serial, *mode).await);
            }
            return results;
        }

        let semaphore = Arc::new(Semaphore::new(SCAN_WORKERS));
        let mut tasks = JoinSet::new();
        for mode in modes.iter().copied() {
            if self.cancel.is_cancelled() {
                break;
            }
            let engine = self.clone();
            let serial = serial.to_string();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return (mode, ModeEstimate::default());
                };
                (mode, engine.scan_mode(&serial, mode).await)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Ok((mode, estimate)) = joined {
                results.insert(mode, estimate);
            }
        }
        results
    }

    async fn scan_mode(&self, serial: &str, mode: CleanupMode) -> ModeEstimate {
        self.emit(mode, ModePhase::Scanning, "scanning", 0.0, 0, 0, 0);
        let mut estimate = match mode {
            CleanupMode::AppCache => self.scan_app_cache(serial).await,
            CleanupMode::JunkDirs => self.scan_junk_dirs(serial).await,
            CleanupMode::JunkFiles => self.scan_junk_files(serial).await,
            CleanupMode::KnownJunk => self.scan_known_junk(serial).await,
            CleanupMode::Orphans => self.scan_orphans(serial).await,
            CleanupMode::Duplicates => self.scan_duplicates(serial).await,
        };
        estimate.total_items = estimate.items.len() as u64;
        estimate.total_bytes = estimate.items.iter().map(|i| i.size_bytes).sum();
        let message = match &estimate.error {
            Some(error) => error.clone(),
            None => format!(
                "{} items ({})",
                estimate.total_items,
                format_bytes(estimate.total_bytes)
            ),
        };
        let phase = if estimate.error.is_some() {
            ModePhase::Error
        } else {
            ModePhase::Complete
        };
        self.emit(mode, phase, &message, 100.0, 0, estimate.total_items, 0);
        estimate
    }

    // ------------------------------------------------------------------
    // Execute
    // ------------------------------------------------------------------

    /// Execute previously-estimated modes in canonical order.
    pub async fn execute(
        &self,
        serial: &str,
        estimates: &HashMap<CleanupMode, ModeEstimate>,
    ) -> HashMap<CleanupMode, ModeResult> {
        self.cancel.reset();
        let mut results = HashMap::new();
        for mode in CleanupMode::ORDER {
            let Some(estimate) = estimates.get(&mode) else {
                continue;
            };
            if self.cancel.is_cancelled() {
                break;
            }
            if estimate.items.is_empty() {
                results.insert(mode, ModeResult::default());
                continue;
            }
            let result = match mode {
                CleanupMode::AppCache => self.clean_app_cache(serial, estimate).await,
                CleanupMode::JunkDirs => self.clean_dirs(serial, mode, estimate, 20).await,
                CleanupMode::KnownJunk => self.clean_dirs(serial, mode, estimate, 20).await,
                CleanupMode::Orphans => self.clean_dirs(serial, mode, estimate, 15).await,
                CleanupMode::JunkFiles => self.clean_files(serial, mode, estimate, 50).await,
                CleanupMode::Duplicates => self.clean_files(serial, mode, estimate, 50).await,
            };
            results.insert(mode, result);
        }
        results
    }

    // ------------------------------------------------------------------
    // Scan implementations
    // ------------------------------------------------------------------

    async fn scan_app_cache(&self, serial: &str) -> ModeEstimate {
        let mode = CleanupMode::AppCache;
        self.emit(mode, ModePhase::Scanning, "listing packages", 10.0, 0, 0, 0);
        let packages = self.bridge.list_packages(serial, false).await;

        // Size a sample, extrapolate over the full set
        let sample: Vec<String> = packages
            .iter()
            .take(APP_CACHE_SAMPLE)
            .flat_map(|p| {
                [
                    format!("/data/data/{}/cache", p),
                    format!("/data/data/{}/code_cache", p),
                ]
            })
            .collect();
        let mut sampled_bytes: u64 = self
            .bridge
            .du_sizes(serial, &sample, 20)
            .await
            .values()
            .sum();
        if packages.len() > APP_CACHE_SAMPLE && !sample.is_empty() {
            sampled_bytes =
                sampled_bytes * packages.len() as u64 / APP_CACHE_SAMPLE.min(packages.len()) as u64;
        }

        let mut estimate = ModeEstimate::default();
        for package in &packages {
            for suffix in ["cache", "code_cache"] {
                estimate.items.push(CleanupItem {
                    path: format!("/data/data/{}/{}", package, suffix),
                    size_bytes: 0,
                    kind: ItemKind::Dir,
                    detail: format!("{}/{}", package, suffix),
                    group: String::new(),
                });
            }
        }
        // Spread the estimate across items; per-dir precision is not
        // worth one du per package over the bridge
        if !estimate.items.is_empty() && sampled_bytes > 0 {
            let per_item = sampled_bytes / estimate.items.len() as u64;
            for item in &mut estimate.items {
                item.size_bytes = per_item;
            }
        }
        self.emit(
            mode,
            ModePhase::Scanning,
            &format!("{} packages found", packages.len()),
            80.0,
            0,
            0,
            0,
        );
        estimate
    }

    async fn scan_junk_dirs(&self, serial: &str) -> ModeEstimate {
        let mode = CleanupMode::JunkDirs;
        let mut seen_lower = HashSet::new();
        let mut clauses = Vec::new();
        for name in JUNK_DIR_NAMES {
            if seen_lower.insert(name.to_lowercase()) {
                clauses.push(format!("-iname '{}'", name));
            }
        }
        let expr = clauses.join(" -o ");

        let mut found = Vec::new();
        for (idx, root) in SCAN_ROOTS.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            self.emit(
                mode,
                ModePhase::Scanning,
                &format!("scanning {}", root),
                10.0 + 60.0 * idx as f64 / SCAN_ROOTS.len() as f64,
                0,
                0,
                0,
            );
            let cmd = format!(
                "find {} -maxdepth 6 -type d \\( {} \\) 2>/dev/null",
                shell_quote(root),
                expr
            );
            let out = self
                .bridge
                .run_shell(serial, &cmd, Duration::from_secs(120))
                .await;
            for line in out.lines() {
                let dir = line.trim();
                if dir.starts_with('/') && !PROTECTED_PATHS.contains(&dir) {
                    found.push(dir.to_string());
                }
            }
        }

        let unique = dedup_across_mounts(found);
        let sizes = self.bridge.du_sizes(serial, &unique, 20).await;
        let mut estimate = ModeEstimate::default();
        for dir in unique {
            estimate.items.push(CleanupItem {
                size_bytes: sizes.get(&dir).copied().unwrap_or(0),
                detail: dir.clone(),
                path: dir,
                kind: ItemKind::Dir,
                group: String::new(),
            });
        }
        estimate
    }

    async fn scan_junk_files(&self, serial: &str) -> ModeEstimate {
        let mode = CleanupMode::JunkFiles;
        let extensions = ["log", "tmp", "temp", "bak", "dmp", "mdmp", "core", "thumb"];
        let exact = ["thumbs.db", "desktop.ini", "Thumbdata*", "logcat*.txt"];
        let ext_expr = extensions
            .iter()
            .map(|e| format!("-iname '*.{}'", e))
            .collect::<Vec<_>>()
            .join(" -o ");
        let exact_expr = exact
            .iter()
            .map(|n| format!("-iname '{}'", n))
            .collect::<Vec<_>>()
            .join(" -o ");

        let mut found = Vec::new();
        for (idx, root) in FILE_SCAN_ROOTS.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            self.emit(
                mode,
                ModePhase::Scanning,
                &format!("scanning {}", root),
                10.0 + 60.0 * idx as f64 / FILE_SCAN_ROOTS.len() as f64,
                0,
                0,
                0,
            );
            let cmd = format!(
                "find {} -maxdepth 8 -type f \\( {} -o {} \\) 2>/dev/null",
                shell_quote(root),
                ext_expr,
                exact_expr
            );
            let out = self
                .bridge
                .run_shell(serial, &cmd, Duration::from_secs(90))
                .await;
            for line in out.lines() {
                let file = line.trim();
                if file.starts_with('/') {
                    found.push(file.to_string());
                }
            }
        }

        let unique = dedup_across_mounts(found);
        let sizes = self.bridge.stat_sizes(serial, &unique, 50).await;
        let mut estimate = ModeEstimate::default();
        for file in unique {
            estimate.items.push(CleanupItem {
                size_bytes: sizes.get(&file).copied().unwrap_or(0),
                detail: file.clone(),
                path: file,
                kind: ItemKind::File,
                group: String::new(),
            });
        }
        estimate
    }

    async fn scan_known_junk(&self, serial: &str) -> ModeEstimate {
        let mode = CleanupMode::KnownJunk;
        let mut estimate = ModeEstimate::default();
        for (idx, path) in KNOWN_JUNK_PATHS.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            self.emit(
                mode,
                ModePhase::Scanning,
                &format!("probing {}", path),
                10.0 + 80.0 * idx as f64 / KNOWN_JUNK_PATHS.len() as f64,
                0,
                0,
                0,
            );
            if !self.bridge.remote_dir_exists(serial, path).await {
                continue;
            }
            let size = self
                .bridge
                .du_sizes(serial, &[path.to_string()], 1)
                .await
                .values()
                .sum();
            estimate.items.push(CleanupItem {
                path: path.to_string(),
                size_bytes: size,
                kind: ItemKind::Dir,
                detail: path.to_string(),
                group: String::new(),
            });
        }
        estimate
    }

    async fn scan_orphans(&self, serial: &str) -> ModeEstimate {
        let mode = CleanupMode::Orphans;
        self.emit(mode, ModePhase::Scanning, "fetching package list", 5.0, 0, 0, 0);

        let Some(installed) = self.fetch_installed_packages(serial).await else {
            let message =
                "orphan scan refused: could not obtain a trustworthy installed-package list; \
                 nothing will be deleted";
            tracing::error!("{}", message);
            return ModeEstimate {
                error: Some(message.to_string()),
                ..Default::default()
            };
        };
        tracing::info!(packages = installed.len(), "package list validated for orphan scan");

        let mut orphans: Vec<(String, String)> = Vec::new();
        for (idx, root) in ORPHAN_ROOTS.iter().enumerate() {
            if self.cancel.is_cancelled() {
                break;
            }
            self.emit(
                mode,
                ModePhase::Scanning,
                &format!("scanning {}", root),
                15.0 + 50.0 * idx as f64 / ORPHAN_ROOTS.len() as f64,
                0,
                0,
                0,
            );
            let out = self
                .bridge
                .run_shell(
                    serial,
                    &format!("ls -1 {} 2>/dev/null", shell_quote(root)),
                    Duration::from_secs(15),
                )
                .await;
            for line in out.lines() {
                let name = line.trim();
                if !is_package_name(name) || installed.contains(name) {
                    continue;
                }
                // System vendors sometimes hide packages from `pm list`;
                // double-check before calling one an orphan
                if name.starts_with("com.android.") || name.starts_with("com.google.android.") {
                    let check = self
                        .bridge
                        .run_shell(
                            serial,
                            &format!("pm path {} 2>/dev/null", shell_quote(name)),
                            Duration::from_secs(5),
                        )
                        .await;
                    if !check.trim().is_empty() {
                        continue;
                    }
                }
                orphans.push((format!("{}/{}", root, name), name.to_string()));
            }
        }

        let mut seen = HashSet::new();
        let mut unique: Vec<(String, String)> = Vec::new();
        for (path, package) in orphans {
            if seen.insert(canonical_remote(&path)) {
                unique.push((path, package));
            }
        }

        let dirs: Vec<String> = unique.iter().map(|(p, _)| p.clone()).collect();
        let sizes = self.bridge.du_sizes(serial, &dirs, 20).await;
        let mut estimate = ModeEstimate::default();
        for (path, package) in unique {
            estimate.items.push(CleanupItem {
                size_bytes: sizes.get(&path).copied().unwrap_or(0),
                detail: format!("orphan of {}", package),
                path,
                kind: ItemKind::Dir,
                group: String::new(),
            });
        }
        estimate
    }

    async fn scan_duplicates(&self, serial: &str) -> ModeEstimate {
        let dedup = DedupEngine::new(self.bridge.clone(), serial);
        let options = DedupOptions {
            roots: DUPLICATE_SCAN_ROOTS.iter().map(|r| r.to_string()).collect(),
            dry_run: true,
            ..Default::default()
        };
        let report = dedup.run(&options).await;

        let mut estimate = ModeEstimate::default();
        for planned in report.planned_deletions {
            estimate.items.push(CleanupItem {
                path: planned.path,
                size_bytes: planned.size,
                kind: ItemKind::File,
                detail: "confirmed duplicate".to_string(),
                group: planned.group,
            });
        }
        estimate
    }

    // ------------------------------------------------------------------
    // Execute implementations
    // ------------------------------------------------------------------

    async fn clean_app_cache(&self, serial: &str, estimate: &ModeEstimate) -> ModeResult {
        let mode = CleanupMode::AppCache;
        self.emit(mode, ModePhase::Cleaning, "pm trim-caches", 5.0, 0, 0, 0);
        self.bridge.trim_caches(serial).await;
        self.remove_items(serial, mode, estimate, 60, true).await
    }

    async fn clean_dirs(
        &self,
        serial: &str,
        mode: CleanupMode,
        estimate: &ModeEstimate,
        batch: usize,
    ) -> ModeResult {
        self.remove_items(serial, mode, estimate, batch, true).await
    }

    async fn clean_files(
        &self,
        serial: &str,
        mode: CleanupMode,
        estimate: &ModeEstimate,
        batch: usize,
    ) -> ModeResult {
        self.remove_items(serial, mode, estimate, batch, false).await
    }

    async fn remove_items(
        &self,
        serial: &str,
        mode: CleanupMode,
        estimate: &ModeEstimate,
        batch: usize,
        recursive: bool,
    ) -> ModeResult {
        let mut result = ModeResult::default();
        let total = estimate.items.len() as u64;
        for chunk in estimate.items.chunks(batch) {
            if self.cancel.is_cancelled() {
                break;
            }
            let paths: Vec<String> = chunk.iter().map(|i| i.path.clone()).collect();
            if recursive {
                self.bridge.remove_dirs_batched(serial, &paths, batch).await;
            } else {
                self.bridge.remove_files_batched(serial, &paths, batch).await;
            }
            result.items_removed += chunk.len() as u64;
            result.bytes_freed += chunk.iter().map(|i| i.size_bytes).sum::<u64>();
            self.emit(
                mode,
                ModePhase::Cleaning,
                &format!("removing {}/{}", result.items_removed, total),
                100.0 * result.items_removed as f64 / total.max(1) as f64,
                result.items_removed,
                total,
                result.bytes_freed,
            );
        }
        self.emit(
            mode,
            ModePhase::Complete,
            &format!("done, {} freed", format_bytes(result.bytes_freed)),
            100.0,
            result.items_removed,
            total,
            result.bytes_freed,
        );
        result
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Fetch the installed-package list with the three safety gates.
    /// `None` means "unsafe to proceed"; callers must not delete anything.
    async fn fetch_installed_packages(&self, serial: &str) -> Option<HashSet<String>> {
        for attempt in 1..=2 {
            let packages: HashSet<String> = self
                .bridge
                .list_packages(serial, false)
                .await
                .into_iter()
                .collect();

            // Gate 1: minimum size
            if packages.len() < MIN_PACKAGES_THRESHOLD {
                tracing::warn!(
                    attempt,
                    count = packages.len(),
                    minimum = MIN_PACKAGES_THRESHOLD,
                    "package list too small"
                );
                continue;
            }

            // Gate 2: canary presence
            let Some(canary) = CANARY_PACKAGES
                .iter()
                .find(|c| packages.contains(**c))
                .copied()
            else {
                tracing::warn!(attempt, "no canary package in list");
                continue;
            };

            // Gate 3: the canary must resolve to a real APK
            let check = self
                .bridge
                .run_shell(
                    serial,
                    &format!("pm path {} 2>/dev/null", shell_quote(canary)),
                    SHELL_TIMEOUT,
                )
                .await;
            if check.trim().is_empty() {
                tracing::warn!(attempt, canary, "canary failed pm path spot-check");
                continue;
            }

            return Some(packages);
        }
        None
    }

    fn emit(
        &self,
        mode: CleanupMode,
        phase: ModePhase,
        message: &str,
        percent: f64,
        items_done: u64,
        items_total: u64,
        bytes_freed: u64,
    ) {
        let sink = self.sinks.lock().get(&mode).cloned();
        if let Some(sink) = sink {
            sink(ModeProgress {
                mode,
                phase,
                message: message.to_string(),
                percent,
                items_done,
                items_total,
                bytes_freed,
            });
        }
    }
}

/// Drop paths that alias an already-seen path on an equivalent mount.
fn dedup_across_mounts(paths: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();
    for path in paths {
        if seen.insert(canonical_remote(&path)) {
            unique.push(path);
        }
    }
    unique
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
