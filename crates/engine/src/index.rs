// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage indexing over the bridge shell.
//!
//! One `find | xargs stat` pipeline per root yields `path|size` lines. Very
//! large trees (200k+ files) can overflow the bridge's stdout buffer and
//! come back empty; the adaptive scanner detects that (empty result but a
//! non-empty shallow count) and splits the directory into its immediate
//! subdirectories, each with a decremented depth budget.

use crate::op::scale_percent;
use mdt_adapters::subprocess::INDEX_TIMEOUT;
use mdt_adapters::{shell_quote, Bridge};
use mdt_core::{canonical_remote, CancelToken, FilterOptions, PathFilter};
use std::collections::HashSet;
use std::time::Duration;

/// One indexed remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    /// Zero for empty or unreadable files
    pub size: u64,
}

/// Optional narrowing of a scan to an extension allow-list.
#[derive(Debug, Clone, Default)]
pub struct ScanSpec {
    /// Lowercase extensions including the dot, e.g. ".jpg"
    pub extensions: Vec<String>,
    /// Files smaller than this are dropped
    pub min_size: u64,
    pub max_depth: u32,
    pub filters: FilterOptions,
}

/// Flat listing of all files under `roots`, with optional filters.
/// Cancellation stops between roots; partial results are returned.
pub async fn list_remote_files<B: Bridge>(
    bridge: &B,
    serial: &str,
    roots: &[String],
    filters: FilterOptions,
    cancel: &CancelToken,
) -> Vec<FileEntry> {
    let mut files = Vec::new();
    for root in roots {
        if cancel.is_cancelled() {
            break;
        }
        let cmd = format!(
            "find {} -type f 2>/dev/null | xargs stat -c '%n|%s' 2>/dev/null",
            shell_quote(root)
        );
        let out = bridge.run_shell(serial, &cmd, INDEX_TIMEOUT).await;
        parse_stat_lines(&out, |path, size| {
            if !PathFilter::excluded(path, filters) {
                files.push(FileEntry {
                    path: path.to_string(),
                    size,
                });
            }
        });
    }
    files
}

/// Progress callback for the adaptive scan: (label, percent).
pub type ScanProgress<'a> = &'a (dyn Fn(&str, f64) + Send + Sync);

/// Index `roots` with the adaptive split fallback. Paths are deduplicated
/// across equivalent mounts via their canonical spelling.
pub async fn index_adaptive<B: Bridge>(
    bridge: &B,
    serial: &str,
    roots: &[String],
    spec: &ScanSpec,
    cancel: &CancelToken,
    progress: ScanProgress<'_>,
) -> Vec<FileEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut files = Vec::new();
    let name_filter = build_name_filter(&spec.extensions);

    let root_count = roots.len().max(1);
    for (root_idx, root) in roots.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }
        let pct_base = scale_percent((0.0, 100.0), root_idx as f64 / root_count as f64);

        // Work stack: (directory, remaining depth budget)
        let mut stack: Vec<(String, u32)> = vec![(root.clone(), spec.max_depth.max(1))];
        while let Some((dir, depth)) = stack.pop() {
            if cancel.is_cancelled() {
                break;
            }
            let label = short_label(&dir);
            progress(&label, pct_base);

            let out = scan_dir(bridge, serial, &dir, depth, &name_filter).await;
            let mut parsed = 0usize;
            collect_entries(&out, spec, &mut seen, &mut files, &mut parsed);
            if parsed > 0 {
                continue;
            }

            // Empty result: either the directory is empty or the scan
            // overflowed. A cheap shallow count disambiguates.
            let count_cmd = format!(
                "find {} -maxdepth 1 -type f{} 2>/dev/null | wc -l",
                shell_quote(&dir),
                name_filter
            );
            let shallow: usize = bridge
                .run_shell(serial, &count_cmd, Duration::from_secs(30))
                .await
                .trim()
                .parse()
                .unwrap_or(0);
            if shallow > 0 {
                let out = scan_dir(bridge, serial, &dir, 1, &name_filter).await;
                let mut n = 0usize;
                collect_entries(&out, spec, &mut seen, &mut files, &mut n);
            }

            let subdir_cmd = format!(
                "find {} -maxdepth 1 -mindepth 1 -type d 2>/dev/null",
                shell_quote(&dir)
            );
            let subdirs = bridge
                .run_shell(serial, &subdir_cmd, Duration::from_secs(30))
                .await;
            let subdirs: Vec<&str> = subdirs
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if subdirs.is_empty() {
                continue;
            }
            tracing::info!(
                dir,
                subdirs = subdirs.len(),
                "scan returned empty, splitting into subdirectories"
            );
            for sub in subdirs {
                stack.push((sub.to_string(), depth.saturating_sub(1).max(1)));
            }
        }
    }
    files
}

async fn scan_dir<B: Bridge>(
    bridge: &B,
    serial: &str,
    dir: &str,
    depth: u32,
    name_filter: &str,
) -> String {
    let cmd = format!(
        "find {} -maxdepth {} -type f{} 2>/dev/null | xargs stat -c '%n|%s' 2>/dev/null",
        shell_quote(dir),
        depth,
        name_filter
    );
    bridge.run_shell(serial, &cmd, INDEX_TIMEOUT).await
}

fn collect_entries(
    out: &str,
    spec: &ScanSpec,
    seen: &mut HashSet<String>,
    files: &mut Vec<FileEntry>,
    parsed: &mut usize,
) {
    parse_stat_lines(out, |path, size| {
        *parsed += 1;
        if size < spec.min_size {
            return;
        }
        if !spec.extensions.is_empty() && !has_allowed_extension(path, &spec.extensions) {
            return;
        }
        if PathFilter::excluded(path, spec.filters) {
            return;
        }
        let canon = canonical_remote(path);
        if !seen.insert(canon) {
            return;
        }
        files.push(FileEntry {
            path: path.to_string(),
            size,
        });
    });
}

/// Parse `path|size` lines, dropping anything malformed.
pub fn parse_stat_lines(out: &str, mut push: impl FnMut(&str, u64)) {
    for line in out.lines() {
        let line = line.trim();
        let Some((path, size)) = line.rsplit_once('|') else {
            continue;
        };
        if path.is_empty() {
            continue;
        }
        let size = size.parse().unwrap_or(0);
        push(path, size);
    }
}

/// ` \( -iname '*.jpg' -o -iname '*.png' \)` from an extension list.
fn build_name_filter(extensions: &[String]) -> String {
    if extensions.is_empty() {
        return String::new();
    }
    let clauses: Vec<String> = extensions
        .iter()
        .map(|ext| format!("-iname '*{}'", ext))
        .collect();
    format!(" \\( {} \\)", clauses.join(" -o "))
}

fn has_allowed_extension(path: &str, extensions: &[String]) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    extensions.iter().any(|ext| name.ends_with(ext.as_str()))
}

fn short_label(dir: &str) -> String {
    let parts: Vec<&str> = dir.trim_end_matches('/').split('/').collect();
    if parts.len() >= 2 {
        parts[parts.len() - 2..].join("/")
    } else {
        dir.to_string()
    }
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
