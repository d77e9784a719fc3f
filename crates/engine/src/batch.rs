// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel pull/push batches with serialized progress.
//!
//! Workers are bounded by the parallelism table; each file is pulled or
//! pushed by exactly one task. A failed file appends to the operation's
//! error list and the batch continues. Progress updates happen under one
//! mutex so the byte counter is monotone and emission order is sane.

use crate::index::FileEntry;
use crate::op::{scale_percent, Operation};
use mdt_adapters::{Bridge, BridgeOps};
use mdt_core::{
    remote_basename, safe_percent, Clock, OperationProgress, ParallelismConfig, Phase,
};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Result of one batch: files that made it and bytes accounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: u64,
    pub bytes: u64,
}

/// Presentation knobs for a batch's progress stream.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub phase: Phase,
    pub sub_phase: String,
    /// Prefix stripped from remote paths to form the local relative path
    pub strip_prefix: String,
    /// Overall percent window this batch occupies
    pub pct_range: (f64, f64),
}

impl Default for BatchSpec {
    fn default() -> Self {
        Self {
            phase: Phase::BackingUp,
            sub_phase: String::new(),
            strip_prefix: "/".to_string(),
            pct_range: (0.0, 100.0),
        }
    }
}

struct Counters {
    ok: u64,
    bytes: u64,
    items: u64,
}

/// Pull `files` from the device into `dest_root`, preserving structure.
///
/// Pre-creates every local parent directory once, then dispatches files
/// across at most `workers` tasks. Sequential fallback for tiny batches.
pub async fn pull_with_progress<B, K>(
    bridge: &B,
    serial: &str,
    op: &Operation<K>,
    files: &[FileEntry],
    dest_root: &Path,
    parallel: &ParallelismConfig,
    spec: BatchSpec,
) -> BatchOutcome
where
    B: Bridge,
    K: Clock,
{
    let total_files = files.len();
    if total_files == 0 {
        return BatchOutcome::default();
    }
    let total_bytes: u64 = files.iter().map(|f| f.size).sum();
    let avg = total_bytes / total_files as u64;
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let workers = parallel.workers_for(total_files, avg, cores);

    // Pre-create local parents once; no per-file mkdir race
    for entry in files {
        let local = local_target(dest_root, &spec.strip_prefix, &entry.path);
        if let Some(parent) = local.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    if workers <= 1 || parallel.is_sequential(total_files) {
        return pull_sequential(bridge, serial, op, files, dest_root, &spec, total_bytes).await;
    }

    tracing::info!(
        files = total_files,
        workers,
        avg_bytes = avg,
        "parallel pull"
    );

    let counters = Arc::new(Mutex::new(Counters {
        ok: 0,
        bytes: 0,
        items: 0,
    }));
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for entry in files.iter().cloned() {
        let bridge = bridge.clone();
        let serial = serial.to_string();
        let op = op.clone();
        let counters = Arc::clone(&counters);
        let semaphore = Arc::clone(&semaphore);
        let spec = spec.clone();
        let local = local_target(dest_root, &spec.strip_prefix, &entry.path);
        let total = (total_files as u64, total_bytes);

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if op.is_cancelled() {
                return;
            }
            let ok = bridge.pull(&serial, &entry.path, &local).await;
            if !ok {
                op.record_error(format!("Pull falhou: {}", remote_basename(&entry.path)));
            }
            let mut c = counters.lock();
            if ok {
                c.ok += 1;
            }
            c.bytes += entry.size;
            c.items += 1;
            let fraction = safe_percent(c.bytes, total.1) / 100.0;
            op.emit(OperationProgress {
                phase: spec.phase,
                sub_phase: spec.sub_phase.clone(),
                current_item: remote_basename(&entry.path).to_string(),
                items_done: c.items,
                items_total: total.0,
                bytes_done: c.bytes,
                bytes_total: total.1,
                percent: scale_percent(spec.pct_range, fraction),
                ..Default::default()
            });
        });
    }
    while tasks.join_next().await.is_some() {}

    let c = counters.lock();
    BatchOutcome {
        succeeded: c.ok,
        bytes: c.bytes,
    }
}

async fn pull_sequential<B, K>(
    bridge: &B,
    serial: &str,
    op: &Operation<K>,
    files: &[FileEntry],
    dest_root: &Path,
    spec: &BatchSpec,
    total_bytes: u64,
) -> BatchOutcome
where
    B: Bridge,
    K: Clock,
{
    let mut outcome = BatchOutcome::default();
    for (idx, entry) in files.iter().enumerate() {
        if op.is_cancelled() {
            break;
        }
        let local = local_target(dest_root, &spec.strip_prefix, &entry.path);
        if bridge.pull(serial, &entry.path, &local).await {
            outcome.succeeded += 1;
        } else {
            op.record_error(format!("Pull falhou: {}", remote_basename(&entry.path)));
        }
        outcome.bytes += entry.size;
        let fraction = safe_percent(outcome.bytes, total_bytes) / 100.0;
        op.emit(OperationProgress {
            phase: spec.phase,
            sub_phase: spec.sub_phase.clone(),
            current_item: remote_basename(&entry.path).to_string(),
            items_done: idx as u64 + 1,
            items_total: files.len() as u64,
            bytes_done: outcome.bytes,
            bytes_total: total_bytes,
            percent: scale_percent(spec.pct_range, fraction),
            ..Default::default()
        });
    }
    outcome
}

/// Push `(local, remote)` pairs to the device. Mirrors pull, with one
/// extra step: remote parent directories are pre-created in batches of 50
/// before any worker starts.
pub async fn push_with_progress<B, K>(
    bridge: &B,
    serial: &str,
    op: &Operation<K>,
    files: &[(PathBuf, String)],
    parallel: &ParallelismConfig,
    spec: BatchSpec,
) -> BatchOutcome
where
    B: Bridge,
    K: Clock,
{
    let total_files = files.len();
    if total_files == 0 {
        return BatchOutcome::default();
    }

    let sized: Vec<(PathBuf, String, u64)> = files
        .iter()
        .map(|(local, remote)| {
            let size = std::fs::metadata(local).map(|m| m.len()).unwrap_or(0);
            (local.clone(), remote.clone(), size)
        })
        .collect();
    let total_bytes: u64 = sized.iter().map(|(_, _, s)| s).sum();
    let avg = total_bytes / total_files as u64;

    // Batched mkdir -p over the set of required parents
    let mut parents: Vec<String> = sized
        .iter()
        .map(|(_, remote, _)| mdt_core::remote_parent(remote).to_string())
        .filter(|p| !p.is_empty() && p != "/")
        .collect();
    parents.sort();
    parents.dedup();
    bridge.mkdir_batches(serial, &parents).await;

    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);
    let workers = parallel.workers_for(total_files, avg, cores);

    if workers <= 1 || parallel.is_sequential(total_files) {
        return push_sequential(bridge, serial, op, &sized, &spec, total_bytes).await;
    }

    tracing::info!(
        files = total_files,
        workers,
        avg_bytes = avg,
        "parallel push"
    );

    let counters = Arc::new(Mutex::new(Counters {
        ok: 0,
        bytes: 0,
        items: 0,
    }));
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for (local, remote, size) in sized {
        let bridge = bridge.clone();
        let serial = serial.to_string();
        let op = op.clone();
        let counters = Arc::clone(&counters);
        let semaphore = Arc::clone(&semaphore);
        let spec = spec.clone();
        let total = (total_files as u64, total_bytes);

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire().await else {
                return;
            };
            if op.is_cancelled() {
                return;
            }
            let ok = bridge.push(&serial, &local, &remote).await;
            if !ok {
                op.record_error(format!("Push falhou: {}", remote_basename(&remote)));
            }
            let mut c = counters.lock();
            if ok {
                c.ok += 1;
            }
            c.bytes += size;
            c.items += 1;
            let fraction = safe_percent(c.bytes, total.1) / 100.0;
            op.emit(OperationProgress {
                phase: spec.phase,
                sub_phase: spec.sub_phase.clone(),
                current_item: remote_basename(&remote).to_string(),
                items_done: c.items,
                items_total: total.0,
                bytes_done: c.bytes,
                bytes_total: total.1,
                percent: scale_percent(spec.pct_range, fraction),
                ..Default::default()
            });
        });
    }
    while tasks.join_next().await.is_some() {}

    let c = counters.lock();
    BatchOutcome {
        succeeded: c.ok,
        bytes: c.bytes,
    }
}

async fn push_sequential<B, K>(
    bridge: &B,
    serial: &str,
    op: &Operation<K>,
    files: &[(PathBuf, String, u64)],
    spec: &BatchSpec,
    total_bytes: u64,
) -> BatchOutcome
where
    B: Bridge,
    K: Clock,
{
    let mut outcome = BatchOutcome::default();
    for (idx, (local, remote, size)) in files.iter().enumerate() {
        if op.is_cancelled() {
            break;
        }
        if bridge.push(serial, local, remote).await {
            outcome.succeeded += 1;
        } else {
            op.record_error(format!("Push falhou: {}", remote_basename(remote)));
        }
        outcome.bytes += size;
        let fraction = safe_percent(outcome.bytes, total_bytes) / 100.0;
        op.emit(OperationProgress {
            phase: spec.phase,
            sub_phase: spec.sub_phase.clone(),
            current_item: remote_basename(remote).to_string(),
            items_done: idx as u64 + 1,
            items_total: files.len() as u64,
            bytes_done: outcome.bytes,
            bytes_total: total_bytes,
            percent: scale_percent(spec.pct_range, fraction),
            ..Default::default()
        });
    }
    outcome
}

fn local_target(dest_root: &Path, strip_prefix: &str, remote: &str) -> PathBuf {
    let rel = remote
        .strip_prefix(strip_prefix)
        .unwrap_or(remote)
        .trim_start_matches('/');
    dest_root.join(rel)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
