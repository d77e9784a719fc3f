// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-count heuristic for parallel pull/push batches.
//!
//! The tiers are configuration, not code: they were tuned empirically and
//! deployments override them through the config file. Bridge transfers are
//! I/O-bound (the subprocess spends almost all of its time blocked on USB),
//! so the general cap scales with cores rather than matching them.

use serde::{Deserialize, Serialize};

/// One average-file-size tier with its own worker cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeTier {
    /// Tier applies when the batch's average file size exceeds this
    pub min_avg_bytes: u64,
    pub max_workers: usize,
}

/// Tunable worker-pool sizing for transfer batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelismConfig {
    /// Checked in order; first matching tier wins
    pub size_tiers: Vec<SizeTier>,
    /// General cap applied as min(2 * cores, max_workers)
    pub max_workers: usize,
    /// Batches at or below this size run sequentially
    pub sequential_threshold: usize,
}

impl Default for ParallelismConfig {
    fn default() -> Self {
        Self {
            size_tiers: vec![
                SizeTier {
                    min_avg_bytes: 50 * 1024 * 1024,
                    max_workers: 3,
                },
                SizeTier {
                    min_avg_bytes: 10 * 1024 * 1024,
                    max_workers: 4,
                },
            ],
            max_workers: 16,
            sequential_threshold: 2,
        }
    }
}

impl ParallelismConfig {
    /// Worker count for a batch of `file_count` files averaging `avg_size`
    /// bytes, on a host with `cores` logical CPUs.
    pub fn workers_for(&self, file_count: usize, avg_size: u64, cores: usize) -> usize {
        if file_count <= 1 {
            return 1;
        }
        let cores = cores.max(1);
        let cap = self
            .size_tiers
            .iter()
            .find(|tier| avg_size > tier.min_avg_bytes)
            .map(|tier| tier.max_workers.min(cores))
            .unwrap_or_else(|| (cores * 2).min(self.max_workers));
        cap.min(file_count).max(1)
    }

    /// Whether this batch is too small to amortize worker dispatch.
    pub fn is_sequential(&self, file_count: usize) -> bool {
        file_count <= self.sequential_threshold
    }
}
