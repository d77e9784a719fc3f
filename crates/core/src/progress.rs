// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unified progress record emitted by every operation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level phase of an operation.
///
/// One wide enum shared by all managers; each emitter uses the subset that
/// applies and consumers ignore the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Initializing,
    Indexing,
    BackingUp,
    Restoring,
    Installing,
    Verifying,
    Scanning,
    Cleaning,
    Complete,
    CompleteWithErrors,
    Error,
}

impl Phase {
    /// Whether this phase ends an operation.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Complete | Phase::CompleteWithErrors | Phase::Error
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Initializing => "initializing",
            Phase::Indexing => "indexing",
            Phase::BackingUp => "backing_up",
            Phase::Restoring => "restoring",
            Phase::Installing => "installing",
            Phase::Verifying => "verifying",
            Phase::Scanning => "scanning",
            Phase::Cleaning => "cleaning",
            Phase::Complete => "complete",
            Phase::CompleteWithErrors => "complete_with_errors",
            Phase::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Progress update that every manager can emit.
///
/// Fields are a superset across operations; metrics that do not apply to a
/// given emitter stay at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationProgress {
    pub phase: Phase,
    #[serde(default)]
    pub sub_phase: String,
    #[serde(default)]
    pub current_item: String,
    #[serde(default)]
    pub items_done: u64,
    #[serde(default)]
    pub items_total: u64,
    #[serde(default)]
    pub bytes_done: u64,
    #[serde(default)]
    pub bytes_total: u64,
    /// Always within [0, 100]
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub elapsed_seconds: f64,
    #[serde(default)]
    pub eta_seconds: f64,
    #[serde(default)]
    pub source_device: String,
    #[serde(default)]
    pub target_device: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl OperationProgress {
    pub fn phase(phase: Phase) -> Self {
        Self {
            phase,
            ..Self::default()
        }
    }
}

/// `done / total * 100` without division by zero.
pub fn safe_percent(done: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        done as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
#[path = "progress_tests.rs"]
mod tests;
