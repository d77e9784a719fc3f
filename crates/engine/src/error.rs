// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed failures that refuse an operation at start.
//!
//! Transient per-file errors never surface here — they accumulate in the
//! operation's error list and the workflow continues (maximum data
//! recovered). This type is for conditions where starting (or continuing)
//! makes no sense at all.

use mdt_adapters::BridgeError;
use mdt_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OperationError {
    /// Preconditions not met: no device, same device twice, unknown backup
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("operation cancelled")]
    Cancelled,
}
