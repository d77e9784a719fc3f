// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cooperative cancellation flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set-once cancellation token checked at every loop boundary and before
/// every bridge call.
///
/// Setting the flag never kills an in-flight subprocess; the current call
/// runs to its own timeout and only the *next* one is prevented. The flag
/// stays set until the owning operation calls [`CancelToken::reset`] at the
/// start of a new run.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag. Only `begin_operation` should call this.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "cancel_tests.rs"]
mod tests;
