// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device-confirmation overlay adapters
//!
//! Some bridge commands (full backup/restore and the data-restore variants)
//! require the device's end user to tap a prompt. While such a command is
//! in flight the front-end shows an overlay telling the user to look at the
//! device. Contract: `show` and `dismiss` are called in strict pairs —
//! exactly one `dismiss` per `show`, even on failure paths.

mod desktop;
mod noop;

pub use desktop::DesktopConfirm;
pub use noop::NoopConfirm;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ConfirmCall, FakeConfirm};

use async_trait::async_trait;

/// Adapter for the device-side confirmation overlay.
///
/// Implementations must not block: front-ends marshal to their own UI
/// thread, the desktop adapter fires a notification, and failures are
/// swallowed — a broken overlay must never break the operation.
/// Object-safe so operations can hold `Arc<dyn ConfirmAdapter>`.
#[async_trait]
pub trait ConfirmAdapter: Send + Sync + 'static {
    /// The device is about to display a prompt the user must accept.
    async fn show(&self, title: &str, message: &str);

    /// The device-side action completed (or failed); hide the overlay.
    async fn dismiss(&self);
}
