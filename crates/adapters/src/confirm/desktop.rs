// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Desktop confirmation overlay backed by notify-rust.
//!
//! Headless stand-in for a GUI front-end: `show` raises a desktop
//! notification pointing the user at the device; `dismiss` is a no-op
//! because desktop notifications expire on their own.

use super::ConfirmAdapter;
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopConfirm;

impl DesktopConfirm {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConfirmAdapter for DesktopConfirm {
    async fn show(&self, title: &str, message: &str) {
        let title = title.to_string();
        let message = message.to_string();
        // Notification::show() can be synchronous; keep it off the runtime.
        tokio::task::spawn_blocking(move || {
            tracing::info!(%title, "showing device confirmation notification");
            if let Err(e) = notify_rust::Notification::new()
                .summary(&title)
                .body(&message)
                .show()
            {
                tracing::warn!(error = %e, "desktop confirmation notification failed");
            }
        });
    }

    async fn dismiss(&self) {
        tracing::debug!("device confirmation dismissed");
    }
}
