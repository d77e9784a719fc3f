// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op confirmation adapter (logs only)

use super::ConfirmAdapter;
use async_trait::async_trait;

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopConfirm;

impl NoopConfirm {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ConfirmAdapter for NoopConfirm {
    async fn show(&self, title: &str, message: &str) {
        tracing::info!(title, message, "device confirmation required");
    }

    async fn dismiss(&self) {}
}
