// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake confirmation adapter for testing

use super::ConfirmAdapter;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Recorded overlay interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmCall {
    Show { title: String, message: String },
    Dismiss,
}

/// Fake confirmation adapter that records show/dismiss pairs.
#[derive(Clone, Default)]
pub struct FakeConfirm {
    calls: Arc<Mutex<Vec<ConfirmCall>>>,
}

impl FakeConfirm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ConfirmCall> {
        self.calls.lock().clone()
    }

    /// Number of shows minus dismisses; zero when strictly paired.
    pub fn open_overlays(&self) -> i64 {
        self.calls.lock().iter().fold(0i64, |acc, call| match call {
            ConfirmCall::Show { .. } => acc + 1,
            ConfirmCall::Dismiss => acc - 1,
        })
    }
}

#[async_trait]
impl ConfirmAdapter for FakeConfirm {
    async fn show(&self, title: &str, message: &str) {
        self.calls.lock().push(ConfirmCall::Show {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    async fn dismiss(&self) {
        self.calls.lock().push(ConfirmCall::Dismiss);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_pairs() {
        let confirm = FakeConfirm::new();
        confirm.show("Backup", "Tap confirm on the device").await;
        assert_eq!(confirm.open_overlays(), 1);
        confirm.dismiss().await;
        assert_eq!(confirm.open_overlays(), 0);
        assert_eq!(confirm.calls().len(), 2);
    }
}
