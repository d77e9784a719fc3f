// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mdt-adapters: Bridge, confirmation and agent adapters
//!
//! Everything that touches an external process or socket lives here: the
//! ADB shell bridge, the device-confirmation overlay sinks, and the
//! on-device agent client (HTTP + TCP fast path).

pub mod agent;
pub mod bridge;
pub mod confirm;
pub mod subprocess;

pub use agent::{AgentClient, AgentError, TransferReceipt};
pub use bridge::{shell_quote, AdbBridge, Bridge, BridgeError, BridgeOps, BridgeOutput};
pub use confirm::{ConfirmAdapter, DesktopConfirm, NoopConfirm};

#[cfg(any(test, feature = "test-support"))]
pub use bridge::FakeBridge;
#[cfg(any(test, feature = "test-support"))]
pub use confirm::{ConfirmCall, FakeConfirm};
