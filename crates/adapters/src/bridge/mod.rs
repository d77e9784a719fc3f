// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device bridge adapters
//!
//! The bridge wraps the external command-line binary that talks to a
//! connected device. All invocations on one bridge instance are serialized
//! because the binary keeps process-level state (server port, transport);
//! interleaved invocations corrupt it. Parallelism happens one level up by
//! dispatching bridge *calls* concurrently — each spends nearly all of its
//! time blocked on USB I/O, so the serialization lock is not the
//! bottleneck.

mod adb;
mod ops;

pub use adb::AdbBridge;
pub use ops::BridgeOps;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeBridge;

use crate::subprocess::{ENUMERATE_TIMEOUT, TRANSFER_TIMEOUT};
use async_trait::async_trait;
use mdt_core::Device;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from bridge operations
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Bridge binary could not be located
    #[error("bridge binary not configured")]
    NotConfigured,
    #[error("bridge I/O error: {0}")]
    Io(String),
    #[error("{description} timed out after {seconds}s")]
    Timeout { description: String, seconds: u64 },
}

/// Result of one bridge invocation.
///
/// A non-zero exit code is not an error at this layer — it is returned to
/// the caller, which decides how to treat it. Stdout and stderr are always
/// present (lossy UTF-8 decode, never null).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BridgeOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl BridgeOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Single-quote a value for an on-device shell command line.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Adapter over the external device bridge (adb or equivalent).
#[async_trait]
pub trait Bridge: Clone + Send + Sync + 'static {
    /// Run a bridge command (`adb [-s serial] <args…>`).
    async fn run(
        &self,
        serial: Option<&str>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<BridgeOutput, BridgeError>;

    /// Run an on-device shell command and return its stdout.
    ///
    /// Failures (including timeouts) collapse to an empty string with a
    /// warning logged; parsers upstream must tolerate missing output.
    async fn run_shell(&self, serial: &str, command: &str, timeout: Duration) -> String {
        match self.run(Some(serial), &["shell", command], timeout).await {
            Ok(output) => output.stdout.trim_end().to_string(),
            Err(err) => {
                tracing::warn!(serial, error = %err, command = %truncate(command), "shell command failed");
                String::new()
            }
        }
    }

    /// Push a local file to the device. Extended transfer timeout.
    async fn push(&self, serial: &str, local: &Path, remote: &str) -> bool {
        let local_str = local.display().to_string();
        match self
            .run(
                Some(serial),
                &["push", &local_str, remote],
                TRANSFER_TIMEOUT,
            )
            .await
        {
            Ok(output) => output.success(),
            Err(err) => {
                tracing::warn!(serial, remote, error = %err, "push failed");
                false
            }
        }
    }

    /// Pull a remote file to a local path. Extended transfer timeout.
    async fn pull(&self, serial: &str, remote: &str, local: &Path) -> bool {
        let local_str = local.display().to_string();
        match self
            .run(
                Some(serial),
                &["pull", remote, &local_str],
                TRANSFER_TIMEOUT,
            )
            .await
        {
            Ok(output) => output.success(),
            Err(err) => {
                tracing::warn!(serial, remote, error = %err, "pull failed");
                false
            }
        }
    }

    /// Enumerate connected devices (`devices -l`).
    async fn enumerate(&self) -> Result<Vec<Device>, BridgeError> {
        let output = self.run(None, &["devices", "-l"], ENUMERATE_TIMEOUT).await?;
        let devices = output
            .stdout
            .lines()
            .skip(1)
            .filter_map(Device::parse_listing_line)
            .collect();
        Ok(devices)
    }
}

fn truncate(command: &str) -> &str {
    command.get(..120).unwrap_or(command)
}
