// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ADB bridge adapter

use super::{Bridge, BridgeError, BridgeOutput};
use crate::subprocess::run_with_timeout;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;

#[cfg(windows)]
const ADB_EXE: &str = "adb.exe";
#[cfg(not(windows))]
const ADB_EXE: &str = "adb";

/// ADB-backed bridge.
///
/// Holds the resolved binary path and the serialization lock. Cloning is
/// cheap; all clones share the same lock.
#[derive(Clone)]
pub struct AdbBridge {
    inner: Arc<Inner>,
}

struct Inner {
    binary: PathBuf,
    // adb keeps process-level transport state; one invocation at a time
    lock: Mutex<()>,
}

impl AdbBridge {
    /// Locate the adb binary: sibling `platform-tools/` first, then PATH.
    pub fn discover(base_dir: &Path) -> Result<Self, BridgeError> {
        let local = base_dir.join("platform-tools").join(ADB_EXE);
        let binary = if local.is_file() {
            local
        } else {
            which::which("adb").map_err(|_| BridgeError::NotConfigured)?
        };
        tracing::info!(binary = %binary.display(), "adb located");
        Ok(Self::with_binary(binary))
    }

    /// Use an explicit binary path (tests, unusual installs).
    pub fn with_binary(binary: PathBuf) -> Self {
        Self {
            inner: Arc::new(Inner {
                binary,
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.inner.binary
    }

    pub async fn start_server(&self) -> Result<(), BridgeError> {
        self.run(None, &["start-server"], Duration::from_secs(30))
            .await
            .map(|_| ())
    }

    pub async fn kill_server(&self) -> Result<(), BridgeError> {
        self.run(None, &["kill-server"], Duration::from_secs(30))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl Bridge for AdbBridge {
    async fn run(
        &self,
        serial: Option<&str>,
        args: &[&str],
        timeout: Duration,
    ) -> Result<BridgeOutput, BridgeError> {
        let mut cmd = Command::new(&self.inner.binary);
        if let Some(serial) = serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);

        let description = args.first().copied().unwrap_or("adb");
        tracing::debug!(?serial, ?args, "running adb");

        let _guard = self.inner.lock.lock().await;
        let output = run_with_timeout(cmd, timeout, description)
            .await
            .map_err(|message| {
                if message.contains("timed out") {
                    BridgeError::Timeout {
                        description: description.to_string(),
                        seconds: timeout.as_secs(),
                    }
                } else {
                    BridgeError::Io(message)
                }
            })?;

        let result = BridgeOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            tracing::warn!(
                exit_code = result.exit_code,
                stderr = %result.stderr.trim(),
                "adb returned non-zero"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
#[path = "adb_tests.rs"]
mod tests;
