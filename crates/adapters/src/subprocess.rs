// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subprocess execution helpers

use std::process::Output;
use std::time::Duration;
use tokio::process::Command;

/// Default timeout for device enumeration.
pub const ENUMERATE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for on-device shell commands.
pub const SHELL_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for storage indexing scans (large trees).
pub const INDEX_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for single-file push/pull transfers.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for single-APK installs.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Default timeout for split-APK installs.
pub const INSTALL_MULTIPLE_TIMEOUT: Duration = Duration::from_secs(600);

/// Default timeout for full backup/restore and other confirmation-gated
/// commands. The end user has to act on the device, so this is generous.
pub const BACKUP_RESTORE_TIMEOUT: Duration = Duration::from_secs(7200);

/// Run a subprocess command with a timeout.
///
/// Wraps `Command::output()` with `tokio::time::timeout`, converting
/// timeout expiration into a descriptive error message. The child process
/// is killed automatically if the timeout elapses (via the tokio `Child`
/// drop implementation).
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, String> {
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(io_err)) => Err(format!("{} failed: {}", description, io_err)),
        Err(_elapsed) => Err(format!(
            "{} timed out after {}s",
            description,
            timeout.as_secs()
        )),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
