// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote-path helpers: mount canonicalization and package-name checks.
//!
//! `/storage/emulated/0` and `/sdcard` are the same mount on every device
//! this toolkit targets. Scans canonicalize to the `/sdcard` spelling once
//! so overlapping roots never double-count a file.

use regex::Regex;
use std::sync::LazyLock;

/// Java-style package identifier: at least two dot-separated segments.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static PACKAGE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9_]*(\.[a-zA-Z][a-zA-Z0-9_]*)+$")
        .expect("constant regex pattern is valid")
});

/// Canonical spelling of a remote path for dedup bookkeeping.
pub fn canonical_remote(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/storage/emulated/0") {
        if rest.is_empty() {
            return "/sdcard".to_string();
        }
        if rest.starts_with('/') {
            return format!("/sdcard{}", rest);
        }
    }
    path.to_string()
}

/// Whether a directory name looks like an installed-app package id.
pub fn is_package_name(name: &str) -> bool {
    PACKAGE_NAME.is_match(name)
}

/// Final component of a remote (POSIX) path.
pub fn remote_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Parent of a remote (POSIX) path, without trailing slash.
pub fn remote_parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "",
    }
}
