// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Path-level filters for expendable content.
//!
//! Two composable pattern sets: cache-family paths and thumbnail/dump
//! leftovers. Each transfer stage declares which filters it applies.

use regex::Regex;
use std::sync::LazyLock;

/// Cache-family path segments: anything with "cache" or "preload" in a
/// segment name, plus bare tmp/temp directories.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static CACHE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(/|^)([^/]*(?:cache|preload)[^/]*|tmp|temp)(/|$)")
        .expect("constant regex pattern is valid")
});

/// Thumbnail and dump leftovers: thumbnail directories, trash bins,
/// LOST.DIR, loose dump/thumbnail files and the classic desktop droppings.
#[allow(clippy::expect_used)]
static THUMBNAIL_DUMP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(/|^)(\.thumbnails|\.Thumbs|thumbs|thumbnails|thumbnail|\.thumb|dump|\.dump|\.trashbin|\.Trash|LOST\.DIR)(/|$)|\.(thumb|dmp|mdmp|core)$|(thumbs\.db|desktop\.ini)$",
    )
    .expect("constant regex pattern is valid")
});

/// Which filters a scan applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterOptions {
    pub ignore_cache: bool,
    pub ignore_thumbnails: bool,
}

impl FilterOptions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            ignore_cache: true,
            ignore_thumbnails: true,
        }
    }
}

/// Stateless matcher over the two pattern sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathFilter;

impl PathFilter {
    pub fn is_cache_path(path: &str) -> bool {
        CACHE_PATTERN.is_match(path)
    }

    pub fn is_thumbnail_or_dump(path: &str) -> bool {
        THUMBNAIL_DUMP_PATTERN.is_match(path)
    }

    /// True when `path` should be skipped under `options`.
    pub fn excluded(path: &str, options: FilterOptions) -> bool {
        (options.ignore_cache && Self::is_cache_path(path))
            || (options.ignore_thumbnails && Self::is_thumbnail_or_dump(path))
    }
}

#[cfg(test)]
#[path = "filter_tests.rs"]
mod tests;
