// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    app_cache = { "/sdcard/Android/data/com.foo/cache/img.0" },
    nested_cache = { "/sdcard/.WebViewCache/entry" },
    preload = { "/sdcard/preloads/video.mp4" },
    tmp_dir = { "/data/local/tmp/probe" },
    temp_dir = { "/sdcard/temp/x.bin" },
)]
fn cache_paths_match(path: &str) {
    assert!(PathFilter::is_cache_path(path), "should match: {}", path);
}

#[parameterized(
    photo = { "/sdcard/DCIM/Camera/IMG_0001.jpg" },
    music = { "/sdcard/Music/song.mp3" },
    cachet_word = { "/sdcard/Documents/cachet-report.pdf" },
)]
fn regular_paths_do_not_match_cache(path: &str) {
    assert!(!PathFilter::is_cache_path(path), "should not match: {}", path);
}

#[parameterized(
    thumbnails_dir = { "/sdcard/DCIM/.thumbnails/1234.jpg" },
    lost_dir = { "/sdcard/LOST.DIR/4711" },
    trash = { "/sdcard/.Trash/old.png" },
    thumb_ext = { "/sdcard/Pictures/img.thumb" },
    dump_ext = { "/data/anr/trace.dmp" },
    thumbs_db = { "/sdcard/Pictures/thumbs.db" },
    desktop_ini = { "/sdcard/desktop.ini" },
)]
fn thumbnail_dump_paths_match(path: &str) {
    assert!(
        PathFilter::is_thumbnail_or_dump(path),
        "should match: {}",
        path
    );
}

#[test]
fn real_media_survives_thumbnail_filter() {
    assert!(!PathFilter::is_thumbnail_or_dump(
        "/sdcard/DCIM/Camera/VID_20230416_120000.mp4"
    ));
}

#[test]
fn options_compose() {
    let cache_only = FilterOptions {
        ignore_cache: true,
        ignore_thumbnails: false,
    };
    assert!(PathFilter::excluded("/sdcard/tmp/a", cache_only));
    assert!(!PathFilter::excluded("/sdcard/LOST.DIR/a", cache_only));
    assert!(PathFilter::excluded("/sdcard/LOST.DIR/a", FilterOptions::all()));
    assert!(!PathFilter::excluded("/sdcard/DCIM/a.jpg", FilterOptions::all()));
    assert!(!PathFilter::excluded("/sdcard/tmp/a", FilterOptions::none()));
}
