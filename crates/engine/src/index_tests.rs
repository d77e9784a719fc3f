// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdt_adapters::FakeBridge;

fn noop_progress() -> impl Fn(&str, f64) + Send + Sync {
    |_label, _pct| {}
}

#[test]
fn parse_stat_lines_drops_malformed() {
    let out = "/sdcard/a.jpg|100\ngarbage line\n/sdcard/b with space.jpg|200\n|5\n/sdcard/c.jpg|notanumber\n";
    let mut entries = Vec::new();
    parse_stat_lines(out, |path, size| entries.push((path.to_string(), size)));
    assert_eq!(
        entries,
        vec![
            ("/sdcard/a.jpg".to_string(), 100),
            ("/sdcard/b with space.jpg".to_string(), 200),
            // unparsable size degrades to zero rather than losing the path
            ("/sdcard/c.jpg".to_string(), 0),
        ]
    );
}

#[tokio::test]
async fn list_remote_files_applies_filters() {
    let bridge = FakeBridge::new();
    bridge.add_file("/sdcard/DCIM/a.jpg", vec![1u8; 10]);
    bridge.add_file("/sdcard/DCIM/.thumbnails/t.jpg", vec![1u8; 5]);
    bridge.add_file("/sdcard/tmp/x.bin", vec![1u8; 7]);

    let cancel = CancelToken::new();
    let roots = vec!["/sdcard".to_string()];

    let unfiltered =
        list_remote_files(&bridge, "S", &roots, FilterOptions::none(), &cancel).await;
    assert_eq!(unfiltered.len(), 3);

    let filtered = list_remote_files(&bridge, "S", &roots, FilterOptions::all(), &cancel).await;
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].path, "/sdcard/DCIM/a.jpg");
    assert_eq!(filtered[0].size, 10);
}

#[tokio::test]
async fn cancelled_scan_returns_partial() {
    let bridge = FakeBridge::new();
    bridge.add_file("/sdcard/DCIM/a.jpg", vec![1u8; 10]);
    let cancel = CancelToken::new();
    cancel.cancel();
    let files = list_remote_files(
        &bridge,
        "S",
        &["/sdcard".to_string()],
        FilterOptions::none(),
        &cancel,
    )
    .await;
    assert!(files.is_empty());
}

#[tokio::test]
async fn adaptive_scan_dedupes_equivalent_mounts() {
    let bridge = FakeBridge::new();
    bridge.add_file("/sdcard/DCIM/a.jpg", vec![1u8; 2048]);
    bridge.add_file("/storage/emulated/0/DCIM/a.jpg", vec![1u8; 2048]);

    let spec = ScanSpec {
        extensions: vec![".jpg".to_string()],
        min_size: 1024,
        max_depth: 6,
        filters: FilterOptions::none(),
    };
    let cancel = CancelToken::new();
    let roots = vec![
        "/sdcard/DCIM".to_string(),
        "/storage/emulated/0/DCIM".to_string(),
    ];
    let files = index_adaptive(&bridge, "S", &roots, &spec, &cancel, &noop_progress()).await;
    assert_eq!(files.len(), 1, "equivalent mounts must not double count");
}

#[tokio::test]
async fn adaptive_scan_filters_extension_and_size() {
    let bridge = FakeBridge::new();
    bridge.add_file("/sdcard/DCIM/big.jpg", vec![1u8; 4096]);
    bridge.add_file("/sdcard/DCIM/small.jpg", vec![1u8; 100]);
    bridge.add_file("/sdcard/DCIM/notes.txt", vec![1u8; 4096]);

    let spec = ScanSpec {
        extensions: vec![".jpg".to_string()],
        min_size: 1024,
        max_depth: 6,
        filters: FilterOptions::none(),
    };
    let cancel = CancelToken::new();
    let files = index_adaptive(
        &bridge,
        "S",
        &["/sdcard/DCIM".to_string()],
        &spec,
        &cancel,
        &noop_progress(),
    )
    .await;
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, "/sdcard/DCIM/big.jpg");
}

#[tokio::test]
async fn adaptive_scan_splits_on_overflow() {
    let bridge = FakeBridge::new();
    // 6 files spread over two subdirectories plus one shallow file
    bridge.add_file("/sdcard/Media/top.jpg", vec![1u8; 2048]);
    for i in 0..3 {
        bridge.add_file(&format!("/sdcard/Media/Sent/s{}.jpg", i), vec![2u8; 2048]);
        bridge.add_file(&format!("/sdcard/Media/Recv/r{}.jpg", i), vec![3u8; 2048]);
    }
    // Any scan yielding more than 3 stat lines "overflows" and returns empty
    bridge.set_scan_line_limit(Some(3));

    let spec = ScanSpec {
        extensions: vec![".jpg".to_string()],
        min_size: 1024,
        max_depth: 8,
        filters: FilterOptions::none(),
    };
    let cancel = CancelToken::new();
    let files = index_adaptive(
        &bridge,
        "S",
        &["/sdcard/Media".to_string()],
        &spec,
        &cancel,
        &noop_progress(),
    )
    .await;
    assert_eq!(files.len(), 7, "split scan must recover every file");
}
