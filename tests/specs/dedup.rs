// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dedup funnel scenarios

use crate::prelude::*;
use mdt_engine::{DedupEngine, DedupOptions};

fn options(root: &str) -> DedupOptions {
    DedupOptions {
        roots: vec![root.to_string()],
        min_size: 512,
        ..Default::default()
    }
}

/// Scenario: three identical 100 KiB files; the messaging-timestamped
/// name survives, the other two are deleted. Deterministic across runs.
#[tokio::test]
async fn whatsapp_media_dedup_keeps_timestamped_original() {
    for _run in 0..2 {
        let bridge = single_device("S1");
        let payload = vec![0xabu8; 102_400];
        for name in [
            "IMG-20230416-WA0030.jpg",
            "IMG-20230416-WA0030 (1).jpg",
            "photo_copy.jpg",
        ] {
            bridge.add_file(&format!("/sdcard/DCIM/{}", name), payload.clone());
        }

        let engine = DedupEngine::new(bridge.clone(), "S1");
        let report = engine.run(&options("/sdcard/DCIM")).await;

        assert_eq!(report.duplicates_removed, 2);
        assert_eq!(
            report.kept_originals,
            vec!["/sdcard/DCIM/IMG-20230416-WA0030.jpg".to_string()]
        );
        assert_eq!(bridge.file_paths().len(), 1);
    }
}

/// Scenario: two 5 MB files identical in their first and last 4 KiB but
/// differing at offset 2,500,000. Stage 2 pairs them, stage 3 splits
/// them, nothing is deleted.
#[tokio::test]
async fn false_positive_prevention_interior_difference() {
    let bridge = single_device("S1");
    let mut first = vec![0u8; 5 * 1024 * 1024];
    let mut second = first.clone();
    first[2_500_000] = 0x01;
    second[2_500_000] = 0x02;
    bridge.add_file("/sdcard/Movies/render_a.mp4", first);
    bridge.add_file("/sdcard/Movies/render_b.mp4", second);

    let engine = DedupEngine::new(bridge.clone(), "S1");
    let report = engine.run(&options("/sdcard/Movies")).await;

    assert_eq!(report.partial_hash_groups, 1);
    assert_eq!(report.full_hash_groups, 0);
    assert_eq!(report.duplicates_removed, 0);
    assert_eq!(bridge.file_paths().len(), 2, "no false positive deletions");
}

/// Files of unique size are never touched by the engine.
#[tokio::test]
async fn unique_sizes_never_touched() {
    let bridge = single_device("S1");
    for (i, size) in [1500usize, 2500, 3500].iter().enumerate() {
        bridge.add_file(&format!("/sdcard/Download/doc{}.pdf", i), vec![7u8; *size]);
    }

    let engine = DedupEngine::new(bridge.clone(), "S1");
    let report = engine.run(&options("/sdcard/Download")).await;

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.size_groups, 0);
    assert_eq!(report.duplicates_found, 0);
    assert_eq!(bridge.file_paths().len(), 3);
}

/// The adaptive indexer recovers a tree whose full scan overflows the
/// shell output buffer, and dedup still works over the split scans.
#[tokio::test]
async fn dedup_survives_scan_overflow() {
    let bridge = single_device("S1");
    let payload = vec![0x55u8; 60 * 1024];
    bridge.add_file("/sdcard/Media/Sent/dup_a.jpg", payload.clone());
    bridge.add_file("/sdcard/Media/Received/dup_b.jpg", payload.clone());
    for i in 0..3 {
        bridge.add_file(
            &format!("/sdcard/Media/Sent/unique{}.jpg", i),
            vec![i as u8; 10_000 + i * 17],
        );
    }
    // Any stat scan returning more than 4 lines comes back empty, so the
    // whole-tree scan (5 files) overflows while per-subdirectory scans fit
    bridge.set_scan_line_limit(Some(4));

    let engine = DedupEngine::new(bridge.clone(), "S1");
    let report = engine.run(&options("/sdcard/Media")).await;

    assert_eq!(report.files_scanned, 5, "split scan must see every file");
    assert_eq!(report.duplicates_removed, 1);
    let survivors = ["/sdcard/Media/Sent/dup_a.jpg", "/sdcard/Media/Received/dup_b.jpg"]
        .iter()
        .filter(|p| bridge.file(p).is_some())
        .count();
    assert_eq!(survivors, 1, "exactly one copy remains");
}
