// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cleanup engine scenarios, orphan safety above all

use crate::prelude::*;
use mdt_engine::{CleanupEngine, CleanupMode};

const CANARIES: [&str; 5] = [
    "android",
    "com.android.settings",
    "com.android.systemui",
    "com.android.phone",
    "com.android.providers.settings",
];

/// Scenario: the package list returns a single entry while
/// `/sdcard/Android/data` holds an uninstalled app's folder. The stage
/// refuses, deletes nothing, completes cleanly.
#[tokio::test]
async fn orphan_refusal_on_implausible_package_list() {
    let bridge = single_device("S1");
    bridge.add_file("/sdcard/Android/data/com.uninstalled/cache/blob", vec![0u8; 64]);
    bridge.set_package_list_override(Some(vec!["com.myapp".to_string()]));

    let engine = CleanupEngine::new(bridge.clone());
    let estimates = engine.estimate("S1", &[CleanupMode::Orphans]).await;
    let estimate = &estimates[&CleanupMode::Orphans];
    assert!(estimate.error.is_some());
    assert_eq!(estimate.total_items, 0);

    let results = engine.execute("S1", &estimates).await;
    assert_eq!(results[&CleanupMode::Orphans].items_removed, 0);
    assert!(
        bridge.dir_exists("/sdcard/Android/data/com.uninstalled"),
        "refused stage must not delete"
    );
}

/// With canaries present but no user apps, only non-canary folders are
/// ever evaluated for deletion.
#[tokio::test]
async fn orphan_scan_spares_canary_directories() {
    let bridge = single_device("S1");
    for canary in CANARIES {
        bridge.add_package(canary, &["/system/app/c.apk"]);
    }
    for i in 0..12 {
        bridge.add_package(&format!("com.sys.app{}", i), &["/system/app/s.apk"]);
    }
    // Data dirs: one canary, one orphan
    bridge.add_file("/sdcard/Android/data/com.android.settings/files/x", vec![0u8; 8]);
    bridge.add_file("/sdcard/Android/data/com.gone.app/files/x", vec![0u8; 8]);

    let engine = CleanupEngine::new(bridge.clone());
    let estimates = engine.estimate("S1", &[CleanupMode::Orphans]).await;
    let estimate = &estimates[&CleanupMode::Orphans];
    assert!(estimate.error.is_none());
    let paths: Vec<&str> = estimate.items.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(paths, vec!["/sdcard/Android/data/com.gone.app"]);

    engine.execute("S1", &estimates).await;
    assert!(bridge.dir_exists("/sdcard/Android/data/com.android.settings"));
    assert!(!bridge.dir_exists("/sdcard/Android/data/com.gone.app"));
}

/// The whole six-mode scan-then-execute cycle on a dirty device:
/// estimates price each mode, execution frees them, live data survives.
#[tokio::test]
async fn six_mode_scan_and_execute_cycle() {
    let bridge = single_device("S1");
    for canary in CANARIES {
        bridge.add_package(canary, &["/system/app/c.apk"]);
    }
    for i in 0..12 {
        bridge.add_package(&format!("com.user.app{}", i), &["/data/app/u.apk"]);
    }
    // app cache
    bridge.add_file("/data/data/com.user.app0/cache/tmpblob", vec![0u8; 4096]);
    // junk dir + junk file
    bridge.add_file("/sdcard/.thumbnails/small.jpg", vec![0u8; 1024]);
    bridge.add_file("/sdcard/Download/trace.log", vec![0u8; 512]);
    // known junk
    bridge.add_file("/data/anr/traces.txt", vec![0u8; 256]);
    // orphan
    bridge.add_file("/sdcard/Android/data/com.gone/f", vec![0u8; 128]);
    // duplicates
    let payload = vec![9u8; 50 * 1024];
    bridge.add_file("/sdcard/DCIM/IMG-20230416-WA0001.jpg", payload.clone());
    bridge.add_file("/sdcard/DCIM/copy of photo.jpg", payload.clone());
    // live data that must survive everything
    bridge.add_file("/sdcard/DCIM/holiday.jpg", vec![3u8; 9000]);

    let engine = CleanupEngine::new(bridge.clone());
    let estimates = engine.estimate("S1", &CleanupMode::ORDER).await;
    assert_eq!(estimates.len(), 6);
    for mode in [
        CleanupMode::JunkDirs,
        CleanupMode::JunkFiles,
        CleanupMode::KnownJunk,
        CleanupMode::Orphans,
        CleanupMode::Duplicates,
    ] {
        assert!(
            !estimates[&mode].items.is_empty(),
            "{} should nominate something",
            mode
        );
    }

    let results = engine.execute("S1", &estimates).await;
    assert!(results[&CleanupMode::Duplicates].items_removed >= 1);

    // Junk gone
    assert!(!bridge.dir_exists("/sdcard/.thumbnails"));
    assert!(bridge.file("/sdcard/Download/trace.log").is_none());
    assert!(!bridge.dir_exists("/data/anr"));
    assert!(!bridge.dir_exists("/sdcard/Android/data/com.gone"));
    assert!(bridge.file("/sdcard/DCIM/copy of photo.jpg").is_none());
    // Live data intact
    assert!(bridge.file("/sdcard/DCIM/holiday.jpg").is_some());
    assert!(bridge.file("/sdcard/DCIM/IMG-20230416-WA0001.jpg").is_some());
}
