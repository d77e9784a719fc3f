// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Two-device clone scenarios

use crate::prelude::*;
use mdt_core::Phase;
use mdt_engine::transfer::DEFAULT_STORAGE_PATH;
use mdt_engine::TransferManager;
use parking_lot::Mutex;
use std::sync::Arc;

/// Scenario: source has `/sdcard/a.txt` ("hello") and `/sdcard/dir/b.txt`
/// ("world"); after the clone the target carries both files byte-identical
/// at the same paths and verification reports matched=2, mismatched=0.
#[tokio::test]
async fn two_device_clone_round_trips_bytes() {
    let bridge = device_pair();
    bridge.add_file("/storage/emulated/0/a.txt", b"hello".to_vec());
    bridge.add_file("/storage/emulated/0/dir/b.txt", b"world".to_vec());

    let work = tempfile::tempdir().unwrap();
    let manager = TransferManager::new(bridge.clone(), work.path());

    let report = manager
        .clone_full_storage("SRC", "TGT", DEFAULT_STORAGE_PATH)
        .await
        .expect("clone starts");

    assert_eq!(report.indexed, 2);
    assert_eq!(report.pulled, 2);
    assert_eq!(report.pushed, 2);
    assert_eq!(report.verified_matched, 2);
    assert_eq!(report.verified_mismatched, 0);
    assert_eq!(bridge.file("/storage/emulated/0/a.txt").unwrap(), b"hello");
    assert_eq!(
        bridge.file("/storage/emulated/0/dir/b.txt").unwrap(),
        b"world"
    );
}

/// Universal invariant: the progress sink sees a terminal phase before the
/// operation returns, and counters never exceed totals.
#[tokio::test]
async fn clone_emits_terminal_phase_and_bounded_counters() {
    let bridge = device_pair();
    for i in 0..10 {
        bridge.add_file(
            &format!("/storage/emulated/0/DCIM/img{}.jpg", i),
            vec![i as u8; 256],
        );
    }

    let work = tempfile::tempdir().unwrap();
    let manager = TransferManager::new(bridge, work.path());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink_events = Arc::clone(&events);
    manager
        .operation()
        .set_progress_sink(Arc::new(move |p| sink_events.lock().push(p)));

    let report = manager
        .clone_full_storage("SRC", "TGT", DEFAULT_STORAGE_PATH)
        .await
        .unwrap();
    assert!(report.phase.is_terminal());

    let events = events.lock();
    assert!(events.iter().any(|p| p.phase.is_terminal()));
    for progress in events.iter() {
        if progress.items_total > 0 {
            assert!(progress.items_done <= progress.items_total);
        }
        if progress.bytes_total > 0 {
            assert!(progress.bytes_done <= progress.bytes_total);
        }
        assert!(progress.percent <= 100.0);
    }
}

/// Validation failures refuse to start: same device, missing device,
/// wrong state.
#[tokio::test]
async fn clone_validation_refuses_bad_device_pairs() {
    let bridge = device_pair();
    let work = tempfile::tempdir().unwrap();
    let manager = TransferManager::new(bridge, work.path());

    assert!(manager
        .clone_full_storage("SRC", "SRC", DEFAULT_STORAGE_PATH)
        .await
        .is_err());
    assert!(manager
        .clone_full_storage("SRC", "MISSING", DEFAULT_STORAGE_PATH)
        .await
        .is_err());
}

/// Cancellation mid-transfer: no new pulls start once the flag is
/// observed, and a terminal phase is still emitted.
#[tokio::test]
async fn clone_cancellation_stops_new_pulls() {
    let bridge = device_pair();
    for i in 0..200 {
        bridge.add_file(
            &format!("/storage/emulated/0/Download/f{:03}.bin", i),
            vec![1u8; 64],
        );
    }

    let work = tempfile::tempdir().unwrap();
    let manager = TransferManager::new(bridge, work.path());
    let cancel = manager.operation().cancel_token();
    let terminal_seen = Arc::new(Mutex::new(false));
    let sink_terminal = Arc::clone(&terminal_seen);
    let sink_cancel = cancel.clone();
    manager
        .operation()
        .set_progress_sink(Arc::new(move |p: mdt_core::OperationProgress| {
            if p.items_done >= 20 {
                sink_cancel.cancel();
            }
            if p.phase.is_terminal() {
                *sink_terminal.lock() = true;
            }
        }));

    let report = manager
        .clone_full_storage("SRC", "TGT", DEFAULT_STORAGE_PATH)
        .await
        .unwrap();

    assert!(report.pulled >= 20);
    assert!(report.pulled < 200, "cancel must stop new pulls (got {})", report.pulled);
    assert!(matches!(
        report.phase,
        Phase::Complete | Phase::CompleteWithErrors
    ));
    assert!(*terminal_seen.lock());
}
