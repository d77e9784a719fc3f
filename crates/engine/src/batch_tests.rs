// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdt_adapters::FakeBridge;
use mdt_core::CancelToken;

fn entries(bridge: &FakeBridge, count: usize, size: usize) -> Vec<FileEntry> {
    (0..count)
        .map(|i| {
            let path = format!("/sdcard/DCIM/f{:03}.jpg", i);
            bridge.add_file(&path, vec![i as u8; size]);
            FileEntry {
                path,
                size: size as u64,
            }
        })
        .collect()
}

#[tokio::test]
async fn pull_batch_copies_everything() {
    let bridge = FakeBridge::new();
    let files = entries(&bridge, 10, 64);
    let dir = tempfile::tempdir().unwrap();
    let op = Operation::new();
    op.begin();

    let outcome = pull_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        dir.path(),
        &ParallelismConfig::default(),
        BatchSpec {
            strip_prefix: "/sdcard".to_string(),
            ..Default::default()
        },
    )
    .await;

    assert_eq!(outcome.succeeded, 10);
    assert_eq!(outcome.bytes, 640);
    assert!(dir.path().join("DCIM/f000.jpg").is_file());
    assert!(dir.path().join("DCIM/f009.jpg").is_file());
    assert!(op.errors().is_empty());
}

#[tokio::test]
async fn pull_failure_continues_batch_and_records_error() {
    let bridge = FakeBridge::new();
    let files = entries(&bridge, 5, 32);
    bridge.fail_pull("/sdcard/DCIM/f002.jpg");
    let dir = tempfile::tempdir().unwrap();
    let op = Operation::new();
    op.begin();

    let outcome = pull_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        dir.path(),
        &ParallelismConfig::default(),
        BatchSpec::default(),
    )
    .await;

    assert_eq!(outcome.succeeded, 4);
    // Failed file still accounted in bytes_done
    assert_eq!(outcome.bytes, 160);
    let errors = op.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("f002.jpg"), "got: {:?}", errors);
}

#[tokio::test]
async fn pull_progress_bytes_are_monotone_and_bounded() {
    let bridge = FakeBridge::new();
    let files = entries(&bridge, 20, 16);
    let dir = tempfile::tempdir().unwrap();
    let op = Operation::new();
    let seen: Arc<Mutex<Vec<(u64, u64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    op.set_progress_sink(Arc::new(move |p| {
        sink_seen.lock().push((p.bytes_done, p.bytes_total));
    }));
    op.begin();

    pull_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        dir.path(),
        &ParallelismConfig::default(),
        BatchSpec::default(),
    )
    .await;

    let events = seen.lock();
    assert_eq!(events.len(), 20, "one update per completed file");
    let mut last = 0;
    for (done, total) in events.iter() {
        assert!(*done >= last, "bytes_done must be monotone");
        assert!(*done <= *total);
        last = *done;
    }
    assert_eq!(last, 320);
}

#[tokio::test]
async fn cancellation_stops_new_pulls() {
    let bridge = FakeBridge::new();
    let files = entries(&bridge, 50, 8);
    let dir = tempfile::tempdir().unwrap();
    let op = Operation::new();
    let cancel: CancelToken = op.cancel_token();
    let sink_cancel = cancel.clone();
    op.set_progress_sink(Arc::new(move |p| {
        if p.items_done >= 5 {
            sink_cancel.cancel();
        }
    }));
    op.begin();

    let outcome = pull_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        dir.path(),
        &ParallelismConfig::default(),
        BatchSpec::default(),
    )
    .await;

    assert!(outcome.succeeded >= 5);
    assert!(
        outcome.succeeded < 50,
        "no new pulls after the flag was observed (got {})",
        outcome.succeeded
    );
    assert!(op.is_cancelled());
}

#[tokio::test]
async fn push_batch_precreates_remote_dirs() {
    let bridge = FakeBridge::new();
    let dir = tempfile::tempdir().unwrap();
    let mut files = Vec::new();
    for i in 0..6 {
        let local = dir.path().join(format!("f{}.bin", i));
        std::fs::write(&local, vec![i as u8; 24]).unwrap();
        files.push((local, format!("/sdcard/restore/sub{}/f{}.bin", i % 2, i)));
    }
    let op = Operation::new();
    op.begin();

    let outcome = push_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        &ParallelismConfig::default(),
        BatchSpec {
            phase: mdt_core::Phase::Restoring,
            ..Default::default()
        },
    )
    .await;

    assert_eq!(outcome.succeeded, 6);
    assert_eq!(outcome.bytes, 144);
    assert_eq!(bridge.file("/sdcard/restore/sub0/f0.bin").unwrap(), vec![0u8; 24]);
    // mkdir ran before any push
    let calls = bridge.calls();
    let first_mkdir = calls
        .iter()
        .position(|c| c.args.get(1).map(|a| a.starts_with("mkdir -p")) == Some(true));
    let first_push = calls.iter().position(|c| c.args[0] == "push");
    assert!(first_mkdir.unwrap() < first_push.unwrap());
}

#[tokio::test]
async fn sequential_fallback_for_tiny_batches() {
    let bridge = FakeBridge::new();
    let files = entries(&bridge, 2, 10);
    let dir = tempfile::tempdir().unwrap();
    let op = Operation::new();
    op.begin();

    let outcome = pull_with_progress(
        &bridge,
        "S",
        &op,
        &files,
        dir.path(),
        &ParallelismConfig::default(),
        BatchSpec::default(),
    )
    .await;
    assert_eq!(outcome.succeeded, 2);
}
