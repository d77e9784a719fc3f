// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backup → restore round trips

use crate::prelude::*;
use mdt_adapters::{Bridge, FakeConfirm};
use mdt_core::{BackupKind, Phase};
use mdt_engine::{BackupManager, RestoreManager};
use std::sync::Arc;

/// Scenario: package com.foo reports three APK paths. The backup stores
/// `apks/com.foo/` with three files; restore detects the shape and
/// installs via `install-multiple` with all three parts.
#[tokio::test]
async fn split_apk_backup_and_restore() {
    let bridge = device_pair();
    bridge.add_package(
        "com.foo",
        &[
            "/data/app/com.foo/base.apk",
            "/data/app/com.foo/split_config.arm64.apk",
            "/data/app/com.foo/split_config.xxhdpi.apk",
        ],
    );
    let (_guard, store) = temp_store();

    let backup = BackupManager::new(bridge.clone(), store.clone());
    let manifest = backup.backup_apps("SRC", false, None).await.unwrap();
    assert_eq!(manifest.backup_type, BackupKind::Apps);
    assert_eq!(manifest.apps, vec!["com.foo".to_string()]);

    let split_dir = store.backup_dir(&manifest.backup_id).join("apks/com.foo");
    let parts = std::fs::read_dir(&split_dir).unwrap().count();
    assert_eq!(parts, 3, "three APKs stored in the per-package directory");

    let restore = RestoreManager::new(bridge.clone(), store);
    let (installed, total) = restore
        .restore_apps("TGT", &manifest.backup_id, None, false)
        .await
        .unwrap();
    assert_eq!((installed, total), (1, 1));

    let install = bridge
        .installed()
        .into_iter()
        .find(|args| args[0] == "install-multiple")
        .expect("split restore must use install-multiple");
    assert_eq!(install.iter().filter(|a| a.ends_with(".apk")).count(), 3);
}

/// Backup → restore of a custom path set: every file that existed before
/// the backup exists after the restore.
#[tokio::test]
async fn custom_path_round_trip() {
    let bridge = device_pair();
    bridge.add_file("/sdcard/Work/report.pdf", b"report body".to_vec());
    bridge.add_file("/sdcard/Work/notes/todo.txt", b"todo list".to_vec());
    let (_guard, store) = temp_store();

    let backup = BackupManager::new(bridge.clone(), store.clone());
    let paths = vec!["/sdcard/Work".to_string()];
    let manifest = backup.backup_custom("SRC", &paths).await.unwrap();
    assert_eq!(manifest.file_count, 2);
    assert_eq!(manifest.custom_paths, paths);

    // Wipe the originals, then restore to the target
    bridge
        .run_shell("SRC", "rm -rf '/sdcard/Work' 2>/dev/null", std::time::Duration::from_secs(5))
        .await;
    assert!(bridge.file("/sdcard/Work/report.pdf").is_none());

    let restore = RestoreManager::new(bridge.clone(), store);
    let phase = restore.restore_custom("TGT", &manifest.backup_id).await.unwrap();
    assert_eq!(phase, Phase::Complete);
    assert_eq!(bridge.file("/sdcard/Work/report.pdf").unwrap(), b"report body");
    assert_eq!(bridge.file("/sdcard/Work/notes/todo.txt").unwrap(), b"todo list");
}

/// SMS round trip: provider dump → JSON → per-message content inserts,
/// preserving bodies with commas and quotes.
#[tokio::test]
async fn sms_round_trip_preserves_bodies() {
    let bridge = device_pair();
    bridge.add_shell_override(
        "content query --uri content://sms",
        "Row: 0 address=+15551111, body=don't forget, ok?, date=1681649000000, type=1, read=1",
    );
    let (_guard, store) = temp_store();

    let backup = BackupManager::new(bridge.clone(), store.clone());
    let manifest = backup.backup_sms("SRC").await.unwrap();
    assert_eq!(manifest.file_count, 1);

    let restore = RestoreManager::new(bridge.clone(), store);
    let method = restore.restore_sms("TGT", &manifest.backup_id).await.unwrap();
    assert!(method.is_some());

    let inserts = bridge.content_inserts();
    assert_eq!(inserts.len(), 1);
    assert!(
        inserts[0].contains("don'\\''t forget, ok?"),
        "body must survive quoting: {}",
        inserts[0]
    );
}

/// The backup enumerator only accepts manifest-bearing directories, and
/// every accepted manifest round-trips its type through the enum.
#[tokio::test]
async fn enumeration_requires_manifest() {
    let bridge = single_device("S1");
    bridge.add_file("/sdcard/DCIM/a.jpg", b"img".to_vec());
    let (_guard, store) = temp_store();

    let backup = BackupManager::new(bridge, store.clone());
    let manifest = backup
        .backup_files("S1", &[mdt_engine::FileCategory::Photos], &[])
        .await
        .unwrap();

    // Sabotage: a second directory without a manifest
    std::fs::create_dir_all(store.root().join("half_finished_backup")).unwrap();

    let listed = backup.list_backups();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].backup_id, manifest.backup_id);
    assert_eq!(listed[0].backup_type, BackupKind::Files);
}

/// Confirmation overlays are strictly paired across a data backup.
#[tokio::test]
async fn confirmation_pairs_across_operations() {
    let bridge = single_device("S1");
    bridge.add_package("com.foo", &["/data/app/foo/base.apk"]);
    let (_guard, store) = temp_store();

    let confirm = FakeConfirm::new();
    let backup = BackupManager::new(bridge.clone(), store.clone());
    backup.operation().set_confirm(Arc::new(confirm.clone()));
    backup.backup_apps("S1", true, None).await.unwrap();

    let restore = RestoreManager::new(bridge, store);
    restore.operation().set_confirm(Arc::new(confirm.clone()));
    let manifest_id = backup.list_backups()[0].backup_id.clone();
    restore
        .restore_apps("S1", &manifest_id, None, true)
        .await
        .unwrap();

    assert_eq!(confirm.open_overlays(), 0, "every show has its dismiss");
    assert!(confirm.calls().len() >= 4);
}
