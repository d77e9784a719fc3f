// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdt_adapters::FakeBridge;
use mdt_core::{BackupKind, Device, DeviceState};

fn store_with_backup(kind: BackupKind) -> (tempfile::TempDir, BackupStore, String) {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::open(dir.path()).unwrap();
    let device = Device::new("SRC", DeviceState::Connected);
    let (_, backup_id) = store.create_backup_dir(&device, kind).unwrap();
    let manifest = BackupManifest::new(&backup_id, kind, &device);
    store.save_manifest(&manifest).unwrap();
    (dir, store, backup_id)
}

#[tokio::test]
async fn unknown_backup_is_a_validation_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = BackupStore::open(dir.path()).unwrap();
    let manager = RestoreManager::new(FakeBridge::new(), store);
    let result = manager.restore_files("TGT", "no_such_backup").await;
    assert!(matches!(result, Err(OperationError::Store(_))));
}

#[tokio::test]
async fn restore_files_pushes_staged_tree() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Files);
    let files_root = store.backup_dir(&backup_id).join("files/sdcard/DCIM");
    std::fs::create_dir_all(&files_root).unwrap();
    std::fs::write(files_root.join("a.jpg"), b"aaaa").unwrap();

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let phase = manager.restore_files("TGT", &backup_id).await.unwrap();
    assert_eq!(phase, Phase::Complete);
    assert_eq!(bridge.file("/sdcard/DCIM/a.jpg").unwrap(), b"aaaa");
}

#[tokio::test]
async fn split_apk_directory_uses_install_multiple() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Apps);
    let apk_dir = store.backup_dir(&backup_id).join("apks");
    // Split package: directory with three parts
    let split = apk_dir.join("com.foo");
    std::fs::create_dir_all(&split).unwrap();
    for name in ["base.apk", "split_config.arm64.apk", "split_config.pt.apk"] {
        std::fs::write(split.join(name), b"apk").unwrap();
    }
    // Single package: flat file
    std::fs::write(apk_dir.join("com.single.apk"), b"apk").unwrap();

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let (installed, total) = manager
        .restore_apps("TGT", &backup_id, None, false)
        .await
        .unwrap();
    assert_eq!((installed, total), (2, 2));

    let installs = bridge.installed();
    let multiple = installs
        .iter()
        .find(|args| args[0] == "install-multiple")
        .expect("split install used install-multiple");
    assert_eq!(multiple.iter().filter(|a| a.ends_with(".apk")).count(), 3);
    assert!(installs.iter().any(|args| args[0] == "install"));
}

#[tokio::test]
async fn restore_apps_honors_selection() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Apps);
    let apk_dir = store.backup_dir(&backup_id).join("apks");
    std::fs::create_dir_all(&apk_dir).unwrap();
    std::fs::write(apk_dir.join("com.keep.apk"), b"apk").unwrap();
    std::fs::write(apk_dir.join("com.skip.apk"), b"apk").unwrap();

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let selected = vec!["com.keep".to_string()];
    let (installed, total) = manager
        .restore_apps("TGT", &backup_id, Some(&selected), false)
        .await
        .unwrap();
    assert_eq!((installed, total), (1, 1));
}

#[tokio::test]
async fn contacts_restore_prefers_vcf_intent() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Contacts);
    let folder = store.backup_dir(&backup_id);
    std::fs::write(
        folder.join("contacts.vcf"),
        "BEGIN:VCARD\nVERSION:3.0\nFN:Alice\nEND:VCARD\n",
    )
    .unwrap();

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let method = manager.restore_contacts("TGT", &backup_id).await.unwrap();
    assert_eq!(method, Some(RestoreMethod::ContentProvider));

    assert!(bridge.file("/sdcard/contacts_restore.vcf").is_some());
    let intents: Vec<String> = bridge
        .shell_calls()
        .into_iter()
        .filter(|c| c.starts_with("am start"))
        .collect();
    assert_eq!(intents.len(), 1);
    assert!(intents[0].contains("text/x-vcard"));
}

#[tokio::test]
async fn contacts_restore_falls_back_to_archive() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Contacts);
    let folder = store.backup_dir(&backup_id);
    // No VCF; a non-empty archive instead
    std::fs::write(folder.join("contacts.ab"), vec![0u8; 100]).unwrap();

    let bridge = FakeBridge::new();
    let confirm = mdt_adapters::FakeConfirm::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    manager
        .operation()
        .set_confirm(std::sync::Arc::new(confirm.clone()));
    let method = manager.restore_contacts("TGT", &backup_id).await.unwrap();
    assert_eq!(method, Some(RestoreMethod::BridgeArchive));
    assert_eq!(confirm.open_overlays(), 0);
}

#[tokio::test]
async fn contacts_restore_skips_empty_archive() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Contacts);
    // 24 bytes or fewer means the OS produced a header-only archive
    std::fs::write(store.backup_dir(&backup_id).join("contacts.ab"), vec![0u8; 24]).unwrap();

    let manager = RestoreManager::new(FakeBridge::new(), store);
    let method = manager.restore_contacts("TGT", &backup_id).await.unwrap();
    assert_eq!(method, None);
    assert!(manager.operation().has_errors());
}

#[tokio::test]
async fn sms_restore_inserts_each_message() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::Sms);
    let messages = vec![
        SmsRecord {
            address: "+15551234".into(),
            body: "it's here, finally".into(),
            date: "1681649000000".into(),
            r#type: "1".into(),
            read: "1".into(),
        },
        SmsRecord {
            address: "+15559876".into(),
            body: "bye".into(),
            date: String::new(),
            r#type: "2".into(),
            read: "1".into(),
        },
    ];
    std::fs::write(
        store.backup_dir(&backup_id).join("sms_backup.json"),
        serde_json::to_string(&messages).unwrap(),
    )
    .unwrap();

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let method = manager.restore_sms("TGT", &backup_id).await.unwrap();
    assert_eq!(method, Some(RestoreMethod::ContentProvider));

    let inserts = bridge.content_inserts();
    assert_eq!(inserts.len(), 2);
    // Quote-escaped body and bound date
    assert!(inserts[0].contains("body:s:'it'\\''s here, finally'"), "got: {}", inserts[0]);
    assert!(inserts[0].contains("--bind date:l:1681649000000"));
    assert!(!inserts[1].contains("date:l:"), "empty date is not bound");
}

#[tokio::test]
async fn unsynced_restore_runs_one_archive_per_package() {
    let (_dir, store, backup_id) = store_with_backup(BackupKind::UnsyncedApps);
    // Rewrite the manifest with packages
    let mut manifest = store.manifest(&backup_id).unwrap();
    manifest.unsynced_packages = vec!["com.a".to_string(), "com.b".to_string()];
    store.save_manifest(&manifest).unwrap();
    let unsynced = store.backup_dir(&backup_id).join("unsynced");
    std::fs::create_dir_all(&unsynced).unwrap();
    std::fs::write(unsynced.join("com.a.ab"), vec![0u8; 100]).unwrap();
    // com.b archive is missing: recorded, not fatal

    let bridge = FakeBridge::new();
    let manager = RestoreManager::new(bridge.clone(), store);
    let phase = manager.restore_unsynced("TGT", &backup_id).await.unwrap();
    assert_eq!(phase, Phase::CompleteWithErrors);

    let restores = bridge
        .calls()
        .into_iter()
        .filter(|c| c.args.first().map(String::as_str) == Some("restore"))
        .count();
    assert_eq!(restores, 1);
}
