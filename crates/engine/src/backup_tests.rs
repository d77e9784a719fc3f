// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mdt_adapters::FakeBridge;
use mdt_core::DeviceState;

fn connected_device(serial: &str) -> Device {
    let mut device = Device::new(serial, DeviceState::Connected);
    device.model = "TestPhone".into();
    device
}

fn manager_with_device(serial: &str) -> (FakeBridge, BackupManager<FakeBridge>, tempfile::TempDir) {
    let bridge = FakeBridge::new();
    bridge.add_device(connected_device(serial));
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BackupStore::open(dir.path()).expect("store");
    (bridge.clone(), BackupManager::new(bridge, store), dir)
}

#[tokio::test]
async fn refuses_disconnected_device() {
    let bridge = FakeBridge::new();
    bridge.add_device(Device::new("S1", DeviceState::Unauthorized));
    let dir = tempfile::tempdir().unwrap();
    let manager = BackupManager::new(bridge, BackupStore::open(dir.path()).unwrap());

    let result = manager.backup_files("S1", &[FileCategory::Photos], &[]).await;
    assert!(matches!(result, Err(OperationError::Validation(_))));

    let result = manager.backup_files("ABSENT", &[FileCategory::Photos], &[]).await;
    assert!(matches!(result, Err(OperationError::Validation(_))));
}

#[tokio::test]
async fn files_backup_pulls_and_writes_manifest() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_file("/sdcard/DCIM/a.jpg", b"aaaa".to_vec());
    bridge.add_file("/sdcard/Pictures/b.png", b"bb".to_vec());
    bridge.add_file("/sdcard/DCIM/.thumbnails/t.jpg", b"t".to_vec());

    let manifest = manager
        .backup_files("S1", &[FileCategory::Photos], &[])
        .await
        .unwrap();

    assert_eq!(manifest.backup_type, BackupKind::Files);
    assert_eq!(manifest.file_count, 2, "thumbnails are filtered out");
    assert_eq!(manifest.categories, vec!["photos".to_string()]);
    assert!(!manifest.timestamp.is_empty());

    // Listed through the store, and the staged files landed on disk
    let listed = manager.list_backups();
    assert_eq!(listed.len(), 1);
    let staged = manager
        .store()
        .backup_dir(&manifest.backup_id)
        .join("files/sdcard/DCIM/a.jpg");
    assert_eq!(std::fs::read(staged).unwrap(), b"aaaa");
}

#[tokio::test]
async fn split_apk_backup_uses_per_package_directory() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_package(
        "com.foo",
        &[
            "/data/app/com.foo/base.apk",
            "/data/app/com.foo/split_config.arm64.apk",
            "/data/app/com.foo/split_config.xxhdpi.apk",
        ],
    );
    bridge.add_package("com.single", &["/data/app/com.single/base.apk"]);

    let manifest = manager.backup_apps("S1", false, None).await.unwrap();
    assert_eq!(manifest.app_count, 2);
    assert!(manifest.apps.contains(&"com.foo".to_string()));

    let apk_dir = manager.store().backup_dir(&manifest.backup_id).join("apks");
    // Split package: its own directory with all three parts
    let split: Vec<_> = std::fs::read_dir(apk_dir.join("com.foo"))
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(split.len(), 3);
    // Single package: flat file
    assert!(apk_dir.join("com.single.apk").is_file());
    assert!(!apk_dir.join("com.single").exists());
}

#[tokio::test]
async fn apps_backup_with_data_invokes_confirmed_archive() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_package("com.foo", &["/data/app/com.foo/base.apk"]);
    let confirm = mdt_adapters::FakeConfirm::new();
    manager.operation().set_confirm(std::sync::Arc::new(confirm.clone()));

    let manifest = manager.backup_apps("S1", true, None).await.unwrap();
    assert_eq!(manifest.app_count, 1);
    assert_eq!(confirm.open_overlays(), 0, "overlay dismissed");
    assert!(!confirm.calls().is_empty());

    let data = manager
        .store()
        .backup_dir(&manifest.backup_id)
        .join("app_data.ab");
    assert!(data.is_file(), "bridge backup wrote the archive");
    let backup_call = bridge
        .calls()
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("backup"))
        .expect("backup invoked");
    assert!(backup_call.args.contains(&"-noapk".to_string()));
    assert!(backup_call.args.contains(&"com.foo".to_string()));
}

#[tokio::test]
async fn full_backup_flags_follow_options() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    let manifest = manager
        .backup_full(
            "S1",
            FullBackupOptions {
                include_apks: false,
                include_shared: true,
                include_system: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(manifest.backup_type, BackupKind::Full);

    let call = bridge
        .calls()
        .into_iter()
        .find(|c| c.args.first().map(String::as_str) == Some("backup"))
        .unwrap();
    let args = call.args.join(" ");
    assert!(args.contains("-all -noapk -shared -nosystem -f"), "got: {}", args);
}

#[tokio::test]
async fn contacts_backup_records_successful_methods() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_shell_override(
        "content query --uri content://com.android.contacts/contacts",
        "Row: 0 _id=1, display_name=Alice Example, lookup=abc\nRow: 1 _id=2, display_name=Bob, lookup=def",
    );

    let manifest = manager.backup_contacts("S1").await.unwrap();
    assert!(manifest.notes.contains("vcf_content_query"), "notes: {}", manifest.notes);
    assert!(manifest.notes.contains("adb_backup"), "notes: {}", manifest.notes);

    let vcf = std::fs::read_to_string(
        manager
            .store()
            .backup_dir(&manifest.backup_id)
            .join("contacts.vcf"),
    )
    .unwrap();
    assert!(vcf.contains("FN:Alice Example"));
    assert!(vcf.contains("FN:Bob"));
}

#[tokio::test]
async fn sms_backup_writes_json_dump() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_shell_override(
        "content query --uri content://sms",
        "Row: 0 address=+15551234, body=hello, world, date=1681649000000, type=1, read=1\n\
         Row: 1 address=+15559876, body=bye, date=1681649100000, type=2, read=1",
    );

    let manifest = manager.backup_sms("S1").await.unwrap();
    assert_eq!(manifest.file_count, 2);

    let json = std::fs::read_to_string(
        manager
            .store()
            .backup_dir(&manifest.backup_id)
            .join("sms_backup.json"),
    )
    .unwrap();
    let messages: Vec<SmsRecord> = serde_json::from_str(&json).unwrap();
    assert_eq!(messages[0].body, "hello, world", "commas in bodies survive");
    assert_eq!(messages[0].address, "+15551234");
    assert_eq!(messages[1].r#type, "2");
}

#[tokio::test]
async fn messaging_backup_pulls_detected_media() {
    let (bridge, manager, _dir) = manager_with_device("S1");
    bridge.add_package("com.whatsapp", &["/data/app/wa/base.apk"]);
    bridge.add_file(
        "/sdcard/Android/media/com.whatsapp/WhatsApp/Media/IMG-20230416-WA0001.jpg",
        vec![1u8; 64],
    );

    let manifest = manager.backup_messaging("S1", None).await.unwrap();
    assert_eq!(manifest.messaging_apps, vec!["whatsapp".to_string()]);
    assert_eq!(manifest.file_count, 1);
}

#[test]
fn sms_row_parser_handles_null_and_missing_fields() {
    let raw = "Row: 0 address=NULL, body=x, date=1, type=1, read=1\n\
               Row: 1 address=+1555, body=ok, date=2, type=1, read=0\n\
               not a row";
    let records = parse_sms_rows(raw);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].address, "+1555");
    assert_eq!(records[0].read, "0");
}

#[test]
fn contact_name_parser_skips_null() {
    let raw = "Row: 0 _id=1, display_name=NULL, lookup=x\nRow: 1 _id=2, display_name=Carol, lookup=y";
    assert_eq!(parse_contact_names(raw), vec!["Carol".to_string()]);
}

#[test]
fn staged_pairs_reconstruct_remote_paths() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("files");
    std::fs::create_dir_all(base.join("sdcard/DCIM")).unwrap();
    std::fs::write(base.join("sdcard/DCIM/a.jpg"), b"x").unwrap();

    let pairs = staged_pairs(&base);
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].1, "/sdcard/DCIM/a.jpg");
}
