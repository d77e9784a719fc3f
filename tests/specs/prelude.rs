// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs

use mdt_adapters::FakeBridge;
use mdt_core::{Device, DeviceState};
use mdt_storage::BackupStore;

/// A fake bridge with one connected device.
pub fn single_device(serial: &str) -> FakeBridge {
    let bridge = FakeBridge::new();
    let mut device = Device::new(serial, DeviceState::Connected);
    device.model = "SpecPhone".to_string();
    bridge.add_device(device);
    bridge
}

/// A fake bridge with a connected source and target.
pub fn device_pair() -> FakeBridge {
    let bridge = FakeBridge::new();
    for serial in ["SRC", "TGT"] {
        let mut device = Device::new(serial, DeviceState::Connected);
        device.model = format!("SpecPhone-{}", serial);
        bridge.add_device(device);
    }
    bridge
}

/// A backup store in a fresh temp dir; the dir guard keeps it alive.
pub fn temp_store() -> (tempfile::TempDir, BackupStore) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = BackupStore::open(dir.path()).expect("store");
    (dir, store)
}
