// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry and operation lifecycle scenarios

use crate::prelude::*;
use mdt_core::{Device, DeviceState};
use mdt_engine::{DeviceRegistry, DeviceEventKind, Operation};

/// The connected → changed → disconnected sequence for a serial is
/// preserved, and the record is still readable when `disconnected` fires.
#[tokio::test]
async fn registry_event_ordering_per_serial() {
    let bridge = device_pair();
    let registry = DeviceRegistry::new(bridge.clone());
    let mut events = registry.subscribe();

    // Initial poll: both devices connect
    registry.poll_now().await.unwrap();
    let mut kinds = vec![
        events.recv().await.unwrap().kind,
        events.recv().await.unwrap().kind,
    ];
    kinds.dedup();
    assert_eq!(kinds, vec![DeviceEventKind::Connected]);

    // SRC drops to unauthorized, TGT disappears
    bridge.set_devices(vec![Device::new("SRC", DeviceState::Unauthorized)]);
    registry.poll_now().await.unwrap();

    let mut changed = None;
    let mut disconnected = None;
    for _ in 0..2 {
        let event = events.recv().await.unwrap();
        match event.kind {
            DeviceEventKind::Changed => changed = Some(event),
            DeviceEventKind::Disconnected => disconnected = Some(event),
            DeviceEventKind::Connected => panic!("unexpected connect"),
        }
    }
    assert_eq!(changed.unwrap().device.state, DeviceState::Unauthorized);
    // Handlers get the last-known record even though it is now gone
    let gone = disconnected.unwrap();
    assert_eq!(gone.device.serial, "TGT");
    assert!(registry.device("TGT").is_none());
    assert_eq!(
        registry.device("SRC").unwrap().state,
        DeviceState::Unauthorized
    );
}

/// After cancellation the flag stays set until a new `begin`.
#[test]
fn cancel_flag_outlives_the_operation() {
    let op = Operation::new();
    op.begin();
    op.cancel();
    let _ = op.emit_terminal();
    assert!(op.is_cancelled(), "flag persists past the terminal phase");
    op.begin();
    assert!(!op.is_cancelled(), "begin starts a clean run");
}

/// Distinct manager instances own distinct cancellation flags.
#[test]
fn operations_are_isolated_per_instance() {
    let first = Operation::new();
    let second = Operation::new();
    first.begin();
    second.begin();
    first.cancel();
    assert!(first.is_cancelled());
    assert!(!second.is_cancelled());
}
