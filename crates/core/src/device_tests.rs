// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    connected = { "device", DeviceState::Connected },
    unauthorized = { "unauthorized", DeviceState::Unauthorized },
    offline = { "offline", DeviceState::Offline },
    recovery = { "recovery", DeviceState::Recovery },
    sideload = { "sideload", DeviceState::Sideload },
    oem_garbage = { "bootloader?", DeviceState::Unknown },
)]
fn state_parse(token: &str, expected: DeviceState) {
    assert_eq!(DeviceState::parse(token), expected);
}

#[test]
fn parse_listing_line_with_attributes() {
    let line = "R58M123ABC device usb:1-2 product:beyond1qltexx model:SM_G973F device:beyond1";
    let dev = Device::parse_listing_line(line).unwrap();
    assert_eq!(dev.serial, "R58M123ABC");
    assert_eq!(dev.state, DeviceState::Connected);
    assert_eq!(dev.model, "SM_G973F");
    assert_eq!(dev.product, "beyond1qltexx");
}

#[test]
fn parse_listing_line_minimal() {
    let dev = Device::parse_listing_line("emulator-5554 unauthorized").unwrap();
    assert_eq!(dev.serial, "emulator-5554");
    assert_eq!(dev.state, DeviceState::Unauthorized);
    assert!(dev.model.is_empty());
}

#[test]
fn parse_listing_line_rejects_malformed() {
    assert!(Device::parse_listing_line("").is_none());
    assert!(Device::parse_listing_line("   ").is_none());
    assert!(Device::parse_listing_line("loneserial").is_none());
}

#[test]
fn friendly_name_fallbacks() {
    let mut dev = Device::new("serial123", DeviceState::Connected);
    assert_eq!(dev.friendly_name(), "serial123");
    dev.model = "Pixel 7".into();
    assert_eq!(dev.friendly_name(), "Pixel 7");
    dev.manufacturer = "Google".into();
    assert_eq!(dev.friendly_name(), "Google Pixel 7");
}

#[test]
fn storage_summary_empty_when_unknown() {
    let mut dev = Device::new("s", DeviceState::Connected);
    assert!(dev.storage_summary().is_empty());
    dev.storage_total = 64 * 1024 * 1024 * 1024;
    dev.storage_free = 12 * 1024 * 1024 * 1024;
    let summary = dev.storage_summary();
    assert!(summary.contains("free"), "got: {}", summary);
    assert!(summary.contains("total"), "got: {}", summary);
}
