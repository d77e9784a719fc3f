// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connected-device records and state parsing.

use crate::format::format_bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which bridge family a device speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Android,
    Ios,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
        }
    }
}

/// Connection state as reported by the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceState {
    /// Ready for commands (`device` in adb output)
    Connected,
    /// Attached but the on-device authorization prompt was not accepted
    Unauthorized,
    Offline,
    Recovery,
    Sideload,
    /// Any state token we do not recognize
    Unknown,
}

impl DeviceState {
    /// Parse the state token from a `devices -l` line.
    pub fn parse(token: &str) -> Self {
        match token {
            "device" => DeviceState::Connected,
            "unauthorized" => DeviceState::Unauthorized,
            "offline" => DeviceState::Offline,
            "recovery" => DeviceState::Recovery,
            "sideload" => DeviceState::Sideload,
            _ => DeviceState::Unknown,
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceState::Connected => "connected",
            DeviceState::Unauthorized => "unauthorized",
            DeviceState::Offline => "offline",
            DeviceState::Recovery => "recovery",
            DeviceState::Sideload => "sideload",
            DeviceState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// A connected mobile device.
///
/// Created on enumeration, refreshed on state transitions, discarded on
/// disconnect. Never owns I/O handles; the serial is the only identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub serial: String,
    pub platform: Platform,
    pub state: DeviceState,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub product: String,
    #[serde(default)]
    pub os_version: String,
    #[serde(default)]
    pub sdk_version: String,
    /// -1 when unknown
    #[serde(default = "default_battery")]
    pub battery_level: i32,
    #[serde(default)]
    pub storage_total: u64,
    #[serde(default)]
    pub storage_free: u64,
}

fn default_battery() -> i32 {
    -1
}

impl Device {
    pub fn new(serial: impl Into<String>, state: DeviceState) -> Self {
        Self {
            serial: serial.into(),
            platform: Platform::Android,
            state,
            model: String::new(),
            manufacturer: String::new(),
            product: String::new(),
            os_version: String::new(),
            sdk_version: String::new(),
            battery_level: -1,
            storage_total: 0,
            storage_free: 0,
        }
    }

    /// Human-friendly name: "Manufacturer Model", falling back to the serial.
    pub fn friendly_name(&self) -> String {
        if !self.manufacturer.is_empty() && !self.model.is_empty() {
            format!("{} {}", self.manufacturer, self.model)
        } else if !self.model.is_empty() {
            self.model.clone()
        } else {
            self.serial.clone()
        }
    }

    /// Human-readable storage summary, e.g. "12.3 GB free / 64.0 GB total".
    pub fn storage_summary(&self) -> String {
        if self.storage_total == 0 {
            return String::new();
        }
        format!(
            "{} free / {} total",
            format_bytes(self.storage_free),
            format_bytes(self.storage_total)
        )
    }

    /// Label for selection lists: name plus storage when known.
    pub fn short_label(&self) -> String {
        let name = self.friendly_name();
        let storage = self.storage_summary();
        if storage.is_empty() {
            name
        } else {
            format!("{}  [{}]", name, storage)
        }
    }

    /// Parse one non-header line of `adb devices -l`.
    ///
    /// Returns `None` for blank or malformed lines; OEM output varies and
    /// refusing the whole listing is worse than losing one line.
    pub fn parse_listing_line(line: &str) -> Option<Device> {
        let mut parts = line.split_whitespace();
        let serial = parts.next()?;
        let state = parts.next()?;
        let mut device = Device::new(serial, DeviceState::parse(state));
        for attr in parts {
            if let Some((key, value)) = attr.split_once(':') {
                match key {
                    "model" => device.model = value.to_string(),
                    "product" => device.product = value.to_string(),
                    // "device" carries the codename; not surfaced
                    _ => {}
                }
            }
        }
        Some(device)
    }
}

#[cfg(test)]
#[path = "device_tests.rs"]
mod tests;
