// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device registry: polling enumeration with connect/disconnect events.
//!
//! A single background task owns the authoritative serial → device map.
//! Each poll diffs against the previous snapshot and broadcasts events.
//! Ordering guarantees hold because there is exactly one poll task:
//! `connected` is broadcast after the record is inserted (so subscribers
//! can immediately target the device), and `disconnected` is broadcast
//! before the record is removed (so handlers can read last-known state).

use mdt_adapters::Bridge;
use mdt_core::Device;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// What changed for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEventKind {
    Connected,
    Changed,
    Disconnected,
}

/// One registry event with the affected device record.
#[derive(Debug, Clone)]
pub struct DeviceEvent {
    pub kind: DeviceEventKind,
    pub device: Device,
}

/// Polling device registry.
pub struct DeviceRegistry<B: Bridge> {
    bridge: B,
    devices: Arc<Mutex<HashMap<String, Device>>>,
    events: broadcast::Sender<DeviceEvent>,
    running: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<B: Bridge> DeviceRegistry<B> {
    pub fn new(bridge: B) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            bridge,
            devices: Arc::new(Mutex::new(HashMap::new())),
            events,
            running: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        }
    }

    /// Subscribe to connect/change/disconnect events.
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.events.subscribe()
    }

    /// Snapshot of currently known devices.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.lock().values().cloned().collect()
    }

    pub fn device(&self, serial: &str) -> Option<Device> {
        self.devices.lock().get(serial).cloned()
    }

    /// Start the poll task. No-op when already running.
    pub fn start(&self, interval: Duration) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let bridge = self.bridge.clone();
        let devices = Arc::clone(&self.devices);
        let events = self.events.clone();
        let running = Arc::clone(&self.running);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            while running.load(Ordering::SeqCst) {
                ticker.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                if let Err(err) = poll_once(&bridge, &devices, &events).await {
                    tracing::debug!(error = %err, "device poll failed");
                }
            }
        });
        *self.task.lock() = Some(handle);
    }

    /// Stop the poll task, waiting up to 5 seconds for it to finish.
    /// Shutdown proceeds regardless after the deadline.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .is_err()
            {
                tracing::warn!("device poll task did not stop within 5s, proceeding");
            }
        }
    }

    /// Run one poll cycle inline (used by tests and the CLI's one-shot
    /// device listing).
    pub async fn poll_now(&self) -> Result<(), mdt_adapters::BridgeError> {
        poll_once(&self.bridge, &self.devices, &self.events).await
    }
}

async fn poll_once<B: Bridge>(
    bridge: &B,
    devices: &Mutex<HashMap<String, Device>>,
    events: &broadcast::Sender<DeviceEvent>,
) -> Result<(), mdt_adapters::BridgeError> {
    let current = bridge.enumerate().await?;
    let current: HashMap<String, Device> = current
        .into_iter()
        .map(|d| (d.serial.clone(), d))
        .collect();

    let previous: HashMap<String, Device> = devices.lock().clone();

    // New and changed devices: update the map before broadcasting so a
    // handler reacting to `connected` can immediately look the device up.
    for (serial, device) in &current {
        match previous.get(serial) {
            None => {
                devices.lock().insert(serial.clone(), device.clone());
                tracing::info!(serial, "device connected");
                let _ = events.send(DeviceEvent {
                    kind: DeviceEventKind::Connected,
                    device: device.clone(),
                });
            }
            Some(known) if known.state != device.state => {
                devices.lock().insert(serial.clone(), device.clone());
                tracing::info!(serial, state = %device.state, "device state changed");
                let _ = events.send(DeviceEvent {
                    kind: DeviceEventKind::Changed,
                    device: device.clone(),
                });
            }
            Some(_) => {
                devices.lock().insert(serial.clone(), device.clone());
            }
        }
    }

    // Disconnected devices: broadcast before removal
    for (serial, device) in &previous {
        if !current.contains_key(serial) {
            tracing::info!(serial, "device disconnected");
            let _ = events.send(DeviceEvent {
                kind: DeviceEventKind::Disconnected,
                device: device.clone(),
            });
            devices.lock().remove(serial);
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
