//! Defines shared data structures for the Bluetooth module.

use bluest::{Characteristic, Device};

/// A SmartLock peripheral found by the scanner
#[derive(Debug, Clone, serde::Serialize)]
pub struct LockDevice {
    /// Platform-specific unique identifier for the device
    pub id: String,
    /// The advertised name, "Unknown" when the platform has none
    pub name: String,
    /// Signal strength at discovery, if reported
    pub rssi: Option<i16>,
    /// Whether the device was already connected when found
    pub is_connected: bool,
}

impl LockDevice {
    pub fn new(id: String, name: String, rssi: Option<i16>, is_connected: bool) -> Self {
        Self {
            id,
            name,
            rssi,
            is_connected,
        }
    }
}

/// Handles held while the lock is connected.
#[derive(Clone)]
pub struct ConnectedLockState {
    /// Used for connection checks and disconnecting
    pub device: Device,
    /// The lock pushes status codes here
    pub notify_characteristic: Characteristic,
    /// Command frames go here
    pub write_characteristic: Characteristic,
}
