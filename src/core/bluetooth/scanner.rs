//! Discovery of the SmartLock peripheral

use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::{Adapter, Device};
use futures_util::StreamExt;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::types::LockDevice;

pub struct BluetoothScanner {
    adapter: Adapter,
    cancel_token: CancellationToken,
}

impl BluetoothScanner {
    pub fn new(adapter: Adapter) -> Self {
        Self {
            adapter,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Finds the lock by id, or by name when no id is configured.
    /// Devices the system already holds a connection to are checked before scanning.
    pub async fn find_lock(
        &self,
        name: &str,
        device_id: Option<&str>,
        timeout: Duration,
    ) -> Result<(Device, LockDevice)> {
        info!("Checking for connected devices");
        for device in self.adapter.connected_devices().await? {
            if Self::is_lock(&device, name, device_id) {
                let found = Self::describe(&device, None).await;
                info!("Found connected Locker: {:?}", found);
                return Ok((device, found));
            }
        }
        info!("No connected Locker detected");

        info!("Starting bluetooth scan for {:?}", device_id.unwrap_or(name));
        let mut scan_stream = self.adapter.scan(&[]).await?;
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                result = scan_stream.next() => {
                    match result {
                        Some(discovered) => {
                            debug!("Found device - Device: {:?}, RSSI: {:?}", discovered.device, discovered.rssi);
                            if Self::is_lock(&discovered.device, name, device_id) {
                                let found = Self::describe(&discovered.device, discovered.rssi).await;
                                info!("Found Locker: {:?}", found);
                                return Ok((discovered.device, found));
                            }
                        }
                        None => {
                            info!("Bluetooth scan stream has ended.");
                            break;
                        }
                    }
                }
                _ = &mut deadline => {
                    info!("Scan timed out after {} s", timeout.as_secs());
                    break;
                }
                _ = self.cancel_token.cancelled() => {
                    info!("Scan cancelled.");
                    break;
                }
            }
        }

        Err(anyhow!("Locker {:?} not found", device_id.unwrap_or(name)))
    }

    /// Aborts a running [`find_lock`](Self::find_lock). A stopped scanner stays stopped.
    pub fn stop(&self) {
        info!("Stopping Bluetooth scan.");
        self.cancel_token.cancel();
    }

    async fn describe(device: &Device, rssi: Option<i16>) -> LockDevice {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let is_connected = device.is_connected().await;
        LockDevice::new(device.id().to_string(), name, rssi, is_connected)
    }

    fn is_lock(device: &Device, name: &str, device_id: Option<&str>) -> bool {
        match device_id {
            Some(id) => device.id().to_string() == id,
            None => device
                .name()
                .map(|device_name| device_name.contains(name))
                .unwrap_or(false),
        }
    }
}
