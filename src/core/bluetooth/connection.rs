//! Bluetooth connection handling for the SmartLock
//! This module handles connecting to and disconnecting from the lock

use std::time::Duration;

use anyhow::{Result, anyhow};
use bluest::{Adapter, Characteristic, Device, Uuid};
use log::{info, warn};

/// Connection manager for the lock
#[derive(Clone)]
pub struct ConnectionManager {
    adapter: Adapter,
    max_retries: u32,
    retry_delay: u64,
}

impl ConnectionManager {
    pub fn new(adapter: Adapter, max_retries: u32, retry_delay: u64) -> Self {
        Self {
            adapter,
            max_retries: max_retries.max(1),
            retry_delay,
        }
    }

    /// Connects and resolves the notify/write characteristic pair, retrying
    /// up to `max_retries` times
    pub async fn connect_with_retry(
        &self,
        device: &Device,
        service_uuid: Uuid,
        notify_char_uuid: Uuid,
        write_char_uuid: Uuid,
    ) -> Result<(Characteristic, Characteristic)> {
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self
                .try_connect(device, service_uuid, notify_char_uuid, write_char_uuid)
                .await
            {
                Ok(chars) => {
                    info!("Successfully connected to Locker");
                    return Ok(chars);
                }
                Err(e) => {
                    warn!("Connection attempt {} failed: {}", attempt, e);
                    last_error = Some(e);

                    if attempt < self.max_retries {
                        info!("Retrying connection in {} ms...", self.retry_delay);
                        tokio::time::sleep(Duration::from_millis(self.retry_delay)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow!("Failed to connect after {} attempts", self.max_retries)))
    }

    async fn try_connect(
        &self,
        device: &Device,
        service_uuid: Uuid,
        notify_char_uuid: Uuid,
        write_char_uuid: Uuid,
    ) -> Result<(Characteristic, Characteristic)> {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        let id = device.id().to_string();
        info!("Device details - ID: {}, Name: {:?}", id, name);

        if !device.is_connected().await {
            info!("Initiating connection to {}...", id);
            self.adapter.connect_device(device).await?;
        }

        info!("Connection successful, discovering services...");
        let services = device.services().await?;
        let lock_service = services
            .iter()
            .find(|s| s.uuid() == service_uuid)
            .ok_or_else(|| {
                for service in &services {
                    info!("Available service: {}", service.uuid());
                }
                anyhow!("Locker service not found: {}", service_uuid)
            })?
            .clone();

        info!("Found Locker service: {}", lock_service.uuid());

        let mut notify_char = None;
        let mut write_char = None;
        for characteristic in lock_service.characteristics().await? {
            let uuid = characteristic.uuid();
            if uuid == notify_char_uuid {
                info!("Found notification characteristic: {}", uuid);
                notify_char = Some(characteristic);
            } else if uuid == write_char_uuid {
                info!("Found write characteristic: {}", uuid);
                write_char = Some(characteristic);
            }
        }

        let notify_char = notify_char
            .ok_or_else(|| anyhow!("Notification characteristic not found: {}", notify_char_uuid))?;
        let write_char = write_char
            .ok_or_else(|| anyhow!("Write characteristic not found: {}", write_char_uuid))?;

        Ok((notify_char, write_char))
    }

    pub async fn disconnect(&self, device: &Device) -> Result<()> {
        if device.is_connected().await {
            info!("Disconnecting from device {}", device.id());
            self.adapter.disconnect_device(device).await?;
            info!("Successfully disconnected");
        } else {
            info!("Device {} not connected", device.id());
        }
        Ok(())
    }
}
