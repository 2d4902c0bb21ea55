//! Bluetooth manager for the SmartLock
//! This module ties scanning, connecting and notifications together behind
//! the [`Transport`] trait the command session drives.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use bluest::{Adapter, Uuid};
use log::{error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::lock_config::LockConfig;
use crate::core::bluetooth::connection::ConnectionManager;
use crate::core::bluetooth::notification::NotificationHandler;
use crate::core::bluetooth::scanner::BluetoothScanner;
use crate::core::bluetooth::transport::{Transport, TransportEvent, TransportEventSender};
use crate::core::bluetooth::types::{ConnectedLockState, LockDevice};
use crate::core::profile::ProtocolProfile;

/// GATT layout the manager resolves on connect
#[derive(Debug, Clone, Copy)]
struct LockGatt {
    service: Uuid,
    notify_char: Uuid,
    write_char: Uuid,
}

/// A connect running in the background
struct ConnectAttempt {
    scanner: Arc<BluetoothScanner>,
    task: JoinHandle<()>,
}

/// Manages Bluetooth operations for one lock
#[derive(Clone)]
pub struct BluetoothManager {
    adapter: Adapter,
    config: LockConfig,
    gatt: LockGatt,
    connection_manager: ConnectionManager,
    /// Currently connected lock
    connected_state: Arc<Mutex<Option<ConnectedLockState>>>,
    /// Lock found by the last successful scan
    last_found: Arc<Mutex<Option<LockDevice>>>,
    notification_handler: Arc<Mutex<NotificationHandler>>,
    connecting: Arc<Mutex<Option<ConnectAttempt>>>,
    events: TransportEventSender,
}

impl BluetoothManager {
    pub async fn new(
        config: LockConfig,
        profile: &ProtocolProfile,
        events: TransportEventSender,
    ) -> Result<Self> {
        let adapter = Adapter::default()
            .await
            .ok_or_else(|| anyhow!("No Bluetooth adapter found"))?;
        adapter.wait_available().await?;
        info!("Bluetooth adapter is available.");

        let connection_manager = ConnectionManager::new(
            adapter.clone(),
            config.max_connect_retries,
            config.connect_retry_delay_ms,
        );

        let connected_state = Arc::new(Mutex::new(None));
        let notification_handler = NotificationHandler::new(events.clone(), connected_state.clone());

        Ok(Self {
            adapter,
            config,
            gatt: LockGatt {
                service: profile.service_uuid,
                notify_char: profile.notify_char_uuid,
                write_char: profile.write_char_uuid,
            },
            connection_manager,
            connected_state,
            last_found: Arc::new(Mutex::new(None)),
            notification_handler: Arc::new(Mutex::new(notification_handler)),
            connecting: Arc::new(Mutex::new(None)),
            events,
        })
    }

    /// The lock found by the last scan, if any
    pub async fn last_found(&self) -> Option<LockDevice> {
        self.last_found.lock().await.clone()
    }

    /// Scans for the lock and connects with retries
    async fn establish(&self, scanner: &BluetoothScanner) -> Result<()> {
        let timeout = Duration::from_secs(self.config.scan_timeout_secs);
        let (device, found) = scanner
            .find_lock(
                &self.config.device_name,
                self.config.device_id.as_deref(),
                timeout,
            )
            .await?;
        *self.last_found.lock().await = Some(found);

        let (notify_char, write_char) = self
            .connection_manager
            .connect_with_retry(
                &device,
                self.gatt.service,
                self.gatt.notify_char,
                self.gatt.write_char,
            )
            .await?;

        *self.connected_state.lock().await = Some(ConnectedLockState {
            device,
            notify_characteristic: notify_char,
            write_characteristic: write_char,
        });
        info!("Locker connected and state stored in the manager.");
        Ok(())
    }

    async fn connected(&self) -> Result<ConnectedLockState> {
        self.connected_state
            .lock()
            .await
            .clone()
            .ok_or_else(|| anyhow!("No Locker connected"))
    }
}

#[async_trait]
impl Transport for BluetoothManager {
    async fn connect(&self) -> Result<()> {
        let mut connecting = self.connecting.lock().await;
        if let Some(attempt) = connecting.as_ref() {
            if !attempt.task.is_finished() {
                info!("Connection to Locker already in progress.");
                return Ok(());
            }
        }

        let scanner = Arc::new(BluetoothScanner::new(self.adapter.clone()));
        let manager = self.clone();
        let task_scanner = scanner.clone();
        let task = tokio::spawn(async move {
            let event = match manager.establish(&task_scanner).await {
                Ok(()) => TransportEvent::Connected,
                Err(e) => {
                    error!("Failed to connect to Locker: {}", e);
                    TransportEvent::Disconnected
                }
            };
            let _ = manager.events.send(event);
        });

        *connecting = Some(ConnectAttempt { scanner, task });
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        if let Some(attempt) = self.connecting.lock().await.take() {
            attempt.scanner.stop();
            attempt.task.abort();
        }

        self.notification_handler.lock().await.stop_notifications().await;

        let state = self.connected_state.lock().await.take();
        if let Some(state) = state {
            info!("Connected state cleared, releasing device and characteristic objects.");
            self.connection_manager.disconnect(&state.device).await?;
        }

        let _ = self.events.send(TransportEvent::Disconnected);
        Ok(())
    }

    async fn enable_notifications(&self) -> Result<()> {
        let state = self.connected().await?;
        self.notification_handler
            .lock()
            .await
            .setup_notifications(state.notify_characteristic)
            .await
    }

    async fn send(&self, frame: &[u8]) -> Result<()> {
        let state = self.connected().await?;
        state.write_characteristic.write(frame).await?;
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        let guard = self.connected_state.lock().await;
        match guard.as_ref() {
            Some(state) => {
                let device = state.device.clone();
                drop(guard);
                let connected = device.is_connected().await;
                if !connected {
                    warn!("Locker {} is no longer connected.", device.id());
                }
                connected
            }
            None => false,
        }
    }
}
