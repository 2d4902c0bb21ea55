//! Application state management
//! This module wires the bluetooth transport, the command session and its
//! driver task together.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{error, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::bluetooth::BluetoothManager;
use crate::core::codec::WireCodec;
use crate::core::driver::{SessionDriver, SessionHandle};
use crate::core::identity::resolve_phone_id;
use crate::core::presentation::{ChannelSink, PresentationUpdate};
use crate::core::profile::SMARTLOCK_PROFILE;
use crate::core::session::CommandSession;

/// How often the driver checks for lost responses
pub const WATCHDOG_TICK: Duration = Duration::from_millis(500);

type LockSession = CommandSession<BluetoothManager, ChannelSink>;

pub struct AppState {
    /// Handle to the session driver
    pub session: SessionHandle,
    pub bluetooth_manager: Arc<BluetoothManager>,
    cancel_token: CancellationToken,
    driver: JoinHandle<LockSession>,
}

impl AppState {
    /// Builds the transport and starts the session driver. Presentation
    /// updates arrive on the returned receiver.
    pub async fn new(config: &AppConfig) -> Result<(Self, mpsc::UnboundedReceiver<PresentationUpdate>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        info!("Initializing BluetoothManager...");
        let manager = Arc::new(
            BluetoothManager::new(config.lock.clone(), &SMARTLOCK_PROFILE, event_tx).await?,
        );

        let phone_id = resolve_phone_id(config.lock.phone_id.as_deref());
        info!("Using phone id {}", phone_id);

        let (sink, updates) = ChannelSink::new();
        let session = CommandSession::new(
            manager.clone(),
            Arc::new(sink),
            WireCodec::new(SMARTLOCK_PROFILE),
            phone_id,
        )
        .with_response_timeout(config.lock.response_timeout());

        let cancel_token = CancellationToken::new();
        let (handle, driver) =
            SessionDriver::spawn(session, event_rx, cancel_token.clone(), WATCHDOG_TICK);

        Ok((
            Self {
                session: handle,
                bluetooth_manager: manager,
                cancel_token,
                driver,
            },
            updates,
        ))
    }

    /// Stops the driver and closes any open connection
    pub async fn shutdown(self) {
        info!("Shutting down...");
        self.cancel_token.cancel();
        match self.driver.await {
            Ok(mut session) => {
                if let Err(e) = session.disconnect().await {
                    error!("Failed to disconnect on shutdown: {}", e);
                }
            }
            Err(e) => error!("Session driver ended abnormally: {:?}", e),
        }
    }
}
