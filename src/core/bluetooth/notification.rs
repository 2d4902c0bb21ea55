//! Notification handling for the SmartLock
//! Reads status notifications off the lock and forwards them as transport events

use std::sync::Arc;

use anyhow::Result;
use bluest::Characteristic;
use futures_util::StreamExt;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::core::bluetooth::transport::{TransportEvent, TransportEventSender};
use crate::core::bluetooth::types::ConnectedLockState;
use crate::core::codec::{CodeWidth, read_status_code};

pub struct NotificationHandler {
    events: TransportEventSender,
    /// The manager's link; emptied when the lock stops notifying
    link: Arc<Mutex<Option<ConnectedLockState>>>,
    cancel_token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl NotificationHandler {
    pub fn new(events: TransportEventSender, link: Arc<Mutex<Option<ConnectedLockState>>>) -> Self {
        Self {
            events,
            link,
            cancel_token: CancellationToken::new(),
            task: None,
        }
    }

    /// Subscribes to `notify_char`, replacing any earlier subscription
    pub async fn setup_notifications(&mut self, notify_char: Characteristic) -> Result<()> {
        self.stop_notifications().await;

        let width = match notify_char.properties().await {
            Ok(props) => {
                let flags = if props.broadcast { CodeWidth::WIDE_FLAG } else { 0 };
                CodeWidth::from_property_flags(flags)
            }
            Err(e) => {
                warn!("Could not read notify characteristic properties, assuming 8-bit: {}", e);
                CodeWidth::U8
            }
        };
        info!("Subscribing to notifications ({}-bit status codes)...", width.bits());

        self.cancel_token = CancellationToken::new();
        let cancel_token = self.cancel_token.clone();
        let events = self.events.clone();
        let link = self.link.clone();
        self.task = Some(tokio::spawn(async move {
            Self::process_notifications(notify_char, width, events, link, cancel_token).await;
        }));
        Ok(())
    }

    pub async fn stop_notifications(&mut self) {
        self.cancel_token.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!("Notification task ended abnormally: {:?}", e);
            }
        }
    }

    async fn process_notifications(
        notify_char: Characteristic,
        width: CodeWidth,
        events: TransportEventSender,
        link: Arc<Mutex<Option<ConnectedLockState>>>,
        cancel_token: CancellationToken,
    ) {
        info!("Listening for Locker notifications...");

        let mut stream = match notify_char.notify().await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to subscribe to notifications: {}", e);
                release_link(&link, &events).await;
                return;
            }
        };

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("Notification listener stopped.");
                    return;
                }
                item = stream.next() => match item {
                    Some(Ok(value)) => {
                        debug!("Received Locker data: {:?}", value);
                        match read_status_code(&value, width) {
                            Ok(code) => {
                                if events.send(TransportEvent::StatusReceived { code, width }).is_err() {
                                    info!("Event receiver dropped, stopping notifications.");
                                    return;
                                }
                            }
                            Err(e) => warn!("Dropping notification: {}", e),
                        }
                    }
                    Some(Err(e)) => {
                        error!("Error in notification stream: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }

        info!("Notification stream ended");
        release_link(&link, &events).await;
    }
}

/// Forgets the stored link and reports the drop
async fn release_link<S>(link: &Mutex<Option<S>>, events: &TransportEventSender) {
    if link.lock().await.take().is_some() {
        info!("Locker link lost, connected state cleared.");
    }
    let _ = events.send(TransportEvent::Disconnected);
}
