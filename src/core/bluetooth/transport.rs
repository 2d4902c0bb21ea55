//! Transport seam between the session and a BLE stack
//! The session drives the transport through this trait; the transport reports
//! back through a channel of typed events handed to it at construction.

use anyhow::Result;
use tokio::sync::mpsc;

use crate::core::codec::CodeWidth;

/// Events pushed by the transport, in arrival order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Link to the lock is up
    Connected,
    /// Link to the lock dropped or was closed
    Disconnected,
    /// The lock pushed a status code
    StatusReceived { code: u16, width: CodeWidth },
}

pub type TransportEventSender = mpsc::UnboundedSender<TransportEvent>;
pub type TransportEventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

/// Byte-level link to the lock
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Starts connecting; completion is reported as [`TransportEvent::Connected`]
    async fn connect(&self) -> Result<()>;

    async fn disconnect(&self) -> Result<()>;

    /// Subscribes to status notifications once connected
    async fn enable_notifications(&self) -> Result<()>;

    /// Writes one frame. Does not wait for the lock's answer.
    async fn send(&self, frame: &[u8]) -> Result<()>;

    /// Whether the transport holds a usable write path
    async fn is_ready(&self) -> bool;
}
