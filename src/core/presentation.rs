//! Presentation sink
//! The session pushes status text and state changes here. Implementations
//! decide which context renders them.

use std::fmt;

use log::debug;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::core::lock_state::{ConnectionState, LockState};

/// How a status message should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MessageStyle {
    Success,
    Error,
    /// Informational, e.g. optimistic "sending ..." text
    Notice,
}

/// User-facing status text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub style: MessageStyle,
}

impl StatusMessage {
    pub fn new(text: impl Into<String>, style: MessageStyle) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, MessageStyle::Success)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(text, MessageStyle::Error)
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self::new(text, MessageStyle::Notice)
    }
}

/// Receiver of everything the user should see
pub trait PresentationSink: Send + Sync {
    fn on_status_message(&self, text: &str, style: MessageStyle);

    fn on_lock_state_changed(&self, state: LockState);

    fn on_connection_state_changed(&self, _state: ConnectionState) {}
}

/// One update handed over to the foreground loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PresentationUpdate {
    Status(StatusMessage),
    LockState(LockState),
    Connection(ConnectionState),
}

impl fmt::Display for PresentationUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(message) => match message.style {
                MessageStyle::Success => write!(f, "[ok] {}", message.text),
                MessageStyle::Error => write!(f, "[error] {}", message.text),
                MessageStyle::Notice => write!(f, "{}", message.text),
            },
            Self::LockState(state) => write!(f, "Lock status : {state}"),
            Self::Connection(state) => write!(f, "Connection : {state}"),
        }
    }
}

/// Sink that forwards updates over a channel without blocking the session
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<PresentationUpdate>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PresentationUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn push(&self, update: PresentationUpdate) {
        if self.tx.send(update).is_err() {
            debug!("Presentation receiver dropped, update discarded");
        }
    }
}

impl PresentationSink for ChannelSink {
    fn on_status_message(&self, text: &str, style: MessageStyle) {
        self.push(PresentationUpdate::Status(StatusMessage::new(text, style)));
    }

    fn on_lock_state_changed(&self, state: LockState) {
        self.push(PresentationUpdate::LockState(state));
    }

    fn on_connection_state_changed(&self, state: ConnectionState) {
        self.push(PresentationUpdate::Connection(state));
    }
}
