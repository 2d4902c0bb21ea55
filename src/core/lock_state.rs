//! Connection and lock state of the SmartLock
//! Pure state: every transition is a table lookup on the decoded status or
//! the transport connection event.

use std::fmt;

use serde::Serialize;

use crate::core::codec::StatusEvent;
use crate::core::presentation::StatusMessage;

/// Transport-level connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
        })
    }
}

/// Mode of the physical lock as last reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum LockState {
    #[default]
    Locked,
    Unlocked,
    Unusable,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Locked => "Locked",
            Self::Unlocked => "Unlocked",
            Self::Unusable => "Unusable",
        })
    }
}

/// Connection-level events reported by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    ConnectRequested,
    Connected,
    Disconnected,
}

/// Result of applying one status event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Lock state after the event
    pub lock_state: LockState,
    /// Whether the event moved the lock state
    pub lock_changed: bool,
    /// Message to show, if the event carries one
    pub message: Option<StatusMessage>,
}

#[derive(Debug, Clone, Default)]
pub struct LockStateMachine {
    connection: ConnectionState,
    lock: LockState,
}

impl LockStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn lock_state(&self) -> LockState {
        self.lock
    }

    /// Applies a decoded status, returning the new lock state and message
    pub fn apply(&mut self, event: StatusEvent) -> Transition {
        let lock_changed = match lock_target(event) {
            Some(target) => self.set_lock_state(target),
            None => false,
        };
        Transition {
            lock_state: self.lock,
            lock_changed,
            message: status_message(event),
        }
    }

    /// Forces the lock state. Returns whether it changed.
    pub fn set_lock_state(&mut self, state: LockState) -> bool {
        let changed = self.lock != state;
        self.lock = state;
        changed
    }

    /// Applies a transport event. Returns the new state if it changed;
    /// `Some(Connected)` is the signal to set up notifications.
    pub fn apply_connection(&mut self, event: ConnectionEvent) -> Option<ConnectionState> {
        let next = match event {
            ConnectionEvent::ConnectRequested => ConnectionState::Connecting,
            ConnectionEvent::Connected => ConnectionState::Connected,
            ConnectionEvent::Disconnected => ConnectionState::Disconnected,
        };
        if next == self.connection {
            return None;
        }
        self.connection = next;
        Some(next)
    }
}

fn lock_target(event: StatusEvent) -> Option<LockState> {
    match event {
        StatusEvent::LockSuccess | StatusEvent::LockState => Some(LockState::Locked),
        StatusEvent::UnlockSuccess | StatusEvent::UnlockState => Some(LockState::Unlocked),
        StatusEvent::LockFail | StatusEvent::UnusableState => Some(LockState::Unusable),
        _ => None,
    }
}

fn status_message(event: StatusEvent) -> Option<StatusMessage> {
    let message = match event {
        StatusEvent::LockSuccess => StatusMessage::success("Lock successful!"),
        StatusEvent::UnlockSuccess => StatusMessage::success("Unlock successful!"),
        StatusEvent::UpdateSuccess => StatusMessage::success("Update access codes successfully!"),
        StatusEvent::ResetSuccess => StatusMessage::success("Reset done!"),
        StatusEvent::UnlockFail => StatusMessage::error("Out of Sync! Update required"),
        StatusEvent::LockFail => StatusMessage::error("WARNING! Locker is not secured!"),
        StatusEvent::CodeInvalid => StatusMessage::error("Invalid commands."),
        StatusEvent::NeedsUpdate => {
            StatusMessage::error("Locker has no codes inside. Update required")
        }
        StatusEvent::CodesRunOut => {
            StatusMessage::error("Codes are running out. Locker needs new codes")
        }
        StatusEvent::CodeOutOfDate => StatusMessage::error("Code is outdated. Update required."),
        StatusEvent::DeviceIdFail => StatusMessage::error("Phone ID is not correct."),
        StatusEvent::Unknown(_) => StatusMessage::error("Unknown values"),
        StatusEvent::LockState | StatusEvent::UnlockState | StatusEvent::UnusableState => {
            return None;
        }
    };
    Some(message)
}
