//! Bluetooth functionality for the SmartLock controller
//! This module handles all bluetooth operations including scanning,
//! connecting, and receiving status notifications from the lock.

mod connection;
pub mod constants;
mod manager;
mod notification;
mod scanner;
pub mod transport;
mod types;

// Re-export types that should be publicly accessible
pub use connection::ConnectionManager;
pub use constants::*;
pub use manager::BluetoothManager;
pub use notification::NotificationHandler;
pub use scanner::BluetoothScanner;
pub use transport::{Transport, TransportEvent, TransportEventReceiver, TransportEventSender};
pub use types::{ConnectedLockState, LockDevice};
