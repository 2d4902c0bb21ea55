//! Core functionality for the SmartLock controller
//! Wire codec, lock state machine, command session and the bluetooth transport

pub mod bluetooth;
pub mod codec;
pub mod driver;
pub mod error;
pub mod identity;
pub mod lock_state;
pub mod presentation;
pub mod profile;
pub mod session;

// Re-export commonly used types
pub use bluetooth::{BluetoothManager, Transport, TransportEvent};
pub use codec::{CodeWidth, Command, CommandKind, EncodeError, StatusEvent, WireCodec};
pub use driver::{SessionDriver, SessionHandle, SessionSnapshot, UserIntent};
pub use error::SessionError;
pub use lock_state::{ConnectionState, LockState, LockStateMachine};
pub use presentation::{ChannelSink, MessageStyle, PresentationSink, PresentationUpdate, StatusMessage};
pub use profile::{ProtocolProfile, SMARTLOCK_PROFILE};
pub use session::CommandSession;
