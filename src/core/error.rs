//! Errors returned by session operations

use thiserror::Error;

use crate::core::codec::EncodeError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport absent, uninitialized or disconnected
    #[error("locker is not connected")]
    NotReady,
    /// User or identity input cannot be put on the wire
    #[error("invalid input: {0}")]
    InvalidInput(EncodeError),
    /// A field exceeds the frame's implicit length limits
    #[error("command does not fit in a frame: {0}")]
    EncodeOverflow(EncodeError),
    #[error("transport failure: {0}")]
    Transport(#[from] anyhow::Error),
    /// The session driver has stopped
    #[error("session is closed")]
    SessionClosed,
}

impl From<EncodeError> for SessionError {
    fn from(err: EncodeError) -> Self {
        if err.is_overflow() {
            Self::EncodeOverflow(err)
        } else {
            Self::InvalidInput(err)
        }
    }
}
