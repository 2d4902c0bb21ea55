//! SmartLock wire codec
//! Commands go out as positional ASCII frames with no delimiters; the lock
//! answers with a single unsigned status code per notification.

use rand::Rng;
use thiserror::Error;

use crate::core::identity::Identity;
use crate::core::profile::ProtocolProfile;

/// Kind of an outgoing command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Unlock,
    Lock,
    UpdateCode,
    AppReady,
    Reset,
}

impl CommandKind {
    /// Whether the lock answers this command with a status code
    pub fn expects_response(self) -> bool {
        !matches!(self, Self::AppReady)
    }
}

/// Commands understood by the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Unlock with a user access code
    Unlock { code: String },
    /// Lock with a user access code
    Lock { code: String },
    /// Provision a fresh batch of access code digits
    UpdateCode { digits: String },
    /// Tell the lock the app is listening
    AppReady,
    /// Reset the lock to its default locked state
    Reset,
}

impl Command {
    /// Builds an update-code command with `count` digits drawn uniformly from `0-9`
    pub fn update_code<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Self {
        let digits = (0..count)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        Self::UpdateCode { digits }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Unlock { .. } => CommandKind::Unlock,
            Self::Lock { .. } => CommandKind::Lock,
            Self::UpdateCode { .. } => CommandKind::UpdateCode,
            Self::AppReady => CommandKind::AppReady,
            Self::Reset => CommandKind::Reset,
        }
    }
}

/// Reasons a command cannot be turned into a frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("access code is empty")]
    EmptyCode,
    #[error("access code must contain only decimal digits")]
    NonDigitCode,
    #[error("access code has {len} digits, at most {max} fit in a frame")]
    CodeTooLong { len: usize, max: usize },
    #[error("phone id is empty")]
    EmptyDeviceId,
    #[error("phone id must be ASCII alphanumeric")]
    InvalidDeviceId,
    #[error("phone id has {len} characters, at most {max} fit in a frame")]
    DeviceIdTooLong { len: usize, max: usize },
    #[error("timestamp must be {expected} ASCII digits, got {actual:?}")]
    InvalidTimestamp { expected: usize, actual: String },
}

impl EncodeError {
    /// A field exceeds what the positional frame layout can hold
    pub fn is_overflow(&self) -> bool {
        matches!(
            self,
            Self::CodeTooLong { .. } | Self::DeviceIdTooLong { .. } | Self::InvalidTimestamp { .. }
        )
    }

    /// The error concerns the user-supplied access code
    pub fn is_code_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyCode | Self::NonDigitCode | Self::CodeTooLong { .. }
        )
    }
}

/// Decoded status pushed by the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEvent {
    LockSuccess,
    UnlockSuccess,
    UpdateSuccess,
    ResetSuccess,
    NeedsUpdate,
    CodesRunOut,
    UnlockFail,
    LockFail,
    CodeOutOfDate,
    CodeInvalid,
    DeviceIdFail,
    /// Lock reports it is locked
    LockState,
    /// Lock reports it is unlocked
    UnlockState,
    /// Lock reports it cannot be used
    UnusableState,
    /// Any code outside the profile's table
    Unknown(u16),
}

/// Integer width of the status code inside a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeWidth {
    U8,
    U16,
}

impl CodeWidth {
    /// Property bit that switches the payload to 16-bit codes
    pub const WIDE_FLAG: u32 = 0x01;

    /// Picks the width from the notify characteristic's property bits
    pub fn from_property_flags(flags: u32) -> Self {
        if flags & Self::WIDE_FLAG != 0 {
            Self::U16
        } else {
            Self::U8
        }
    }

    pub fn bits(self) -> u8 {
        match self {
            Self::U8 => 8,
            Self::U16 => 16,
        }
    }

    fn bytes(self) -> usize {
        usize::from(self.bits() / 8)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("notification has {len} bytes, a {bits}-bit status code needs {needed}")]
    Truncated { len: usize, needed: usize, bits: u8 },
}

/// Reads the status code at offset 0 of a notification payload.
/// 16-bit codes are little-endian.
pub fn read_status_code(payload: &[u8], width: CodeWidth) -> Result<u16, PayloadError> {
    let needed = width.bytes();
    if payload.len() < needed {
        return Err(PayloadError::Truncated {
            len: payload.len(),
            needed,
            bits: width.bits(),
        });
    }
    Ok(match width {
        CodeWidth::U8 => u16::from(payload[0]),
        CodeWidth::U16 => u16::from_le_bytes([payload[0], payload[1]]),
    })
}

/// Stateless encoder/decoder bound to one protocol profile
#[derive(Debug, Clone, Default)]
pub struct WireCodec {
    profile: ProtocolProfile,
}

impl WireCodec {
    pub fn new(profile: ProtocolProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &ProtocolProfile {
        &self.profile
    }

    /// Serializes a command into the bytes written to the lock
    pub fn encode(&self, command: &Command, identity: &Identity) -> Result<Vec<u8>, EncodeError> {
        let codes = &self.profile.commands;
        let frame = match command {
            Command::Unlock { code } => self.code_frame(codes.unlock, code, identity)?,
            Command::Lock { code } => self.code_frame(codes.lock, code, identity)?,
            Command::UpdateCode { digits } => self.code_frame(codes.update_code, digits, identity)?,
            Command::AppReady => codes.app_ready.to_string(),
            Command::Reset => format!("{}{}", codes.reset, self.identity_suffix(identity)?),
        };
        Ok(frame.into_bytes())
    }

    /// Maps a raw status code to its event; unknown codes are not an error
    pub fn decode(&self, code: u16) -> StatusEvent {
        self.profile
            .status_for(code)
            .unwrap_or(StatusEvent::Unknown(code))
    }

    // <cmd><len(code)><code><device id><timestamp>
    fn code_frame(&self, cmd: u8, code: &str, identity: &Identity) -> Result<String, EncodeError> {
        self.check_code(code)?;
        let suffix = self.identity_suffix(identity)?;
        Ok(format!("{}{}{}{}", cmd, code.len(), code, suffix))
    }

    fn check_code(&self, code: &str) -> Result<(), EncodeError> {
        if code.is_empty() {
            return Err(EncodeError::EmptyCode);
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(EncodeError::NonDigitCode);
        }
        if code.len() > self.profile.max_code_len {
            return Err(EncodeError::CodeTooLong {
                len: code.len(),
                max: self.profile.max_code_len,
            });
        }
        Ok(())
    }

    fn identity_suffix(&self, identity: &Identity) -> Result<String, EncodeError> {
        let device_id = identity.device_id.as_str();
        if device_id.is_empty() {
            return Err(EncodeError::EmptyDeviceId);
        }
        if !device_id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(EncodeError::InvalidDeviceId);
        }
        if device_id.len() > self.profile.max_device_id_len {
            return Err(EncodeError::DeviceIdTooLong {
                len: device_id.len(),
                max: self.profile.max_device_id_len,
            });
        }

        let timestamp = identity.timestamp.as_str();
        if timestamp.len() != self.profile.timestamp_len
            || !timestamp.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(EncodeError::InvalidTimestamp {
                expected: self.profile.timestamp_len,
                actual: timestamp.to_string(),
            });
        }

        Ok(format!("{device_id}{timestamp}"))
    }
}
