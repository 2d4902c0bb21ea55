//! Protocol profile for a SmartLock hardware revision
//! Every command code, status code, GATT UUID and field limit the codec and
//! transport rely on lives in one table, so an alternate revision (or a test)
//! can swap it out without touching the encoding logic.

use uuid::Uuid;

use crate::core::bluetooth::constants::{
    DEVICE_ID_LEN, LOCK_NAME, MAX_ACCESS_CODE_LEN, TIMESTAMP_LEN, UPDATE_CODE_DIGITS,
    UUID_LOCK_NOTIFY_CHAR, UUID_LOCK_SERVICE, UUID_LOCK_WRITE_CHAR,
};
use crate::core::codec::StatusEvent;

/// Leading command code of each outgoing frame, written as a decimal number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandCodes {
    pub unlock: u8,
    pub lock: u8,
    pub update_code: u8,
    pub app_ready: u8,
    pub reset: u8,
}

/// Constant table describing one lock revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolProfile {
    /// Advertised peripheral name
    pub device_name: &'static str,
    /// Custom service carrying both characteristics
    pub service_uuid: Uuid,
    /// Characteristic the lock pushes status codes on
    pub notify_char_uuid: Uuid,
    /// Characteristic frames are written to
    pub write_char_uuid: Uuid,
    pub commands: CommandCodes,
    /// Known inbound status codes and the events they decode to
    pub status_codes: [(u16, StatusEvent); 14],
    /// Digits generated per update-code command
    pub update_code_digits: usize,
    /// Longest access code accepted by unlock/lock frames
    pub max_code_len: usize,
    /// Longest phone id the firmware stores
    pub max_device_id_len: usize,
    /// Exact length of the `yyMMddHHmm` timestamp
    pub timestamp_len: usize,
}

/// Profile of the reference SmartLock firmware
pub const SMARTLOCK_PROFILE: ProtocolProfile = ProtocolProfile {
    device_name: LOCK_NAME,
    service_uuid: UUID_LOCK_SERVICE,
    notify_char_uuid: UUID_LOCK_NOTIFY_CHAR,
    write_char_uuid: UUID_LOCK_WRITE_CHAR,
    commands: CommandCodes {
        unlock: 0x0,
        lock: 0x1,
        update_code: 0x2,
        app_ready: 0x3,
        reset: 0x4,
    },
    status_codes: [
        (0x10, StatusEvent::LockSuccess),
        (0x11, StatusEvent::UnlockSuccess),
        (0x12, StatusEvent::UpdateSuccess),
        (0x13, StatusEvent::ResetSuccess),
        (0x14, StatusEvent::NeedsUpdate),
        (0x15, StatusEvent::CodesRunOut),
        (0x16, StatusEvent::UnlockFail),
        (0x17, StatusEvent::LockFail),
        (0x18, StatusEvent::CodeOutOfDate),
        (0x19, StatusEvent::CodeInvalid),
        (0x1A, StatusEvent::DeviceIdFail),
        (0xD0, StatusEvent::LockState),
        (0xD1, StatusEvent::UnlockState),
        (0xD2, StatusEvent::UnusableState),
    ],
    update_code_digits: UPDATE_CODE_DIGITS,
    max_code_len: MAX_ACCESS_CODE_LEN,
    max_device_id_len: DEVICE_ID_LEN,
    timestamp_len: TIMESTAMP_LEN,
};

impl Default for ProtocolProfile {
    fn default() -> Self {
        SMARTLOCK_PROFILE
    }
}

impl ProtocolProfile {
    /// Looks up the event a raw status code maps to, if it is known
    pub fn status_for(&self, code: u16) -> Option<StatusEvent> {
        self.status_codes
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, event)| *event)
    }
}
