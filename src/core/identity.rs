//! Phone identity and timestamps bound into every command frame

use chrono::{Local, NaiveDate, NaiveDateTime};
use log::{info, warn};
use rand::Rng;

use crate::core::bluetooth::constants::DEVICE_ID_LEN;

/// `yyMMddHHmm`, no separators
pub const TIMESTAMP_FORMAT: &str = "%y%m%d%H%M";

const MACHINE_ID_PATH: &str = "/etc/machine-id";

/// Identity context for one command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Phone id the lock binds its codes to
    pub device_id: String,
    /// Wall-clock time of the command, in `yyMMddHHmm`
    pub timestamp: String,
}

impl Identity {
    pub fn new(device_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Source of wall-clock time for command timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Current time rendered in the frame's timestamp format
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// Local time of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock stuck at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Builds a clock from calendar fields, `None` if they are out of range
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, minute, 0)
            .map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn format_timestamp(time: &NaiveDateTime) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Resolves the phone id sent with every command.
///
/// An explicit override wins. Otherwise the host's machine id is used, and
/// failing that a random id is drawn for this session only.
pub fn resolve_phone_id(override_id: Option<&str>) -> String {
    if let Some(id) = override_id.map(str::trim).filter(|id| !id.is_empty()) {
        info!("Using configured phone id");
        return id.to_string();
    }

    match std::fs::read_to_string(MACHINE_ID_PATH) {
        Ok(contents) => {
            if let Some(id) = phone_id_from_machine_id(&contents) {
                info!("Derived phone id from {}", MACHINE_ID_PATH);
                return id;
            }
            warn!("{} is malformed, generating a session phone id", MACHINE_ID_PATH);
        }
        Err(e) => warn!(
            "Could not read {}: {}. Generating a session phone id",
            MACHINE_ID_PATH, e
        ),
    }

    random_phone_id(&mut rand::thread_rng())
}

/// First [`DEVICE_ID_LEN`] hex characters of a machine id
pub fn phone_id_from_machine_id(contents: &str) -> Option<String> {
    let id: String = contents
        .trim()
        .chars()
        .filter(char::is_ascii_hexdigit)
        .take(DEVICE_ID_LEN)
        .collect();
    (id.len() == DEVICE_ID_LEN).then_some(id)
}

pub fn random_phone_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    const HEX: &[u8] = b"0123456789abcdef";
    (0..DEVICE_ID_LEN)
        .map(|_| char::from(HEX[rng.gen_range(0..HEX.len())]))
        .collect()
}
