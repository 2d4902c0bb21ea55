use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::bluetooth::constants::{
    CONNECT_RETRY_DELAY_MS, DEFAULT_SCAN_DURATION_SECS, MAX_CONNECT_RETRIES, RESPONSE_TIMEOUT_SECS,
};
use crate::core::profile::{ProtocolProfile, SMARTLOCK_PROFILE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Advertised name matched while scanning when no `device_id` is set
    pub device_name: String,

    /// Platform id of the lock to connect to. Takes priority over the name.
    pub device_id: Option<String>,

    /// Phone id sent in every frame, overriding the one derived from the host
    pub phone_id: Option<String>,

    pub max_connect_retries: u32,

    pub connect_retry_delay_ms: u64,

    /// How long to scan before giving up
    pub scan_timeout_secs: u64,

    /// Seconds to wait for the lock to answer a command; `null` disables the check
    pub response_timeout_secs: Option<u64>,
}

impl Default for LockConfig {
    fn default() -> Self {
        LockConfig::for_profile(&SMARTLOCK_PROFILE)
    }
}

impl LockConfig {
    /// Defaults for a lock speaking `profile`, matched by its advertised name
    pub fn for_profile(profile: &ProtocolProfile) -> Self {
        LockConfig {
            device_name: profile.device_name.to_string(),
            device_id: None,
            phone_id: None,
            max_connect_retries: MAX_CONNECT_RETRIES,
            connect_retry_delay_ms: CONNECT_RETRY_DELAY_MS,
            scan_timeout_secs: DEFAULT_SCAN_DURATION_SECS,
            response_timeout_secs: Some(RESPONSE_TIMEOUT_SECS),
        }
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_secs.map(Duration::from_secs)
    }
}
