//! Constants used throughout the application
//! This module contains the fixed values of the SmartLock peripheral,
//! such as UUIDs, timeouts, and protocol field limits.

use uuid::Uuid;

/// The advertised name of the SmartLock peripheral
pub const LOCK_NAME: &str = "SmartLock";

/// The UUID of the SmartLock custom service
pub const UUID_LOCK_SERVICE: Uuid = Uuid::from_u128(0x8653000a_43e6_47b7_9cb0_5fc21d4ae340);

/// The UUID of the SmartLock status notification characteristic
pub const UUID_LOCK_NOTIFY_CHAR: Uuid = Uuid::from_u128(0x8653000b_43e6_47b7_9cb0_5fc21d4ae340);

/// The UUID of the SmartLock command write characteristic
pub const UUID_LOCK_WRITE_CHAR: Uuid = Uuid::from_u128(0x8653000c_43e6_47b7_9cb0_5fc21d4ae340);

/// Maximum number of connection retries
pub const MAX_CONNECT_RETRIES: u32 = 5;

/// Delay between connection retries in milliseconds
pub const CONNECT_RETRY_DELAY_MS: u64 = 1000;

/// Timeout for the lock to answer a command, in seconds
pub const RESPONSE_TIMEOUT_SECS: u64 = 10;

/// Scan duration in seconds
pub const DEFAULT_SCAN_DURATION_SECS: u64 = 10;

/// Length of the phone id the firmware stores per code batch
pub const DEVICE_ID_LEN: usize = 16;

/// Length of a `yyMMddHHmm` timestamp
pub const TIMESTAMP_LEN: usize = 10;

/// Number of digits generated by an update-code command
pub const UPDATE_CODE_DIGITS: usize = 3;

/// Longest access code whose length still fits in one decimal digit
pub const MAX_ACCESS_CODE_LEN: usize = 9;
