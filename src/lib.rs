//! SmartLock controller library
//! Drives a BLE smart lock: encodes commands, tracks lock state from the
//! status codes it pushes back, and reports both to a presentation sink.

pub mod commands;
pub mod config;
pub mod core;
pub mod logging;
pub mod state;
pub mod utils;
