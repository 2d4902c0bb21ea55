use std::io::Write;

use chrono::Local;
use log::{LevelFilter, SetLoggerError};

/// Installs the global logger. `RUST_LOG` overrides `level`;
/// an unparsable `level` falls back to `info`.
pub fn init(level: &str) -> Result<(), SetLoggerError> {
    let level_filter = level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    env_logger::Builder::new()
        .filter_level(level_filter)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} {}: {}",
                Local::now().to_rfc3339(),
                record.level(),
                record.target(),
                record.args()
            )
        })
        .try_init()
}
