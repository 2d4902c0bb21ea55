use std::path::PathBuf;

use anyhow::Result;
use chrono::Local;
use log::{error, info, warn};
use smartlock_controller_lib::commands::{self, Reply};
use smartlock_controller_lib::config::AppConfig;
use smartlock_controller_lib::core::driver::UserIntent;
use smartlock_controller_lib::logging;
use smartlock_controller_lib::state::AppState;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => AppConfig::default_path()?,
    };
    let config = AppConfig::load_config(&config_path).await?;

    if let Err(e) = logging::init(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }
    info!("Starting SmartLock controller with config {:?}", config_path);

    let (app_state, mut updates) = AppState::new(&config).await?;

    let printer = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            println!("[{}]: {}", Local::now().format("%H:%M:%S"), update);
        }
    });

    if let Err(e) = app_state.session.submit(UserIntent::Connect).await {
        warn!("Initial connect failed: {}", e);
    }
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted.");
                break;
            }
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        error!("Failed to read stdin: {}", e);
                        break;
                    }
                };

                let command = match commands::parse_line(&line) {
                    Ok(Some(command)) => command,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{}", e);
                        continue;
                    }
                };

                match commands::run_command(&app_state, command).await {
                    Ok(Reply::Done) => {}
                    Ok(Reply::Text(text)) => println!("{}", text),
                    Ok(Reply::Quit) => break,
                    Err(e) => warn!("Command failed: {}", e),
                }
            }
        }
    }

    app_state.shutdown().await;
    // The sink closes with the session, which ends the printer.
    if let Err(e) = printer.await {
        error!("Printer task ended abnormally: {:?}", e);
    }
    Ok(())
}
