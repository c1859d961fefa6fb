#![cfg(not(tarpaulin_include))]

use ps_dashboard::app;
use ps_dashboard::config::load_config;
use std::path::PathBuf;

/// Main entry point for the dashboard web server
///
/// Loads the configuration, imports the CSV named there and serves the
/// dashboard until the process is stopped.
///
/// # Arguments
/// * Optional first command line argument: path to a TOML config file.
///   Without it `dashboard.toml` in the working directory is used if present,
///   otherwise the embedded default.
///
/// # Logging
/// * `RUST_LOG` selects the level, `info` by default
#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);

    let config = match load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = app::run(config).await {
        log::error!("Dashboard stopped: {}", e);
        std::process::exit(1);
    }
}
