//! Tracker service entry point

use asin_tracker::config::Config;
use asin_tracker::server;
use asin_tracker::utils::logging;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Local development reads credentials from a .env file.
    dotenvy::dotenv().ok();
    logging::init_logging();

    let config = match load_config().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match server::run_server(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Config file when TRACKER_CONFIG points at one, environment otherwise
async fn load_config() -> asin_tracker::Result<Config> {
    match std::env::var("TRACKER_CONFIG") {
        Ok(path) => Config::from_file(path).await,
        Err(_) => Config::from_env(),
    }
}
