mod api;
mod catalog;
mod categories;
mod cli;
mod config;
mod database;
mod error;
mod products;
mod schema;
mod seed;
mod server;
mod stores;
mod utils;

use cli::Cli;
use config::Config;
use directories::ProjectDirs;
use flexi_logger::{
    detailed_format, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming,
};
use log::{error, info};
use std::path::Path;

use crate::error::StorefrontError;

const LOG_FILE_SIZE: u64 = 10_000_000;
const LOG_FILES_KEPT: usize = 7;

fn main() {
    let Some(project_dirs) = ProjectDirs::from("", "", "storefront") else {
        eprintln!("Could not determine project directory");
        std::process::exit(1);
    };
    let data_dir = project_dirs.data_local_dir();

    let config = Config::init(Config::load_config(&project_dirs));

    // The handle must stay alive for the logger to keep writing
    let _logger = match setup_logging(data_dir, &config.logging.log_spec()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    info!("Storefront starting with data directory {}", data_dir.display());

    if let Err(e) = Cli::handle_command_line(data_dir) {
        error!("Exiting with error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn setup_logging(data_dir: &Path, log_spec: &str) -> Result<LoggerHandle, StorefrontError> {
    let log_dir = data_dir.join("logs");

    Logger::try_with_str(log_spec)
        .and_then(|logger| {
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(&log_dir)
                        .basename("storefront"),
                )
                .format_for_files(detailed_format)
                .duplicate_to_stderr(Duplicate::Warn)
                .rotate(
                    Criterion::Size(LOG_FILE_SIZE),
                    Naming::Timestamps,
                    Cleanup::KeepLogFiles(LOG_FILES_KEPT),
                )
                .start()
        })
        .map_err(|e| StorefrontError::Error(format!("Failed to start logger: {}", e)))
}
