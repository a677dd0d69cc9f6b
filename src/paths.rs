/// Filesystem layout for streamgate
///
/// All runtime files live under one base directory resolved at startup:
/// config, the gateway database and log files. Every other module asks this
/// one for paths instead of hardcoding them.
use once_cell::sync::Lazy;
use std::path::PathBuf;

/// Directory name created under the platform data directory
const APP_DIR_NAME: &str = "streamgate";

/// Base directory for all runtime state
///
/// Resolution order: platform-local data dir, then roaming data dir, then
/// the home directory, then the current directory as a last resort.
pub static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(|| {
    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR_NAME);
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_DIR_NAME);
    }
    if let Some(dir) = dirs::home_dir() {
        return dir.join(format!(".{}", APP_DIR_NAME));
    }
    PathBuf::from(APP_DIR_NAME)
});

/// Data directory (config + databases)
pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

/// Log file directory
pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

/// TOML configuration file path
pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

/// SQLite database holding nonces, subscriptions and the outbox queue
pub fn get_gateway_db_path() -> PathBuf {
    get_data_directory().join("gateway.db")
}

/// Main process log file
pub fn get_log_file_path() -> PathBuf {
    get_logs_directory().join("streamgate.log")
}

/// Creates every directory the process needs before anything else runs
///
/// Called from main() before logger initialization, so failures are
/// reported on stderr by the caller rather than through the logger.
pub fn ensure_all_directories() -> Result<(), String> {
    let directories = [
        ("base", BASE_DIRECTORY.clone()),
        ("data", get_data_directory()),
        ("logs", get_logs_directory()),
    ];

    for (name, dir) in directories.iter() {
        std::fs::create_dir_all(dir)
            .map_err(|e| format!("Failed to create {} directory {}: {}", name, dir.display(), e))?;
    }

    Ok(())
}
