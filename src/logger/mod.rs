/// Leveled, tagged logging for streamgate
///
/// Usage: `logger::info(LogTag::Fanout, "delivered 12 updates")`. Output
/// goes to the console (colored) and the process log file (plain). Debug
/// and Verbose are opt-in per subsystem via --debug-<area> /
/// --verbose-<area> flags.
pub mod config;
mod core;
mod file;
mod format;
pub mod levels;
pub mod tags;

pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger from CLI flags and open the file sink
///
/// Must run after paths::ensure_all_directories() so the logs directory
/// exists.
pub fn init() {
    config::init_from_args();
    file::init_file_logging();
}

/// Apply settings from the loaded config file (level + file sink toggle)
pub fn apply_file_config(min_level: &str, file_enabled: bool) {
    if let Some(level) = LogLevel::from_str(min_level) {
        config::set_min_level(level);
    }
    file::set_file_logging_enabled(file_enabled);
}

pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}
