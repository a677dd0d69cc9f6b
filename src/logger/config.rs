/// Logger runtime configuration
///
/// Initialized from CLI flags before the TOML config exists, then optionally
/// tightened once the config file has been loaded (see run.rs). Kept behind
/// a lock because the level can change after startup.
use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level to display (errors always pass)
    pub min_level: LogLevel,
    /// When non-empty, only these debug keys are shown
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            enabled_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Derive the initial configuration from CLI flags
///
/// --verbose raises the level to Verbose, --quiet lowers it to Warning.
/// Any --debug-<area> flag raises the base level to Debug so gated debug
/// output can actually surface.
pub fn init_from_args() {
    let mut config = LoggerConfig::default();

    if arguments::patterns::is_verbose_mode() {
        config.min_level = LogLevel::Verbose;
    } else if arguments::patterns::is_quiet_mode() {
        config.min_level = LogLevel::Warning;
    } else if arguments::is_any_debug_enabled() {
        config.min_level = LogLevel::Debug;
    }

    *LOGGER_CONFIG.write() = config;
}

/// Apply a minimum level, typically from the loaded config file
///
/// CLI flags win: if --verbose or --quiet was given, the file value is
/// ignored.
pub fn set_min_level(level: LogLevel) {
    if arguments::patterns::is_verbose_mode() || arguments::patterns::is_quiet_mode() {
        return;
    }
    LOGGER_CONFIG.write().min_level = level;
}

/// Restrict output to a set of debug keys (empty = all tags)
pub fn set_enabled_tags(tags: HashSet<String>) {
    LOGGER_CONFIG.write().enabled_tags = tags;
}

/// Check whether --debug-<key> was passed for this tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    arguments::has_arg(&format!("--debug-{}", tag.to_debug_key()))
}

/// Check whether --verbose-<key> was passed for this tag
pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    arguments::has_arg(&format!("--verbose-{}", tag.to_debug_key()))
}
