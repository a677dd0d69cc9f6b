/// Central log filtering
///
/// Filtering rules:
/// 1. Errors are always shown
/// 2. Everything else must clear the minimum level threshold
/// 3. Debug level requires --debug-<area> for that tag
/// 4. Verbose level requires --verbose or --verbose-<area> for that tag
/// 5. If enabled_tags is non-empty, the tag must be in the set
use super::config::{get_logger_config, is_debug_enabled_for_tag, is_verbose_enabled_for_tag};
use super::levels::LogLevel;
use super::tags::LogTag;

/// Check if a log message should be displayed
pub fn should_log(tag: &LogTag, level: LogLevel) -> bool {
    let config = get_logger_config();

    if level == LogLevel::Error {
        return true;
    }

    if level > config.min_level {
        return false;
    }

    if level == LogLevel::Debug && !is_debug_enabled_for_tag(tag) {
        return false;
    }

    if level == LogLevel::Verbose
        && config.min_level != LogLevel::Verbose
        && !is_verbose_enabled_for_tag(tag)
    {
        return false;
    }

    if !config.enabled_tags.is_empty() && !config.enabled_tags.contains(&tag.to_debug_key()) {
        return false;
    }

    true
}

/// Filtered logging entry point used by the level functions in mod.rs
pub fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if !should_log(&tag, level) {
        return;
    }

    super::format::format_and_log(tag, level.as_str(), message);
}
