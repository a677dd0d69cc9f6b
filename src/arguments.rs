/// Centralized argument handling for streamgate
///
/// All command-line parsing and debug flag checking lives here so binaries,
/// services and the logger agree on one source of truth.
///
/// Features:
/// - Centralized CMD_ARGS storage with thread-safe access
/// - Debug flag checking functions for all subsystems
/// - Host/port override parsing with validation
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Thread-safe singleton that stores arguments for access throughout the application
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Sets the global command-line arguments
/// Used by tests to override the default env::args() collection
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Gets a copy of the current command-line arguments
/// Returns a vector clone to avoid holding the mutex lock
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => {
            // Fallback to env::args if mutex is poisoned
            env::args().collect()
        }
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
/// Returns None if the flag is not found or has no value
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    for (i, arg) in args.iter().enumerate() {
        if arg == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// These functions check for specific debug flags in the command-line arguments
// =============================================================================

/// WebSocket connection handling debug mode
pub fn is_debug_ws_enabled() -> bool {
    has_arg("--debug-ws")
}

/// Authentication gate debug mode
pub fn is_debug_auth_enabled() -> bool {
    has_arg("--debug-auth")
}

/// Subscription registry debug mode
pub fn is_debug_registry_enabled() -> bool {
    has_arg("--debug-registry")
}

/// Fan-out delivery debug mode
pub fn is_debug_fanout_enabled() -> bool {
    has_arg("--debug-fanout")
}

/// Room actor debug mode
pub fn is_debug_rooms_enabled() -> bool {
    has_arg("--debug-rooms")
}

/// Outbox queue debug mode
pub fn is_debug_queue_enabled() -> bool {
    has_arg("--debug-queue")
}

/// Expiry sweeper debug mode
pub fn is_debug_sweeper_enabled() -> bool {
    has_arg("--debug-sweeper")
}

/// SQLite store debug mode
pub fn is_debug_store_enabled() -> bool {
    has_arg("--debug-store")
}

/// HTTP server debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

// =============================================================================
// SERVER OVERRIDES
// =============================================================================

/// Host override from --host, validated at startup
pub fn get_host_override() -> Option<String> {
    get_arg_value("--host")
}

/// Port override from --port, validated at startup
pub fn get_port_override() -> Option<u16> {
    get_arg_value("--port").and_then(|s| s.parse().ok())
}

/// Validates a --port value if one was supplied
/// Rejects non-numeric values and port 0
pub fn validate_port_argument() -> Result<(), String> {
    if let Some(raw) = get_arg_value("--port") {
        match raw.parse::<u16>() {
            Ok(0) => Err("--port must be between 1 and 65535".to_string()),
            Ok(_) => Ok(()),
            Err(_) => Err(format!("--port value '{}' is not a valid port number", raw)),
        }
    } else {
        Ok(())
    }
}

/// Validates a --host value if one was supplied
/// Accepts anything non-empty without whitespace; bind errors surface later
pub fn validate_host_argument() -> Result<(), String> {
    if let Some(raw) = get_arg_value("--host") {
        if raw.is_empty() || raw.contains(char::is_whitespace) {
            return Err(format!("--host value '{}' is not a valid bind address", raw));
        }
    }
    Ok(())
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("StreamGate - Real-time price/balance fan-out gateway");
    println!();
    println!("USAGE:");
    println!("    streamgate [FLAGS]");
    println!();
    println!("CORE FLAGS:");
    println!("    --host <address>          Bind address override (default from config)");
    println!("    --port <port>             Listen port override (default from config)");
    println!("    --help, -h                Show this help message");
    println!("    --verbose, -v             Enable verbose log output");
    println!();
    println!("DEBUG FLAGS:");
    println!("    --debug-auth              Authentication gate debug mode");
    println!("    --debug-fanout            Fan-out delivery debug mode");
    println!("    --debug-queue             Outbox queue debug mode");
    println!("    --debug-registry          Subscription registry debug mode");
    println!("    --debug-rooms             Room actor debug mode");
    println!("    --debug-store             SQLite store debug mode");
    println!("    --debug-sweeper           Expiry sweeper debug mode");
    println!("    --debug-webserver         HTTP server debug mode");
    println!("    --debug-ws                WebSocket connection debug mode");
    println!();
    println!("EXAMPLES:");
    println!("    streamgate                                  # Start with config defaults");
    println!("    streamgate --port 9090                      # Override listen port");
    println!("    streamgate --debug-ws --debug-fanout        # Trace socket and delivery paths");
    println!("    streamgate --help                           # Show this help");
}

// =============================================================================
// UTILITY FUNCTIONS
// =============================================================================

/// Checks if any debug mode is enabled
pub fn is_any_debug_enabled() -> bool {
    is_debug_ws_enabled()
        || is_debug_auth_enabled()
        || is_debug_registry_enabled()
        || is_debug_fanout_enabled()
        || is_debug_rooms_enabled()
        || is_debug_queue_enabled()
        || is_debug_sweeper_enabled()
        || is_debug_store_enabled()
        || is_debug_webserver_enabled()
}

/// Gets a list of all enabled debug modes
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();

    if is_debug_ws_enabled() {
        modes.push("ws");
    }
    if is_debug_auth_enabled() {
        modes.push("auth");
    }
    if is_debug_registry_enabled() {
        modes.push("registry");
    }
    if is_debug_fanout_enabled() {
        modes.push("fanout");
    }
    if is_debug_rooms_enabled() {
        modes.push("rooms");
    }
    if is_debug_queue_enabled() {
        modes.push("queue");
    }
    if is_debug_sweeper_enabled() {
        modes.push("sweeper");
    }
    if is_debug_store_enabled() {
        modes.push("store");
    }
    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }

    modes
}

/// Prints debug information about current arguments and enabled debug modes
pub fn print_debug_info() {
    let enabled_modes = get_enabled_debug_modes();
    if enabled_modes.is_empty() {
        return;
    }
    println!("Command-line arguments: {:?}", get_cmd_args());
    println!("Enabled debug modes: {:?}", enabled_modes);
}

// =============================================================================
// COMMON ARGUMENT PATTERNS
// =============================================================================

/// Common argument parsing patterns shared by the binary and tests
pub mod patterns {
    use super::*;

    /// Checks for help flags
    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    /// Checks for version flags
    pub fn is_version_requested() -> bool {
        has_arg("--version") || has_arg("-V")
    }

    /// Checks for quiet/silent mode
    pub fn is_quiet_mode() -> bool {
        has_arg("--quiet") || has_arg("-q")
    }

    /// Checks for verbose mode
    pub fn is_verbose_mode() -> bool {
        has_arg("--verbose") || has_arg("-v")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test because CMD_ARGS is process-global and cargo runs tests
    // on multiple threads
    #[test]
    fn test_argument_store_flags_and_validation() {
        let test_args = vec![
            "streamgate".to_string(),
            "--debug-fanout".to_string(),
            "--port".to_string(),
            "9090".to_string(),
        ];
        set_cmd_args(test_args.clone());
        assert_eq!(get_cmd_args(), test_args);
        assert!(has_arg("--debug-fanout"));
        assert!(!has_arg("--debug-auth"));
        assert_eq!(get_arg_value("--port"), Some("9090".to_string()));
        assert_eq!(get_arg_value("--host"), None);
        assert_eq!(get_port_override(), Some(9090));
        assert!(validate_port_argument().is_ok());

        set_cmd_args(vec![
            "streamgate".to_string(),
            "--port".to_string(),
            "abc".to_string(),
        ]);
        assert!(validate_port_argument().is_err());

        set_cmd_args(vec![
            "streamgate".to_string(),
            "--port".to_string(),
            "0".to_string(),
        ]);
        assert!(validate_port_argument().is_err());

        set_cmd_args(vec![
            "streamgate".to_string(),
            "--host".to_string(),
            "bad host".to_string(),
        ]);
        assert!(validate_host_argument().is_err());

        set_cmd_args(vec![
            "streamgate".to_string(),
            "--debug-queue".to_string(),
            "--debug-sweeper".to_string(),
        ]);
        assert!(is_debug_queue_enabled());
        assert!(is_debug_sweeper_enabled());
        assert!(!is_debug_rooms_enabled());
        assert!(is_any_debug_enabled());

        let enabled_modes = get_enabled_debug_modes();
        assert!(enabled_modes.contains(&"queue"));
        assert!(enabled_modes.contains(&"sweeper"));
        assert!(!enabled_modes.contains(&"rooms"));

        set_cmd_args(vec!["streamgate".to_string(), "-h".to_string()]);
        assert!(patterns::is_help_requested());
        assert!(!patterns::is_version_requested());
        assert!(!patterns::is_quiet_mode());

        set_cmd_args(vec!["streamgate".to_string(), "--verbose".to_string()]);
        assert!(patterns::is_verbose_mode());
    }
}
