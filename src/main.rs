use streamgate::{
    arguments::{patterns, print_debug_info, print_help},
    logger::{self, LogTag},
};

/// Main entry point for StreamGate
///
/// Handles --help up front, then hands control to the gateway
/// lifecycle in `run`.
#[tokio::main]
async fn main() {
    // Ensure all directories exist BEFORE logger initialization
    // (the logger needs the logs directory for its file sink)
    if let Err(e) = streamgate::paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    // Print debug information if any debug modes are enabled
    print_debug_info();

    if let Err(e) = streamgate::run::run_gateway().await {
        logger::error(LogTag::System, &format!("StreamGate exited with error: {}", e));
        std::process::exit(1);
    }
}
