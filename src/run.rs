/// Gateway lifecycle
///
/// Bootstraps configuration and registers the services, then blocks
/// until a shutdown signal arrives and unwinds everything in reverse.
use crate::config;
use crate::logger::{self, LogTag};
use crate::services::implementations::{
    FanoutService, StoreService, SweeperService, WebserverService,
};
use crate::services::ServiceManager;

/// Main gateway execution, from bootstrap to graceful shutdown
pub async fn run_gateway() -> Result<(), String> {
    // Safety backup; main.rs already created these before logger init.
    crate::paths::ensure_all_directories()
        .map_err(|e| format!("Failed to create required directories: {}", e))?;

    logger::info(LogTag::System, "StreamGate starting up...");

    // Validate CLI arguments before any of them are consumed
    if let Err(e) = crate::arguments::validate_port_argument() {
        logger::error(LogTag::System, &format!("Argument validation failed: {}", e));
        return Err(e);
    }

    if let Err(e) = crate::arguments::validate_host_argument() {
        logger::error(LogTag::System, &format!("Argument validation failed: {}", e));
        return Err(e);
    }

    // Load configuration (missing file falls back to defaults)
    if !config::is_config_initialized() {
        config::load_config().map_err(|e| format!("Failed to load config: {}", e))?;
        logger::info(LogTag::System, "Configuration loaded");
    }

    config::with_config(|cfg| {
        logger::apply_file_config(&cfg.logging.min_level, cfg.logging.file_enabled);
    });

    // Fold CLI overrides into the config so every reader sees them
    let port_override = crate::arguments::get_port_override();
    let host_override = crate::arguments::get_host_override();

    if port_override.is_some() || host_override.is_some() {
        config::update_config_section(
            |cfg| {
                if let Some(port) = port_override {
                    cfg.server.port = port;
                }
                if let Some(host) = host_override.clone() {
                    cfg.server.host = host;
                }
            },
            false,
        )?;

        logger::info(
            LogTag::System,
            &format!(
                "CLI overrides: host={} port={}",
                host_override.as_deref().unwrap_or("(config)"),
                port_override
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "(config)".to_string())
            ),
        );
    }

    if host_override.as_deref() == Some("0.0.0.0") {
        logger::warning(
            LogTag::System,
            "Binding to 0.0.0.0 allows remote access - ensure firewall is configured",
        );
    }

    // Service manager drives everything else
    let mut service_manager = ServiceManager::new(config::get_config_clone());
    register_all_services(&mut service_manager);
    service_manager.start_all().await?;

    logger::info(LogTag::System, "All services started - StreamGate is running");

    wait_for_shutdown_signal().await?;

    logger::info(LogTag::System, "Initiating graceful shutdown...");
    service_manager.stop_all().await?;

    logger::info(LogTag::System, "StreamGate shut down cleanly");

    Ok(())
}

/// Register all available services
fn register_all_services(manager: &mut ServiceManager) {
    manager.register(Box::new(StoreService));
    manager.register(Box::new(WebserverService::new()));
    manager.register(Box::new(FanoutService));
    manager.register(Box::new(SweeperService));

    logger::info(LogTag::System, "All services registered (4 total)");
}

/// Wait for shutdown signal (SIGINT/SIGTERM on Unix)
async fn wait_for_shutdown_signal() -> Result<(), String> {
    logger::info(
        LogTag::System,
        "Waiting for shutdown signal (press Ctrl+C twice to force kill)",
    );

    #[cfg(unix)]
    let signal_name = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).map_err(|e| format!("Failed to bind SIGINT: {}", e))?;
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| format!("Failed to bind SIGTERM: {}", e))?;

        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
        }
    };

    #[cfg(windows)]
    let signal_name = {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| format!("Failed to listen for shutdown signal: {}", e))?;
        "CTRL_C"
    };

    logger::warning(
        LogTag::System,
        &format!(
            "Shutdown signal received ({}). Press Ctrl+C again to force kill.",
            signal_name
        ),
    );

    // A second Ctrl+C during graceful shutdown exits immediately
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            logger::error(
                LogTag::System,
                "Second Ctrl+C detected, forcing immediate exit.",
            );
            // 130 is the conventional exit code for SIGINT
            std::process::exit(130);
        }
    });

    Ok(())
}
