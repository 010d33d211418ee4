//! Main application logic and lifecycle management.
//!
//! This module contains the `Application` struct that loads configuration,
//! builds the chat server, runs it until a termination signal arrives, and
//! then shuts it down.

use crate::{
    config::AppConfig,
    logging::display_banner,
    signals::{setup_signal_handlers, shutdown_signal},
};
use chat_server::{load_server, ChatServer, ShutdownState};
use std::time::Duration;
use tracing::{error, info, warn};

/// How long the accept loop gets to wind down before its task is abandoned.
const SERVER_STOP_TIMEOUT: Duration = Duration::from_secs(8);

/// The running application.
pub struct Application {
    /// Loaded application configuration, CLI overrides applied
    config: AppConfig,
    /// Chat server instance
    server: ChatServer,
}

impl Application {
    /// Creates a new application instance from an already merged
    /// configuration (file settings with CLI overrides applied).
    ///
    /// Validates the configuration, then loads the credential file and
    /// builds the server. Nothing is bound yet.
    pub async fn new(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration validated successfully");

        display_banner();

        let server = load_server(config.to_server_config()?).await?;
        Ok(Self { config, server })
    }

    /// Runs the server until a termination signal, then shuts down.
    ///
    /// A second signal during shutdown exits the process at once.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.log_configuration_summary();

        let shutdown_state = ShutdownState::new();

        let server_handle = {
            let server = self.server;
            let shutdown_state = shutdown_state.clone();
            tokio::spawn(async move {
                match server.start_with_shutdown_state(shutdown_state).await {
                    Ok(()) => info!("✅ Server completed successfully"),
                    Err(e) => {
                        error!("❌ Server error: {}", e);
                        std::process::exit(1);
                    }
                }
            })
        };

        info!("🛑 Press Ctrl+C to gracefully shutdown");
        setup_signal_handlers(&shutdown_state).await?;

        // merciless shutdown
        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Failed to set up merciless shutdown signal handler: {e}");
                return;
            }
            warn!("Shutdown handler received again! I'll make this quick.");
            std::process::exit(1);
        });

        info!("⏳ Waiting for the accept loop to stop...");
        match tokio::time::timeout(SERVER_STOP_TIMEOUT, server_handle).await {
            Ok(Ok(())) => info!("✅ Server task completed gracefully"),
            Ok(Err(e)) => warn!("Server task ended abnormally: {}", e),
            Err(_) => warn!("⏰ Server task did not complete within timeout, proceeding"),
        }

        shutdown_state.complete_shutdown();
        info!("👋 Chat server shutdown complete");
        Ok(())
    }

    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🌐 Bind address: {}", self.config.server.bind_address);
        info!("  🔑 Credentials: {}", self.config.server.credentials_file);
        info!("  📏 Max line length: {} bytes", self.config.server.max_line_length);
    }
}
