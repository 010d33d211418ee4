//! # Chat Server - Main Entry Point
//!
//! Handles CLI parsing, configuration loading, logging and the application
//! lifecycle around the `chat_server` library.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (creates config.toml if missing)
//! chat
//!
//! # Specify custom configuration
//! chat --config production.toml
//!
//! # Override specific settings
//! chat --bind 0.0.0.0:12345 --users /etc/chat/users.txt --log-level debug
//!
//! # JSON logging for production
//! chat --json-logs
//! ```
//!
//! ## Signal Handling
//!
//! The server shuts down gracefully on SIGINT (Ctrl+C) or SIGTERM. A second
//! signal exits immediately.

use tracing::{error, info};

pub mod app;
pub mod cli;
pub mod config;
pub mod logging;
pub mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Runs the chat server application.
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Called from the binary's `#[tokio::main]`, so it must not start a
/// runtime of its own.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Logging settings come from the file, so read it before anything logs.
    let config = match AppConfig::from_args(&args).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::setup_logging(&config.logging) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }
    info!("🔧 Configuration loaded from: {}", args.config_path.display());

    match Application::new(config).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e}");
            std::process::exit(1);
        }
    }

    Ok(())
}

pub use config::{LoggingSettings, ServerSettings};
