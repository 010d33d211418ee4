//! Logging system setup and configuration.
//!
//! This module handles the initialization and configuration of the tracing-based
//! logging system with support for both human-readable and JSON output formats.

use crate::config::LoggingSettings;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initializes the global subscriber from the merged logging settings.
///
/// `RUST_LOG`, when set, takes precedence over `config.level`. Fails if a
/// global subscriber is already installed.
pub fn setup_logging(config: &LoggingSettings) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let output = fmt::layer()
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(true)
        .with_thread_names(true);
    let output = if config.json_format {
        output.json().boxed()
    } else {
        output.with_ansi(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(output)
        .try_init()?;

    info!(
        "🔧 Logging initialized with level: {} ({})",
        config.level,
        if config.json_format { "json" } else { "text" }
    );
    Ok(())
}

/// Displays the startup banner through the logger.
pub fn display_banner() {
    let version = option_env!("CARGO_PKG_VERSION").unwrap_or("UNK");
    info!("╔══════════════════════════════════════════╗");
    info!("║             💬 CHAT SERVER 💬            ║");
    info!("║                  v{:<8}               ║", version);
    info!("║                                          ║");
    info!("║  👥 Broadcast, private and group chat    ║");
    info!("║  🔐 Password login                       ║");
    info!("║  🌐 Plain TCP, one line per message      ║");
    info!("╚══════════════════════════════════════════╝");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_logging_installs_once() {
        let settings = LoggingSettings {
            level: "debug".to_string(),
            json_format: true,
        };

        assert!(setup_logging(&settings).is_ok());
        assert!(setup_logging(&settings).is_err());
    }
}
