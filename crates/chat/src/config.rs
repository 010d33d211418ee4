//! Configuration management for the chat server.
//!
//! This module handles loading, validation, and conversion of server configuration
//! from TOML files and command-line arguments.

use crate::cli::CliArgs;
use chat_server::config::{DEFAULT_MAX_LINE_LENGTH, DEFAULT_PORT};
use chat_server::ServerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

fn default_max_line_length() -> usize {
    DEFAULT_MAX_LINE_LENGTH
}

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration settings
    pub server: ServerSettings,
    /// Logging configuration settings
    pub logging: LoggingSettings,
}

/// Server-specific configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the server to (e.g., "0.0.0.0:12345")
    pub bind_address: String,
    /// Path of the `username:password` file
    pub credentials_file: String,
    /// Longest inbound line accepted, in bytes
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

/// Logging system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
                credentials_file: "users.txt".to_string(),
                max_line_length: DEFAULT_MAX_LINE_LENGTH,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Loads the file named on the command line and applies the CLI
    /// overrides on top of it. Every startup path goes through here once.
    pub async fn from_args(args: &CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = Self::load_from_file(&args.config_path)
            .await
            .map_err(|e| format!("Failed to load {}: {e}", args.config_path.display()))?;
        config.apply_overrides(args);
        Ok(config)
    }

    /// Converts the application configuration to a chat server configuration.
    pub fn to_server_config(&self) -> Result<ServerConfig, Box<dyn std::error::Error>> {
        Ok(ServerConfig {
            bind_address: self.server.bind_address.parse()?,
            credentials_path: PathBuf::from(&self.server.credentials_file),
            max_line_length: self.server.max_line_length,
        })
    }

    /// Applies command-line overrides on top of file settings.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(bind_address) = &args.bind_address {
            self.server.bind_address = bind_address.clone();
        }
        if let Some(users_file) = &args.users_file {
            self.server.credentials_file = users_file.to_string_lossy().to_string();
        }
        if let Some(log_level) = &args.log_level {
            self.logging.level = log_level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Validates the configuration settings.
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!(
                "Invalid bind address: {}",
                &self.server.bind_address
            ));
        }

        if self.server.credentials_file.trim().is_empty() {
            return Err("Credentials file cannot be empty".to_string());
        }

        if self.server.max_line_length == 0 {
            return Err("max_line_length must be greater than 0".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.server.bind_address, "0.0.0.0:12345");
        assert_eq!(config.server.credentials_file, "users.txt");
        assert_eq!(config.server.max_line_length, 1024);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:12345");
        assert!(path.exists());

        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.credentials_file, "users.txt");
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:4000"
credentials_file = "/etc/chat/users.txt"
max_line_length = 256

[logging]
level = "debug"
json_format = true
"#;
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:4000");
        assert_eq!(config.server.credentials_file, "/etc/chat/users.txt");
        assert_eq!(config.server.max_line_length, 256);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_load_from_invalid_toml() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[server\nbind_address = ")
            .await
            .unwrap();

        assert!(AppConfig::load_from_file(temp_file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_from_args_reports_parse_errors() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[logging]\nlevel = 3\n")
            .await
            .unwrap();
        let args = CliArgs::try_parse_from([
            "chat".to_string(),
            "-c".to_string(),
            temp_file.path().display().to_string(),
            "-l".to_string(),
            "debug".to_string(),
        ])
        .unwrap();

        let err = AppConfig::from_args(&args).await.unwrap_err();
        assert!(err.to_string().contains("Failed to load"));
    }

    #[tokio::test]
    async fn test_from_args_applies_overrides_to_file() {
        let temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[server]
bind_address = "127.0.0.1:4000"
credentials_file = "users.txt"

[logging]
level = "warn"
"#;
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();
        let args = CliArgs::try_parse_from([
            "chat".to_string(),
            "-c".to_string(),
            temp_file.path().display().to_string(),
            "--json-logs".to_string(),
        ])
        .unwrap();

        let config = AppConfig::from_args(&args).await.unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:4000");
        assert_eq!(config.logging.level, "warn");
        assert!(config.logging.json_format);
    }

    #[test]
    fn test_serde_deserialization_with_defaults() {
        let toml_content = r#"
[server]
bind_address = "0.0.0.0:12345"
credentials_file = "users.txt"

[logging]
level = "warn"
"#;
        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.max_line_length, 1024);
        assert!(!config.logging.json_format);
    }

    #[test]
    fn test_to_server_config_conversion() {
        let mut config = AppConfig::default();
        config.server.bind_address = "127.0.0.1:5555".to_string();
        config.server.credentials_file = "accounts.txt".to_string();
        config.server.max_line_length = 64;

        let server_config = config.to_server_config().unwrap();
        assert_eq!(server_config.bind_address.port(), 5555);
        assert_eq!(server_config.credentials_path, PathBuf::from("accounts.txt"));
        assert_eq!(server_config.max_line_length, 64);
    }

    #[test]
    fn test_validation_invalid_bind_address() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Invalid bind address"));
        assert!(config.to_server_config().is_err());
    }

    #[test]
    fn test_validation_empty_credentials_file() {
        let mut config = AppConfig::default();
        config.server.credentials_file = "  ".to_string();

        let result = config.validate();
        assert!(result.unwrap_err().contains("Credentials file cannot be empty"));
    }

    #[test]
    fn test_validation_zero_line_length() {
        let mut config = AppConfig::default();
        config.server.max_line_length = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_log_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let mut config = AppConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "Level '{}' should be valid", level);
        }

        let mut config = AppConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("Invalid log level"));
    }
}
