//! Configuration module for autoboard-server.
//!
//! Handles loading configuration from TOML files, CLI arguments,
//! and environment variables.

pub mod file;

use crate::config::file::FileConfig;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: std::path::PathBuf,
    listen_override: Option<SocketAddr>,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(config_path: impl AsRef<Path>, listen_override: Option<SocketAddr>) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            listen_override,
        }
    }

    /// Read the TOML file, apply CLI overrides and validate.
    pub fn load(&self) -> Result<FileConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<FileConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        if let Some(listen) = self.listen_override {
            file_config.server.listen = listen;
        }

        validate(&file_config)?;
        Ok(file_config)
    }
}

fn validate(config: &FileConfig) -> Result<(), ConfigError> {
    if config.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.bot_token must not be empty".to_string(),
        ));
    }
    if config.telegram.channel_id.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.channel_id must not be empty".to_string(),
        ));
    }
    if config.scheduler.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "scheduler.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.scheduler.batch_size <= 0 {
        return Err(ConfigError::ValidationError(format!(
            "scheduler.batch_size must be positive, got {}",
            config.scheduler.batch_size
        )));
    }
    Ok(())
}

/// Get the database URL from the environment.
pub fn get_database_url() -> Result<String, ConfigError> {
    std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)
}
