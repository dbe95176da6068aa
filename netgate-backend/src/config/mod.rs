//! Configuration management module for the netgate backend.
//!
//! This module provides centralized configuration management with support for:
//! - CLI argument parsing
//! - Environment variable configuration (`RUST_LOG`, `NETGATE_HOTSPOT_PASSWORD`)
//! - Configuration validation
//! - Builder pattern for configuration construction
//!
//! The network-state acquisition itself takes no configuration: container
//! detection always looks at `/.dockerenv`.

pub mod app_config;
pub mod cli;

pub use app_config::{AppConfig, AppConfigBuilder, LogLevel};
pub use cli::{CliConfig, HOTSPOT_PASSWORD_ENV};

use anyhow::Result;

/// Main configuration manager that combines all configuration sources
#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub app: AppConfig,
}

impl ConfigManager {
    /// Creates a new configuration manager from CLI arguments and environment
    pub fn from_cli_and_env() -> Result<Self> {
        let cli_config = CliConfig::from_args()?;
        Self::from_cli(&cli_config)
    }

    /// Creates a configuration manager from an already parsed CLI
    pub fn from_cli(cli_config: &CliConfig) -> Result<Self> {
        cli_config.validate()?;
        let app_config = AppConfig::from_cli(cli_config)?;

        Ok(Self { app: app_config })
    }

    /// Validates the entire configuration
    pub fn validate(&self) -> Result<()> {
        self.app
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> Result<()> {
        self.app.init_logging()
    }
}
