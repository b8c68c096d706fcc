//! Configuration management for the inventory server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with INVENTORY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::forecast::MAX_WINDOW_DAYS;
use shared::{ExpiredStockPolicy, InventorySettings};

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Log output configuration
    pub logging: LoggingConfig,

    /// Display thresholds for expiry and depletion warnings
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Requests running longer than this are answered with 408
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format
    pub json: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    pub expiry_warning_days: i64,
    pub depletion_warning_days: i64,
    pub forecast_window_days: u32,
    pub expired_stock_policy: ExpiredStockPolicy,
}

impl InventoryConfig {
    pub fn settings(&self) -> InventorySettings {
        InventorySettings {
            expiry_warning_days: self.expiry_warning_days,
            depletion_warning_days: self.depletion_warning_days,
            forecast_window_days: self.forecast_window_days,
            expired_stock_policy: self.expired_stock_policy,
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("INVENTORY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("logging.json", false)?
            .set_default("inventory.expiry_warning_days", 7)?
            .set_default("inventory.depletion_warning_days", 7)?
            .set_default("inventory.forecast_window_days", 7)?
            .set_default("inventory.expired_stock_policy", "exclude")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (INVENTORY_ prefix)
            .add_source(
                Environment::with_prefix("INVENTORY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.inventory.forecast_window_days == 0
            || self.inventory.forecast_window_days > MAX_WINDOW_DAYS
        {
            return Err(ConfigError::Message(format!(
                "inventory.forecast_window_days must be between 1 and {}",
                MAX_WINDOW_DAYS
            )));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "server.request_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.inventory.expiry_warning_days < 0 || self.inventory.depletion_warning_days < 0 {
            return Err(ConfigError::Message(
                "inventory warning days cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
