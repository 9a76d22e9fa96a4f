//! Configuration management for the Boutique stock platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with BTQ_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Admin notification stream configuration
    pub notifications: NotificationConfig,

    /// Stock accounting configuration
    pub inventory: InventoryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
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
pub struct JwtConfig {
    /// Secret key used to verify admin tokens
    pub secret: String,
}

/// How broadcasts reach admin streams
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// In-process only; streams held by other instances are not reached
    #[default]
    Local,
    /// Through PostgreSQL LISTEN/NOTIFY so every instance re-broadcasts
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Interval between keep-alive comment frames on SSE streams
    pub keep_alive_secs: u64,

    /// Events queued per stream before it is considered dead
    pub channel_capacity: usize,

    pub relay: RelayMode,

    /// LISTEN/NOTIFY channel name for the postgres relay
    pub pg_channel: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            keep_alive_secs: 30,
            channel_capacity: 32,
            relay: RelayMode::Local,
            pg_channel: "boutique_notifications".to_string(),
        }
    }
}

/// When an order takes stock out of the counters
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStockPolicy {
    /// Stock is untouched at order time and leaves through the scan workflow
    #[default]
    Deferred,
    /// Every line is decremented atomically with the order insert
    DecrementOnCreate,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    pub order_stock_policy: OrderStockPolicy,

    /// Maximum receptions returned by the list endpoint
    pub reception_list_limit: i64,

    /// Movements returned when no limit is requested
    pub movement_default_limit: i64,

    /// Hard cap on requested movement limits
    pub movement_max_limit: i64,

    /// Maximum outbound lines returned by a tracking lookup
    pub sortie_lookup_limit: i64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            order_stock_policy: OrderStockPolicy::Deferred,
            reception_list_limit: 200,
            movement_default_limit: 1000,
            movement_max_limit: 10_000,
            sortie_lookup_limit: 50,
        }
    }
}

impl InventoryConfig {
    /// Reject limits the list endpoints cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.movement_max_limit < 1 {
            return Err(ConfigError::Message(
                "inventory.movement_max_limit must be at least 1".to_string(),
            ));
        }
        if !(1..=self.movement_max_limit).contains(&self.movement_default_limit) {
            return Err(ConfigError::Message(format!(
                "inventory.movement_default_limit must be between 1 and {}",
                self.movement_max_limit
            )));
        }
        if self.reception_list_limit < 1 || self.sortie_lookup_limit < 1 {
            return Err(ConfigError::Message(
                "inventory list limits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("BTQ_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("notifications.keep_alive_secs", 30)?
            .set_default("notifications.channel_capacity", 32)?
            .set_default("notifications.relay", "local")?
            .set_default("notifications.pg_channel", "boutique_notifications")?
            .set_default("inventory.order_stock_policy", "deferred")?
            .set_default("inventory.reception_list_limit", 200)?
            .set_default("inventory.movement_default_limit", 1000)?
            .set_default("inventory.movement_max_limit", 10_000)?
            .set_default("inventory.sortie_lookup_limit", 50)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (BTQ_ prefix)
            .add_source(
                Environment::with_prefix("BTQ")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.inventory.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    /// Development settings matching the built-in defaults of [`Config::load`]
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost/boutique".to_string(),
                max_connections: 10,
                min_connections: 2,
            },
            jwt: JwtConfig {
                secret: "development-secret-key".to_string(),
            },
            notifications: NotificationConfig::default(),
            inventory: InventoryConfig::default(),
        }
    }
}
