//! Application settings management
//!
//! Built-in defaults, overlaid by an optional `config.toml` and then by
//! `MEAL_PLANNER__SECTION__KEY` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub identity: IdentityConfig,
    pub groups: GroupsConfig,
    pub roster: RosterConfig,
    pub logging: LoggingConfig,
}

/// Which storage implementation backs the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub backend: StorageBackend,
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

/// Redis roster cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
    pub prefix: String,
    pub ttl_seconds: u64,
}

/// Which identity provider signs users in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    Rest,
    Local,
}

/// Identity provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    pub provider: IdentityBackend,
    pub api_url: String,
    pub api_key: String,
    pub timeout_seconds: u64,
}

/// Invite code generation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupsConfig {
    pub code_length: usize,
    pub code_alphabet: String,
    pub max_code_attempts: u32,
}

/// Cook-side roster aggregation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RosterConfig {
    pub max_concurrent_fetches: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: String,
    pub file_prefix: String,
    pub json: bool,
}

impl Settings {
    /// Load settings from an optional `config.*` file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(config::File::with_name("config").required(false))
    }

    /// Load settings from the file at `path` (format taken from its
    /// extension) and environment variables
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, config::ConfigError> {
        Self::load(config::File::from(path.as_ref()))
    }

    fn load<S>(file: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let defaults = config::Config::try_from(&Settings::default())?;

        let settings = config::Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(config::Environment::with_prefix("MEAL_PLANNER").separator("__"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::MealPlannerError> {
        super::validation::validate_settings(self)
    }
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            code_alphabet: "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string(),
            max_code_attempts: 8,
        }
    }
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self { max_concurrent_fetches: 8 }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                backend: StorageBackend::Postgres,
                url: "postgresql://localhost/meal_planner".to_string(),
                max_connections: 10,
                min_connections: 1,
                acquire_timeout_seconds: 30,
            },
            redis: RedisConfig {
                enabled: false,
                url: "redis://localhost:6379".to_string(),
                prefix: "meal_planner:".to_string(),
                ttl_seconds: 300,
            },
            identity: IdentityConfig {
                provider: IdentityBackend::Local,
                api_url: "https://identitytoolkit.googleapis.com/v1".to_string(),
                api_key: String::new(),
                timeout_seconds: 10,
            },
            groups: GroupsConfig::default(),
            roster: RosterConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: "logs".to_string(),
                file_prefix: "meal-planner.log".to_string(),
                json: false,
            },
        }
    }
}
