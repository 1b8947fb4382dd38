//! Configuration validation module
//!
//! Checks run once at startup. Sections that are switched off (memory
//! storage, disabled Redis, local identity) skip their connection checks.

use std::collections::HashSet;

use super::settings::{IdentityBackend, StorageBackend};
use super::Settings;
use crate::utils::errors::{MealPlannerError, Result};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_database_config(&settings.database)?;
    validate_redis_config(&settings.redis)?;
    validate_identity_config(&settings.identity)?;
    validate_groups_config(&settings.groups)?;
    validate_roster_config(&settings.roster)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.backend == StorageBackend::Memory {
        return Ok(());
    }

    if config.url.is_empty() {
        return Err(MealPlannerError::Config(
            "Database URL is required".to_string()
        ));
    }

    if config.max_connections == 0 {
        return Err(MealPlannerError::Config(
            "Max connections must be greater than 0".to_string()
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(MealPlannerError::Config(
            "Min connections cannot be greater than max connections".to_string()
        ));
    }

    Ok(())
}

/// Validate Redis configuration
fn validate_redis_config(config: &super::RedisConfig) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.url.is_empty() {
        return Err(MealPlannerError::Config(
            "Redis URL is required when the roster cache is enabled".to_string()
        ));
    }

    if config.ttl_seconds == 0 {
        return Err(MealPlannerError::Config(
            "Redis TTL must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate identity provider configuration
fn validate_identity_config(config: &super::IdentityConfig) -> Result<()> {
    if config.provider == IdentityBackend::Local {
        return Ok(());
    }

    url::Url::parse(&config.api_url).map_err(|e| {
        MealPlannerError::Config(format!("Invalid identity API URL '{}': {}", config.api_url, e))
    })?;

    if config.api_key.is_empty() {
        return Err(MealPlannerError::Config(
            "Identity API key is required".to_string()
        ));
    }

    if config.timeout_seconds == 0 {
        return Err(MealPlannerError::Config(
            "Identity timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate invite code settings
fn validate_groups_config(config: &super::GroupsConfig) -> Result<()> {
    if config.code_length < 4 {
        return Err(MealPlannerError::Config(
            "Invite code length must be at least 4".to_string()
        ));
    }

    if config.code_alphabet.is_empty() {
        return Err(MealPlannerError::Config(
            "Invite code alphabet is required".to_string()
        ));
    }

    if !config.code_alphabet.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(MealPlannerError::Config(
            "Invite code alphabet may only contain uppercase letters and digits".to_string()
        ));
    }

    let unique: HashSet<char> = config.code_alphabet.chars().collect();
    if unique.len() != config.code_alphabet.len() {
        return Err(MealPlannerError::Config(
            "Invite code alphabet contains duplicate characters".to_string()
        ));
    }

    if config.max_code_attempts == 0 {
        return Err(MealPlannerError::Config(
            "At least one invite code attempt must be allowed".to_string()
        ));
    }

    Ok(())
}

fn validate_roster_config(config: &super::RosterConfig) -> Result<()> {
    if config.max_concurrent_fetches == 0 {
        return Err(MealPlannerError::Config(
            "Roster fan-out must allow at least one concurrent fetch".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(MealPlannerError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(MealPlannerError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    if config.directory.is_empty() {
        return Err(MealPlannerError::Config(
            "Log directory is required".to_string()
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_rejects_lowercase_alphabet() {
        let mut settings = Settings::default();
        settings.groups.code_alphabet = "abc123".to_string();
        assert_matches!(validate_settings(&settings), Err(MealPlannerError::Config(_)));
    }

    #[test]
    fn test_rejects_duplicate_alphabet_characters() {
        let mut settings = Settings::default();
        settings.groups.code_alphabet = "AABC".to_string();
        assert_matches!(validate_settings(&settings), Err(MealPlannerError::Config(_)));
    }

    #[test]
    fn test_rest_identity_requires_api_key() {
        let mut settings = Settings::default();
        settings.identity.provider = IdentityBackend::Rest;
        assert_matches!(validate_settings(&settings), Err(MealPlannerError::Config(_)));

        settings.identity.api_key = "key".to_string();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_memory_backend_skips_database_checks() {
        let mut settings = Settings::default();
        settings.database.backend = StorageBackend::Memory;
        settings.database.url = String::new();
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        assert_matches!(validate_settings(&settings), Err(MealPlannerError::Config(_)));
    }
}
