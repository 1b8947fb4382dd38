//! Services module
//!
//! This module contains business logic services

pub mod group;
pub mod identity;
pub mod meal_status;
pub mod redis;
pub mod rest_identity;
pub mod roster;

// Re-export commonly used services
pub use group::{GroupRegistry, InviteCodeSource, RandomCodeSource};
pub use identity::{
    AuthState, AuthSubscription, IdentityContext, IdentityProvider, LocalIdentityProvider, SignUpRequest,
};
pub use meal_status::MealStatusStore;
pub use redis::RedisService;
pub use rest_identity::RestIdentityProvider;
pub use roster::{RosterAggregator, RosterCache};

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{IdentityBackend, IdentityConfig, Settings};
use crate::database::DatabaseService;
use crate::utils::errors::Result;

/// Build the identity provider selected in configuration
pub fn identity_provider(config: &IdentityConfig) -> Result<Arc<dyn IdentityProvider>> {
    match config.provider {
        IdentityBackend::Rest => {
            info!(api_url = %config.api_url, "Using REST identity provider");
            Ok(Arc::new(RestIdentityProvider::new(config)?))
        }
        IdentityBackend::Local => {
            info!("Using local identity provider");
            Ok(Arc::new(LocalIdentityProvider::new()))
        }
    }
}

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub identity: IdentityContext,
    pub groups: GroupRegistry,
    pub meal_status: MealStatusStore,
    pub roster: RosterAggregator,
    pub database: DatabaseService,
    pub redis: Option<RedisService>,
}

impl ServiceFactory {
    /// Wire every service over the given storage, provider and optional cache
    pub fn new(
        settings: &Settings,
        database: DatabaseService,
        provider: Arc<dyn IdentityProvider>,
        redis: Option<RedisService>,
    ) -> Self {
        let identity = IdentityContext::new(provider, database.users.clone());
        let mut groups = GroupRegistry::new(database.users.clone(), database.groups.clone(), settings.groups.clone());
        let mut meal_status = MealStatusStore::new(database.statuses.clone());

        if let Some(cache) = &redis {
            let cache: Arc<dyn RosterCache> = Arc::new(cache.clone());
            groups = groups.with_cache(cache.clone());
            meal_status = meal_status.with_cache(cache, database.users.clone());
        }

        let mut roster = RosterAggregator::new(
            database.users.clone(),
            database.groups.clone(),
            meal_status.clone(),
            settings.roster.max_concurrent_fetches,
        );
        if let Some(cache) = &redis {
            roster = roster.with_cache(Arc::new(cache.clone()));
        }

        Self {
            identity,
            groups,
            meal_status,
            roster,
            database,
            redis,
        }
    }

    /// Build the identity provider and, when enabled, the Redis cache from
    /// settings. An unreachable Redis disables caching rather than failing.
    pub async fn from_settings(settings: &Settings, database: DatabaseService) -> Result<Self> {
        let provider = identity_provider(&settings.identity)?;

        let redis = if settings.redis.enabled {
            match RedisService::new(settings.redis.clone()).await {
                Ok(service) => Some(service),
                Err(e) => {
                    warn!(error = %e, "Redis unavailable, roster caching disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(settings, database, provider, redis))
    }

    /// Health check for all services
    pub async fn health_check(&self) -> ServiceHealthStatus {
        let database_healthy = self.database.health_check().await.is_ok();
        let redis_healthy = match &self.redis {
            Some(redis) => redis.health_check().await.unwrap_or(false),
            None => true,
        };

        ServiceHealthStatus {
            database_healthy,
            redis_enabled: self.redis.is_some(),
            redis_healthy,
        }
    }
}

/// Health status for all services
#[derive(Debug, Clone)]
pub struct ServiceHealthStatus {
    pub database_healthy: bool,
    pub redis_enabled: bool,
    pub redis_healthy: bool,
}

impl ServiceHealthStatus {
    /// The cache is optional, so only storage decides overall health
    pub fn is_healthy(&self) -> bool {
        self.database_healthy
    }

    /// Get list of unhealthy services
    pub fn get_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.database_healthy {
            issues.push("Database connection failed".to_string());
        }
        if self.redis_enabled && !self.redis_healthy {
            issues.push("Redis connection failed".to_string());
        }

        issues
    }
}
