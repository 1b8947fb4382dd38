//! Redis integration service implementation
//!
//! Connection management, JSON value caching with TTLs and the roster cache
//! used by the aggregator. Keys are namespaced with the configured prefix.

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RedisConfig;
use crate::models::RosterEntry;
use crate::services::roster::RosterCache;
use crate::utils::errors::Result;
use crate::utils::helpers::format_date;

/// Redis service for caching
#[derive(Clone)]
pub struct RedisService {
    connection: ConnectionManager,
    config: RedisConfig,
}

impl RedisService {
    /// Connect to the configured Redis instance
    pub async fn new(config: RedisConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let connection = ConnectionManager::new(client).await?;
        info!(prefix = %config.prefix, "Connected to Redis");

        Ok(Self { connection, config })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.prefix, key)
    }

    /// Set a value with a TTL, falling back to the configured default
    pub async fn set<T>(&self, key: &str, value: &T, ttl_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize,
    {
        let mut conn = self.connection.clone();
        let serialized = serde_json::to_string(value)?;

        let full_key = self.full_key(key);
        let ttl = ttl_seconds.unwrap_or(self.config.ttl_seconds);

        let _: () = conn.set_ex(&full_key, serialized, ttl).await?;

        debug!(key = %full_key, ttl = ttl, "Value set in Redis");
        Ok(())
    }

    pub async fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.connection.clone();
        let full_key = self.full_key(key);

        let result: Option<String> = conn.get(&full_key).await?;

        match result {
            Some(data) => {
                let value = serde_json::from_str::<T>(&data)?;
                debug!(key = %full_key, "Value retrieved from Redis");
                Ok(Some(value))
            }
            None => {
                debug!(key = %full_key, "Key not found in Redis");
                Ok(None)
            }
        }
    }

    pub async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection.clone();
        let full_key = self.full_key(key);

        let deleted: i32 = conn.del(&full_key).await?;

        debug!(key = %full_key, deleted = deleted > 0, "Key deletion attempted");
        Ok(deleted > 0)
    }

    /// Delete all keys matching a pattern (relative to the prefix)
    pub async fn delete_pattern(&self, pattern: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        let full_pattern = self.full_key(pattern);

        let keys: Vec<String> = conn.keys(&full_pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let deleted: u64 = conn.del(&keys).await?;

        info!(pattern = %full_pattern, deleted = deleted, "Keys deleted by pattern");
        Ok(deleted)
    }

    /// Read a counter, treating a missing key as zero
    pub async fn counter(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        let value: Option<u64> = conn.get(self.full_key(key)).await?;
        Ok(value.unwrap_or(0))
    }

    /// Increment a counter, returning the new value. Counters carry no TTL.
    pub async fn increment(&self, key: &str) -> Result<u64> {
        let mut conn = self.connection.clone();
        let full_key = self.full_key(key);
        let value: u64 = conn.incr(&full_key, 1u64).await?;
        debug!(key = %full_key, value = value, "Counter incremented");
        Ok(value)
    }

    pub async fn health_check(&self) -> Result<bool> {
        let mut conn = self.connection.clone();
        let result: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        match result {
            Ok(response) => {
                debug!(response = %response, "Redis health check successful");
                Ok(response == "PONG")
            }
            Err(e) => {
                warn!(error = %e, "Redis health check failed");
                Ok(false)
            }
        }
    }
}

/// `roster:{group_id}:{YYYY-MM-DD}`
pub fn roster_key(group_id: Uuid, date: NaiveDate) -> String {
    format!("roster:{}:{}", group_id, format_date(date))
}

/// `roster_generation:{group_id}`, outside the `roster:{group_id}:*` pattern
/// so dropping a group's entries never resets its generation
pub fn roster_generation_key(group_id: Uuid) -> String {
    format!("roster_generation:{}", group_id)
}

#[derive(Debug, Serialize, Deserialize)]
struct StampedRoster {
    generation: u64,
    entries: Vec<RosterEntry>,
}

#[async_trait]
impl RosterCache for RedisService {
    async fn generation(&self, group_id: Uuid) -> Result<u64> {
        self.counter(&roster_generation_key(group_id)).await
    }

    async fn get_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<Option<Vec<RosterEntry>>> {
        let Some(stamped) = self.get::<StampedRoster>(&roster_key(group_id, date)).await? else {
            return Ok(None);
        };

        let current = self.generation(group_id).await?;
        if stamped.generation != current {
            debug!(group_id = %group_id, date = %date, stamped = stamped.generation, current = current, "Ignoring outdated roster");
            return Ok(None);
        }
        Ok(Some(stamped.entries))
    }

    async fn put_roster(&self, group_id: Uuid, date: NaiveDate, generation: u64, roster: &[RosterEntry]) -> Result<()> {
        let stamped = StampedRoster {
            generation,
            entries: roster.to_vec(),
        };
        self.set(&roster_key(group_id, date), &stamped, None).await
    }

    async fn invalidate_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<()> {
        self.increment(&roster_generation_key(group_id)).await?;
        self.delete(&roster_key(group_id, date)).await?;
        Ok(())
    }

    async fn invalidate_group(&self, group_id: Uuid) -> Result<()> {
        self.increment(&roster_generation_key(group_id)).await?;
        self.delete_pattern(&format!("roster:{}:*", group_id)).await?;
        Ok(())
    }
}
