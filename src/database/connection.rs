//! PostgreSQL pool setup, migrations and health checks

use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::utils::errors::Result;

pub type DatabasePool = Pool<Postgres>;

/// Pool tuning derived from the `[database]` section
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
}

impl From<&DatabaseConfig> for PoolSettings {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            acquire_timeout: Duration::from_secs(config.acquire_timeout_seconds),
            idle_timeout: Some(Duration::from_secs(10 * 60)),
            max_lifetime: Some(Duration::from_secs(30 * 60)),
        }
    }
}

/// Connect and verify the pool with a round trip
pub async fn create_pool(settings: &PoolSettings) -> Result<DatabasePool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .max_lifetime(settings.max_lifetime)
        .connect(&settings.url)
        .await?;

    health_check(&pool).await?;

    info!(max_connections = settings.max_connections, "PostgreSQL pool ready");
    Ok(pool)
}

/// Apply the embedded schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    let started = Instant::now();
    sqlx::migrate!("./migrations").run(pool).await?;

    info!(duration_ms = started.elapsed().as_millis() as u64, "Schema migrations applied");
    Ok(())
}

pub async fn health_check(pool: &DatabasePool) -> Result<()> {
    let started = Instant::now();
    sqlx::query("SELECT 1").execute(pool).await?;

    debug!(latency_ms = started.elapsed().as_millis() as u64, "Database ping");
    Ok(())
}
