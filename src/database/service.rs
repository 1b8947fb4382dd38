//! Database service layer
//!
//! Bundles the storage trait objects the services are built from, backed
//! either by PostgreSQL or by the in-process store.

use std::sync::Arc;

use crate::config::{Settings, StorageBackend};
use crate::database::connection::{self, DatabasePool, PoolSettings};
use crate::database::memory::MemoryStore;
use crate::database::store::{GroupStorage, MealStatusStorage, UserStorage};
use crate::database::{GroupRepository, MealStatusRepository, UserRepository};
use crate::utils::errors::Result;

#[derive(Clone)]
pub struct DatabaseService {
    pub users: Arc<dyn UserStorage>,
    pub groups: Arc<dyn GroupStorage>,
    pub statuses: Arc<dyn MealStatusStorage>,
    pool: Option<DatabasePool>,
}

impl DatabaseService {
    /// PostgreSQL-backed storage
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: Arc::new(UserRepository::new(pool.clone())),
            groups: Arc::new(GroupRepository::new(pool.clone())),
            statuses: Arc::new(MealStatusRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// In-process storage sharing one `MemoryStore`
    pub fn in_memory(store: MemoryStore) -> Self {
        Self {
            users: Arc::new(store.clone()),
            groups: Arc::new(store.clone()),
            statuses: Arc::new(store),
            pool: None,
        }
    }

    /// Build the backend selected in settings, running migrations for PostgreSQL
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.database.backend {
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on shutdown");
                Ok(Self::in_memory(MemoryStore::new()))
            }
            StorageBackend::Postgres => {
                let pool = connection::create_pool(&PoolSettings::from(&settings.database)).await?;
                connection::run_migrations(&pool).await?;
                Ok(Self::new(pool))
            }
        }
    }

    pub fn pool(&self) -> Option<&DatabasePool> {
        self.pool.as_ref()
    }

    /// Check the backing database, if any
    pub async fn health_check(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => connection::health_check(pool).await,
            None => Ok(()),
        }
    }
}
