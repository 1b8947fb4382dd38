//! Test context for unified test setup
//!
//! Every context owns one in-memory store. Each `device()` is a separate
//! client: its own identity provider (and so its own signed-in user) over
//! the shared storage.

use std::sync::Arc;

use meal_planner::config::{Settings, StorageBackend};
use meal_planner::database::store::{GroupStorage, MealStatusStorage, UserStorage};
use meal_planner::database::{DatabaseService, MemoryStore};
use meal_planner::models::{NewUser, Role, User};
use meal_planner::services::{LocalIdentityProvider, ServiceFactory};
use meal_planner::state::Session;

pub struct TestContext {
    pub store: MemoryStore,
    pub settings: Settings,
    pub database: DatabaseService,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_database(|store| DatabaseService::in_memory(store.clone()))
    }

    /// Memory-backed context whose status reads go through `statuses`
    pub fn with_statuses<S>(build: impl FnOnce(MemoryStore) -> S) -> Self
    where
        S: MealStatusStorage + 'static,
    {
        Self::with_database(|store| {
            let mut database = DatabaseService::in_memory(store.clone());
            database.statuses = Arc::new(build(store.clone()));
            database
        })
    }

    /// Memory-backed context whose group writes go through `groups`
    pub fn with_groups<G>(build: impl FnOnce(MemoryStore) -> G) -> Self
    where
        G: GroupStorage + 'static,
    {
        Self::with_database(|store| {
            let mut database = DatabaseService::in_memory(store.clone());
            database.groups = Arc::new(build(store.clone()));
            database
        })
    }

    fn with_database(build: impl FnOnce(&MemoryStore) -> DatabaseService) -> Self {
        let _ = tracing_subscriber::fmt::try_init();

        let mut settings = Settings::default();
        settings.database.backend = StorageBackend::Memory;
        settings.redis.enabled = false;

        let store = MemoryStore::new();
        let database = build(&store);

        Self { store, settings, database }
    }

    /// A fresh client with its own authentication state
    pub fn device(&self) -> ServiceFactory {
        ServiceFactory::new(
            &self.settings,
            self.database.clone(),
            Arc::new(LocalIdentityProvider::new()),
            None,
        )
    }

    /// A fresh client and a session on it
    pub fn session(&self) -> (ServiceFactory, Session) {
        let services = self.device();
        let session = Session::new(&services);
        (services, session)
    }

    /// Write a user record directly, bypassing the identity provider
    pub async fn add_user(&self, name: &str, role: Role) -> User {
        self.store
            .insert_user(NewUser {
                uid: format!("uid-{}", name.to_lowercase()),
                email: format!("{}@example.com", name.to_lowercase()),
                role,
                display_name: Some(name.to_string()),
            })
            .await
            .expect("Failed to insert test user")
    }

    /// Re-read a user record
    pub async fn reload(&self, user: &User) -> User {
        self.store
            .find_user(&user.uid)
            .await
            .expect("Failed to read user")
            .expect("User disappeared")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
