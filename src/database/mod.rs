//! Database module
//!
//! This module handles storage traits, backends and connections

pub mod connection;
pub mod memory;
pub mod repositories;
pub mod service;
pub mod store;

// Re-export commonly used database components
pub use connection::{create_pool, health_check, run_migrations, DatabasePool, PoolSettings};
pub use memory::MemoryStore;
pub use repositories::{UserRepository, GroupRepository, MealStatusRepository};
pub use service::DatabaseService;
pub use store::{UserStorage, GroupStorage, MealStatusStorage};
