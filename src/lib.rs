//! Meal Planner
//!
//! Shared meal planning for small households and clubs. Eaters declare which
//! meals they need each day; cooks see the per-date roster of their group.
//! This library provides the storage layer, group onboarding by invite code,
//! meal status tracking, roster aggregation and role-based session routing.

pub mod config;
pub mod database;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{MealPlannerError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;
pub use state::{Session, SessionState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
