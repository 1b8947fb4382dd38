//! Database repositories module
//!
//! PostgreSQL implementations of the storage traits

pub mod user;
pub mod group;
pub mod meal_status;

// Re-export repositories
pub use user::UserRepository;
pub use group::GroupRepository;
pub use meal_status::MealStatusRepository;
