//! Data models module
//!
//! This module contains all data structures used throughout the crate

pub mod user;
pub mod group;
pub mod meal_status;

// Re-export commonly used models
pub use user::{User, NewUser, Role};
pub use group::Group;
pub use meal_status::{MealSelection, MealStatusRecord, RosterEntry};
