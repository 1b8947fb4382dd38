//! Test helpers module
//!
//! Shared setup for the integration tests: in-memory service wiring, test
//! data builders, storage wrappers that inject delays or failures, and the
//! PostgreSQL test database.

#![allow(dead_code)]

pub mod database_helper;
pub mod stores;
pub mod test_context;
pub mod test_data;

pub use database_helper::*;
pub use stores::*;
pub use test_context::*;
pub use test_data::*;
