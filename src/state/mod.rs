//! State management module
//!
//! Session state, role routing and the date-driven role views

pub mod selection;
pub mod session;
pub mod views;

// Re-export commonly used state components
pub use selection::{FetchOutcome, SelectionGuard, Ticket};
pub use session::{RoleRouter, RoleView, Session, SessionState};
pub use views::{CookView, EaterView};
