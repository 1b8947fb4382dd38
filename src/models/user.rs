//! User model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Membership kind within a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Reads the aggregated roster
    Cook,
    /// Declares their own meal needs
    Eater,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cook => "cook",
            Role::Eater => "eater",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub uid: String,
    pub email: String,
    pub role: Role,
    /// Set once when the user creates or joins a group
    pub group_id: Option<Uuid>,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Name shown in rosters, falling back to the email address
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub uid: String,
    pub email: String,
    pub role: Role,
    pub display_name: Option<String>,
}
