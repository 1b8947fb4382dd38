//! Group model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::Role;

/// A household sharing meals.
///
/// `cook_ids` and `eater_ids` behave as sets that keep join order, and a uid
/// is listed under at most one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub cook_ids: Vec<String>,
    pub eater_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Build a group whose only member is its creator
    pub fn new(name: String, code: String, creator_uid: &str, creator_role: Role) -> Self {
        let mut group = Self {
            id: Uuid::new_v4(),
            name,
            code,
            cook_ids: Vec::new(),
            eater_ids: Vec::new(),
            created_at: Utc::now(),
        };
        group.add_member(creator_uid, creator_role);
        group
    }

    pub fn members(&self, role: Role) -> &[String] {
        match role {
            Role::Cook => &self.cook_ids,
            Role::Eater => &self.eater_ids,
        }
    }

    /// Role under which `uid` is listed, if any
    pub fn role_of(&self, uid: &str) -> Option<Role> {
        if self.cook_ids.iter().any(|id| id == uid) {
            Some(Role::Cook)
        } else if self.eater_ids.iter().any(|id| id == uid) {
            Some(Role::Eater)
        } else {
            None
        }
    }

    pub fn is_member(&self, uid: &str, role: Role) -> bool {
        self.members(role).iter().any(|id| id == uid)
    }

    /// Append `uid` to the role's list. Returns false when already present.
    pub fn add_member(&mut self, uid: &str, role: Role) -> bool {
        if self.is_member(uid, role) {
            return false;
        }
        match role {
            Role::Cook => self.cook_ids.push(uid.to_string()),
            Role::Eater => self.eater_ids.push(uid.to_string()),
        }
        true
    }
}
