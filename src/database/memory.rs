//! In-process storage backend
//!
//! A single lock guards every collection, so the two-record membership
//! writes are atomic just like the PostgreSQL transactions.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{GroupStorage, MealStatusStorage, UserStorage};
use crate::models::{Group, MealStatusRecord, NewUser, Role, User};
use crate::utils::errors::{MealPlannerError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    users: HashMap<String, User>,
    groups: HashMap<Uuid, Group>,
    codes: HashMap<String, Uuid>,
    statuses: HashMap<(String, NaiveDate), MealStatusRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored meal status records
    pub async fn status_count(&self) -> usize {
        self.state.read().await.statuses.len()
    }
}

/// The user may join `group_id` if they have no group yet or already belong to it
fn check_joinable(user: &User, group_id: Uuid) -> Result<()> {
    match user.group_id {
        Some(current) if current != group_id => Err(MealPlannerError::AlreadyInGroup {
            uid: user.uid.clone(),
            group_id: current,
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl UserStorage for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut state = self.state.write().await;

        if state.users.contains_key(&user.uid) {
            return Err(MealPlannerError::Validation(format!("User {} already exists", user.uid)));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(MealPlannerError::Validation(format!("Email {} is already registered", user.email)));
        }

        let record = User {
            uid: user.uid,
            email: user.email,
            role: user.role,
            group_id: None,
            display_name: user.display_name,
            created_at: Utc::now(),
        };
        state.users.insert(record.uid.clone(), record.clone());
        Ok(record)
    }

    async fn find_user(&self, uid: &str) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(uid).cloned())
    }

    async fn find_members(&self, group_id: Uuid, role: Role) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut members: Vec<User> = state
            .users
            .values()
            .filter(|u| u.group_id == Some(group_id) && u.role == role)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.uid.cmp(&b.uid)));
        Ok(members)
    }
}

#[async_trait]
impl GroupStorage for MemoryStore {
    async fn code_in_use(&self, code: &str) -> Result<bool> {
        Ok(self.state.read().await.codes.contains_key(code))
    }

    async fn create_group(&self, group: &Group, creator_uid: &str) -> Result<Group> {
        let mut state = self.state.write().await;

        if state.codes.contains_key(&group.code) {
            return Err(MealPlannerError::CodeConflict { code: group.code.clone() });
        }
        let creator = state
            .users
            .get_mut(creator_uid)
            .ok_or_else(|| MealPlannerError::UserNotFound { uid: creator_uid.to_string() })?;
        if let Some(current) = creator.group_id {
            return Err(MealPlannerError::AlreadyInGroup { uid: creator_uid.to_string(), group_id: current });
        }

        creator.group_id = Some(group.id);
        state.codes.insert(group.code.clone(), group.id);
        state.groups.insert(group.id, group.clone());
        Ok(group.clone())
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(&id).cloned())
    }

    async fn find_group_by_code(&self, code: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.codes.get(code).and_then(|id| state.groups.get(id)).cloned())
    }

    async fn find_group_by_member(&self, uid: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.role_of(uid).is_some()).cloned())
    }

    async fn add_member(&self, group_id: Uuid, uid: &str, role: Role) -> Result<Group> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;

        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or(MealPlannerError::GroupMissing { group_id })?;
        let user = state
            .users
            .get_mut(uid)
            .ok_or_else(|| MealPlannerError::UserNotFound { uid: uid.to_string() })?;

        check_joinable(user, group_id)?;
        if let Some(existing) = group.role_of(uid) {
            if existing != role {
                return Err(MealPlannerError::Validation(format!(
                    "{} is already a {} in this group",
                    uid, existing
                )));
            }
        }

        group.add_member(uid, role);
        user.group_id = Some(group_id);
        Ok(group.clone())
    }
}

#[async_trait]
impl MealStatusStorage for MemoryStore {
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .statuses
            .insert((record.user_id.clone(), record.date), record.clone());
        Ok(())
    }

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>> {
        let state = self.state.read().await;
        Ok(state.statuses.get(&(uid.to_string(), date)).cloned())
    }
}
