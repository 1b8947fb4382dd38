//! Meal status service implementation
//!
//! One record per `(user, date)`. Writes are last-writer-wins overwrites;
//! reading a pair nobody has written yields the all-false record.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::store::{MealStatusStorage, UserStorage};
use crate::models::{MealSelection, MealStatusRecord, Role, User};
use crate::services::roster::RosterCache;
use crate::utils::errors::{MealPlannerError, Result};
use crate::utils::logging::log_status_declared;

/// Cached rosters plus the user lookup that finds which group a write touches
#[derive(Clone)]
struct CacheInvalidation {
    cache: Arc<dyn RosterCache>,
    users: Arc<dyn UserStorage>,
}

#[derive(Clone)]
pub struct MealStatusStore {
    storage: Arc<dyn MealStatusStorage>,
    invalidation: Option<CacheInvalidation>,
}

impl MealStatusStore {
    pub fn new(storage: Arc<dyn MealStatusStorage>) -> Self {
        Self {
            storage,
            invalidation: None,
        }
    }

    /// Invalidate the writer's cached group roster whenever a status lands
    pub fn with_cache(mut self, cache: Arc<dyn RosterCache>, users: Arc<dyn UserStorage>) -> Self {
        self.invalidation = Some(CacheInvalidation { cache, users });
        self
    }

    /// Overwrite the user's record for `date`
    pub async fn set_status(&self, user_id: &str, date: NaiveDate, selection: MealSelection) -> Result<MealStatusRecord> {
        let record = self.write(user_id, date, selection).await?;

        if let Some(invalidation) = &self.invalidation {
            match invalidation.users.find_user(user_id).await {
                Ok(Some(user)) => {
                    if let Some(group_id) = user.group_id {
                        self.invalidate(group_id, date).await;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(uid = %user_id, error = %e, "Failed to resolve group for roster invalidation"),
            }
        }

        Ok(record)
    }

    async fn write(&self, user_id: &str, date: NaiveDate, selection: MealSelection) -> Result<MealStatusRecord> {
        if user_id.trim().is_empty() {
            return Err(MealPlannerError::Validation("User id cannot be empty".to_string()));
        }

        let record = MealStatusRecord::new(user_id, date, selection, Utc::now());
        self.storage.upsert_status(&record).await?;

        log_status_declared(user_id, date, selection.breakfast, selection.lunch, selection.dinner);
        Ok(record)
    }

    async fn invalidate(&self, group_id: Uuid, date: NaiveDate) {
        if let Some(invalidation) = &self.invalidation {
            if let Err(e) = invalidation.cache.invalidate_roster(group_id, date).await {
                warn!(group_id = %group_id, date = %date, error = %e, "Failed to invalidate cached roster");
            }
        }
    }

    /// The stored record, or an all-false one when nothing was declared
    pub async fn get_status(&self, user_id: &str, date: NaiveDate) -> Result<MealStatusRecord> {
        match self.storage.find_status(user_id, date).await? {
            Some(record) => Ok(record),
            None => {
                debug!(uid = %user_id, date = %date, "No meal status declared, using defaults");
                Ok(MealStatusRecord::not_declared(user_id, date))
            }
        }
    }

    /// Declare meal needs on behalf of `actor`. Only eaters with a group may
    /// declare, and only for themselves.
    pub async fn declare(&self, actor: &User, date: NaiveDate, selection: MealSelection) -> Result<MealStatusRecord> {
        let group_id = match (actor.role, actor.group_id) {
            (Role::Eater, Some(group_id)) => group_id,
            (Role::Eater, None) => {
                return Err(MealPlannerError::Authorization(
                    "Join a group before declaring meals".to_string(),
                ))
            }
            (Role::Cook, _) => {
                return Err(MealPlannerError::Authorization(
                    "Cooks do not declare meal needs".to_string(),
                ))
            }
        };

        let record = self.write(&actor.uid, date, selection).await?;
        self.invalidate(group_id, date).await;
        Ok(record)
    }
}
