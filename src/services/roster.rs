//! Roster aggregation service
//!
//! Builds the cook's per-date list of eaters and their meal needs. Status
//! reads fan out concurrently (bounded) but the result keeps roster order,
//! and any failed read fails the whole aggregation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::database::store::{GroupStorage, UserStorage};
use crate::models::{Role, RosterEntry, User};
use crate::services::meal_status::MealStatusStore;
use crate::utils::errors::{MealPlannerError, Result};
use crate::utils::logging::log_aggregation;

/// Best-effort cache for aggregated rosters
///
/// Each group has a generation that every invalidation moves forward.
/// Entries are stamped with the generation read before their statuses were
/// fetched, and an entry whose stamp is behind the group's generation is
/// never served.
#[async_trait]
pub trait RosterCache: Send + Sync {
    /// Current generation of the group's cached rosters
    async fn generation(&self, group_id: Uuid) -> Result<u64>;

    /// The cached roster, if one is stored under the current generation
    async fn get_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<Option<Vec<RosterEntry>>>;

    async fn put_roster(&self, group_id: Uuid, date: NaiveDate, generation: u64, roster: &[RosterEntry]) -> Result<()>;

    /// Bump the group's generation and drop the entry for `date`
    async fn invalidate_roster(&self, group_id: Uuid, date: NaiveDate) -> Result<()>;

    /// Bump the group's generation and drop every cached date
    async fn invalidate_group(&self, group_id: Uuid) -> Result<()>;
}

#[derive(Clone)]
pub struct RosterAggregator {
    users: Arc<dyn UserStorage>,
    groups: Arc<dyn GroupStorage>,
    statuses: MealStatusStore,
    max_concurrent_fetches: usize,
    cache: Option<Arc<dyn RosterCache>>,
}

impl RosterAggregator {
    pub fn new(
        users: Arc<dyn UserStorage>,
        groups: Arc<dyn GroupStorage>,
        statuses: MealStatusStore,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            users,
            groups,
            statuses,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn RosterCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// One entry per eater of the group with their status for `date`
    pub async fn aggregate(&self, group_id: Uuid, date: NaiveDate) -> Result<Vec<RosterEntry>> {
        let mut generation = None;
        if let Some(cache) = &self.cache {
            match cache.get_roster(group_id, date).await {
                Ok(Some(roster)) => {
                    debug!(group_id = %group_id, date = %date, "Roster served from cache");
                    return Ok(roster);
                }
                Ok(None) => {}
                Err(e) => warn!(group_id = %group_id, error = %e, "Roster cache read failed"),
            }
            // Read before any status so a write landing mid-fetch retires the entry
            match cache.generation(group_id).await {
                Ok(current) => generation = Some(current),
                Err(e) => warn!(group_id = %group_id, error = %e, "Roster cache generation read failed"),
            }
        }

        let started = Instant::now();
        let result = self.collect(group_id, date).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(roster) => {
                log_aggregation(group_id, date, roster.len(), duration_ms, true);
                if let (Some(cache), Some(generation)) = (&self.cache, generation) {
                    if let Err(e) = cache.put_roster(group_id, date, generation, &roster).await {
                        warn!(group_id = %group_id, error = %e, "Roster cache write failed");
                    }
                }
                Ok(roster)
            }
            Err(e @ MealPlannerError::GroupMissing { .. }) => Err(e),
            Err(source) => {
                log_aggregation(group_id, date, 0, duration_ms, false);
                Err(MealPlannerError::AggregationFailed {
                    group_id,
                    date,
                    source: Box::new(source),
                })
            }
        }
    }

    async fn collect(&self, group_id: Uuid, date: NaiveDate) -> Result<Vec<RosterEntry>> {
        let group = self
            .groups
            .find_group(group_id)
            .await?
            .ok_or(MealPlannerError::GroupMissing { group_id })?;

        let mut eaters = self.users.find_members(group_id, Role::Eater).await?;
        order_by_membership(&mut eaters, &group.eater_ids);

        let statuses = &self.statuses;
        stream::iter(eaters)
            .map(|user| async move {
                let status = statuses.get_status(&user.uid, date).await?;
                Ok::<_, MealPlannerError>(RosterEntry { user, status })
            })
            .buffered(self.max_concurrent_fetches)
            .try_collect()
            .await
    }
}

/// Eaters in the order they joined; anyone missing from the list goes last,
/// ordered by display name then uid
fn order_by_membership(users: &mut [User], eater_ids: &[String]) {
    let positions: HashMap<&str, usize> = eater_ids
        .iter()
        .enumerate()
        .map(|(idx, uid)| (uid.as_str(), idx))
        .collect();

    users.sort_by(|a, b| {
        let pa = positions.get(a.uid.as_str()).copied().unwrap_or(usize::MAX);
        let pb = positions.get(b.uid.as_str()).copied().unwrap_or(usize::MAX);
        pa.cmp(&pb)
            .then_with(|| a.label().cmp(b.label()))
            .then_with(|| a.uid.cmp(&b.uid))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn eater(uid: &str, name: &str) -> User {
        User {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
            role: Role::Eater,
            group_id: None,
            display_name: Some(name.to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_follows_join_order() {
        let mut users = vec![eater("c", "Carol"), eater("x", "Xavier"), eater("b", "Bob"), eater("a", "Anna")];
        let joined = vec!["b".to_string(), "c".to_string()];

        order_by_membership(&mut users, &joined);

        let uids: Vec<&str> = users.iter().map(|u| u.uid.as_str()).collect();
        assert_eq!(uids, vec!["b", "c", "a", "x"]);
    }
}
