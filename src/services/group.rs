//! Group registry service implementation
//!
//! Creates groups with unique invite codes and admits users by code.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GroupsConfig;
use crate::database::store::{GroupStorage, UserStorage};
use crate::models::{Group, Role, User};
use crate::services::roster::RosterCache;
use crate::utils::errors::{MealPlannerError, Result};
use crate::utils::helpers::{generate_invite_code, is_plausible_invite_code, normalize_invite_code, normalize_whitespace};
use crate::utils::logging::log_group_event;

/// Longest accepted group display name, in characters
pub const MAX_GROUP_NAME_LENGTH: usize = 64;

/// Produces candidate invite codes
pub trait InviteCodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

/// Uniformly random codes over the configured alphabet
#[derive(Debug, Clone)]
pub struct RandomCodeSource {
    alphabet: Vec<u8>,
    length: usize,
}

impl RandomCodeSource {
    pub fn new(config: &GroupsConfig) -> Self {
        Self {
            alphabet: config.code_alphabet.as_bytes().to_vec(),
            length: config.code_length,
        }
    }
}

impl InviteCodeSource for RandomCodeSource {
    fn next_code(&self) -> String {
        generate_invite_code(&mut rand::thread_rng(), &self.alphabet, self.length)
    }
}

#[derive(Clone)]
pub struct GroupRegistry {
    users: Arc<dyn UserStorage>,
    groups: Arc<dyn GroupStorage>,
    codes: Arc<dyn InviteCodeSource>,
    config: GroupsConfig,
    cache: Option<Arc<dyn RosterCache>>,
}

impl GroupRegistry {
    pub fn new(users: Arc<dyn UserStorage>, groups: Arc<dyn GroupStorage>, config: GroupsConfig) -> Self {
        let codes = Arc::new(RandomCodeSource::new(&config));
        Self {
            users,
            groups,
            codes,
            config,
            cache: None,
        }
    }

    pub fn with_code_source(mut self, codes: Arc<dyn InviteCodeSource>) -> Self {
        self.codes = codes;
        self
    }

    /// Invalidate cached rosters when an eater joins
    pub fn with_cache(mut self, cache: Arc<dyn RosterCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Create a group with a fresh invite code and make the creator its
    /// first member under `creator_role`
    pub async fn create_group(&self, display_name: &str, creator_uid: &str, creator_role: Role) -> Result<Group> {
        let name = validate_group_name(display_name)?;
        let creator = self.load_user(creator_uid).await?;
        check_role(&creator, creator_role)?;

        if let Some(group_id) = creator.group_id {
            return Err(MealPlannerError::AlreadyInGroup { uid: creator.uid, group_id });
        }

        for attempt in 1..=self.config.max_code_attempts {
            let code = self.codes.next_code();

            if self.groups.code_in_use(&code).await? {
                warn!(attempt, code = %code, "Invite code already in use, regenerating");
                continue;
            }

            let group = Group::new(name.clone(), code, creator_uid, creator_role);
            match self.groups.create_group(&group, creator_uid).await {
                Ok(created) => {
                    log_group_event(created.id, "created", Some(creator_uid), Some(&created.code));
                    return Ok(created);
                }
                // another writer took the code between the check and the insert
                Err(MealPlannerError::CodeConflict { code }) => {
                    warn!(attempt, code = %code, "Invite code claimed concurrently, regenerating");
                }
                Err(e) => return Err(e),
            }
        }

        error!(
            attempts = self.config.max_code_attempts,
            "Could not find a free invite code"
        );
        Err(MealPlannerError::CodeGenerationExhausted {
            attempts: self.config.max_code_attempts,
        })
    }

    /// Add the user to the group identified by `code` under `role`.
    /// Joining a group the user already belongs to changes nothing.
    pub async fn join_group(&self, code: &str, uid: &str, role: Role) -> Result<Group> {
        let code = normalize_invite_code(code);
        if !is_plausible_invite_code(&code) {
            debug!(code = %code, "Malformed invite code");
            return Err(MealPlannerError::GroupNotFound { code });
        }

        let group = self
            .groups
            .find_group_by_code(&code)
            .await?
            .ok_or_else(|| MealPlannerError::GroupNotFound { code: code.clone() })?;

        let user = self.load_user(uid).await?;
        check_role(&user, role)?;

        if user.group_id == Some(group.id) && group.is_member(uid, role) {
            debug!(uid = %uid, group_id = %group.id, "Already a member, nothing to do");
            return Ok(group);
        }

        let updated = self.groups.add_member(group.id, uid, role).await?;
        log_group_event(updated.id, "joined", Some(uid), Some(role.as_str()));

        if role == Role::Eater {
            self.invalidate_rosters(updated.id).await;
        }

        Ok(updated)
    }

    /// The group the user belongs to, if any
    pub async fn group_for(&self, user: &User) -> Result<Option<Group>> {
        match user.group_id {
            Some(group_id) => self.groups.find_group(group_id).await,
            None => Ok(None),
        }
    }

    async fn load_user(&self, uid: &str) -> Result<User> {
        self.users
            .find_user(uid)
            .await?
            .ok_or_else(|| MealPlannerError::UserNotFound { uid: uid.to_string() })
    }

    async fn invalidate_rosters(&self, group_id: Uuid) {
        if let Some(cache) = &self.cache {
            match cache.invalidate_group(group_id).await {
                Ok(()) => info!(group_id = %group_id, "Cached rosters invalidated"),
                Err(e) => warn!(group_id = %group_id, error = %e, "Failed to invalidate cached rosters"),
            }
        }
    }
}

fn validate_group_name(display_name: &str) -> Result<String> {
    let name = normalize_whitespace(display_name);
    if name.is_empty() {
        return Err(MealPlannerError::Validation("Group name cannot be empty".to_string()));
    }
    if name.chars().count() > MAX_GROUP_NAME_LENGTH {
        return Err(MealPlannerError::Validation(format!(
            "Group name must be at most {} characters",
            MAX_GROUP_NAME_LENGTH
        )));
    }
    Ok(name)
}

fn check_role(user: &User, role: Role) -> Result<()> {
    if user.role != role {
        return Err(MealPlannerError::Validation(format!(
            "{} is registered as {}, not {}",
            user.uid, user.role, role
        )));
    }
    Ok(())
}
