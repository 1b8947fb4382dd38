//! Session state and role routing
//!
//! A session is in exactly one of three states: nobody signed in, signed in
//! without a group, or signed in with a group and a role view. The router
//! derives the state from the signed-in user; the session drives the
//! transitions.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::database::store::GroupStorage;
use crate::models::{Group, Role, User};
use crate::services::{
    AuthSubscription, GroupRegistry, IdentityContext, MealStatusStore, RosterAggregator, ServiceFactory,
    SignUpRequest,
};
use crate::state::views::{CookView, EaterView};
use crate::utils::errors::{MealPlannerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleView {
    Cook,
    Eater,
}

impl From<Role> for RoleView {
    fn from(role: Role) -> Self {
        match role {
            Role::Cook => RoleView::Cook,
            Role::Eater => RoleView::Eater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Unauthenticated,
    /// Signed in but not yet part of a group
    NeedsGroup { user: User },
    InGroup { user: User, group: Group, view: RoleView },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::NeedsGroup { .. } => "needs_group",
            SessionState::InGroup { .. } => "in_group",
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Unauthenticated => None,
            SessionState::NeedsGroup { user } | SessionState::InGroup { user, .. } => Some(user),
        }
    }

    pub fn group(&self) -> Option<&Group> {
        match self {
            SessionState::InGroup { group, .. } => Some(group),
            _ => None,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps a user to the session state they belong in
#[derive(Clone)]
pub struct RoleRouter {
    identity: IdentityContext,
    groups: Arc<dyn GroupStorage>,
}

impl RoleRouter {
    pub fn new(identity: IdentityContext, groups: Arc<dyn GroupStorage>) -> Self {
        Self { identity, groups }
    }

    /// `None` is unauthenticated, a user without a group needs one, and a
    /// user with a group gets the view of their registered role
    pub async fn route(&self, user: Option<User>) -> Result<SessionState> {
        let Some(user) = user else {
            return Ok(SessionState::Unauthenticated);
        };

        let Some(group_id) = user.group_id else {
            return Ok(SessionState::NeedsGroup { user });
        };

        let group = self
            .groups
            .find_group(group_id)
            .await?
            .ok_or(MealPlannerError::GroupMissing { group_id })?;
        let view = RoleView::from(user.role);

        Ok(SessionState::InGroup { user, group, view })
    }

    /// Route whoever is signed in right now
    pub async fn resolve(&self) -> Result<SessionState> {
        let user = self.identity.current_user().await?;
        self.route(user).await
    }
}

/// One user's walk through sign-in, group onboarding and the role views
pub struct Session {
    identity: IdentityContext,
    groups: GroupRegistry,
    meal_status: MealStatusStore,
    roster: RosterAggregator,
    router: RoleRouter,
    state: SessionState,
}

impl Session {
    pub fn new(services: &ServiceFactory) -> Self {
        Self {
            identity: services.identity.clone(),
            groups: services.groups.clone(),
            meal_status: services.meal_status.clone(),
            roster: services.roster.clone(),
            router: RoleRouter::new(services.identity.clone(), services.database.groups.clone()),
            state: SessionState::Unauthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn router(&self) -> &RoleRouter {
        &self.router
    }

    fn enter(&mut self, next: SessionState) -> &SessionState {
        debug!(from = self.state.name(), to = next.name(), "Session transition");
        self.state = next;
        &self.state
    }

    pub async fn sign_up(&mut self, request: SignUpRequest) -> Result<&SessionState> {
        let user = self.identity.sign_up(request).await?;
        let next = self.router.route(Some(user)).await?;
        Ok(self.enter(next))
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&SessionState> {
        let user = self.identity.sign_in(email, password).await?;
        let next = self.router.route(Some(user)).await?;
        Ok(self.enter(next))
    }

    pub async fn sign_out(&mut self) -> Result<&SessionState> {
        self.identity.sign_out().await?;
        Ok(self.enter(SessionState::Unauthenticated))
    }

    /// Re-derive the state from whoever is signed in now
    pub async fn refresh(&mut self) -> Result<&SessionState> {
        let next = self.router.resolve().await?;
        Ok(self.enter(next))
    }

    /// Wait for the next authentication change and follow it. Returns
    /// `false` once the subscription has ended.
    pub async fn follow(&mut self, subscription: &mut AuthSubscription) -> Result<bool> {
        match subscription.changed().await {
            Some(_) => {
                self.refresh().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Create a group as the signed-in user and move into it
    pub async fn create_group(&mut self, name: &str) -> Result<Group> {
        let user = self.onboarding_user("create_group")?;
        let group = self.groups.create_group(name, &user.uid, user.role).await?;
        self.enter_group(user, group.clone());
        Ok(group)
    }

    /// Join a group by invite code under the signed-in user's role
    pub async fn join_group(&mut self, code: &str) -> Result<Group> {
        let user = self.onboarding_user("join_group")?;
        let group = self.groups.join_group(code, &user.uid, user.role).await?;
        self.enter_group(user, group.clone());
        Ok(group)
    }

    fn enter_group(&mut self, user: User, group: Group) {
        let view = RoleView::from(user.role);
        let user = User { group_id: Some(group.id), ..user };
        info!(uid = %user.uid, group_id = %group.id, view = ?view, "Entered group");
        self.enter(SessionState::InGroup { user, group, view });
    }

    /// Group onboarding is only reachable from `NeedsGroup`
    fn onboarding_user(&self, action: &str) -> Result<User> {
        match &self.state {
            SessionState::NeedsGroup { user } => Ok(user.clone()),
            SessionState::Unauthenticated => Err(MealPlannerError::Authorization(
                "Sign in before joining or creating a group".to_string(),
            )),
            other => Err(MealPlannerError::InvalidStateTransition {
                from: other.name().to_string(),
                to: action.to_string(),
            }),
        }
    }

    pub fn cook_view(&self) -> Result<CookView> {
        match &self.state {
            SessionState::InGroup { group, view: RoleView::Cook, .. } => {
                Ok(CookView::new(self.roster.clone(), group.id))
            }
            other => Err(MealPlannerError::InvalidStateTransition {
                from: other.name().to_string(),
                to: "cook_view".to_string(),
            }),
        }
    }

    pub fn eater_view(&self) -> Result<EaterView> {
        match &self.state {
            SessionState::InGroup { user, view: RoleView::Eater, .. } => {
                Ok(EaterView::new(self.meal_status.clone(), user.clone()))
            }
            other => Err(MealPlannerError::InvalidStateTransition {
                from: other.name().to_string(),
                to: "eater_view".to_string(),
            }),
        }
    }
}
