//! Identity service implementation
//!
//! `IdentityProvider` is the seam to whoever authenticates email/password
//! principals. `IdentityContext` resolves the signed-in principal to its
//! `User` record and is passed explicitly to whatever needs it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::database::store::UserStorage;
use crate::models::{NewUser, Role, User};
use crate::utils::errors::{AuthError, AuthResult, MealPlannerError, Result};
use crate::utils::helpers::{is_strong_password, is_valid_email, normalize_whitespace};

/// Email/password identity provider contract
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate and return the principal's uid
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<String>;

    /// Create an account, sign it in and return its uid
    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<String>;

    async fn sign_out(&self) -> AuthResult<()>;

    fn current_user(&self) -> Option<String>;

    /// Subscribe to authentication-state changes
    fn subscribe(&self) -> AuthSubscription;
}

/// Current signed-in uid, broadcast to subscribers on every change
#[derive(Debug)]
pub struct AuthState {
    tx: watch::Sender<Option<String>>,
}

impl AuthState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn set(&self, uid: Option<String>) {
        self.tx.send_replace(uid);
    }

    pub fn current(&self) -> Option<String> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> AuthSubscription {
        AuthSubscription { rx: self.tx.subscribe() }
    }
}

impl Default for AuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle on authentication-state changes. Dropping it unsubscribes.
#[derive(Debug)]
pub struct AuthSubscription {
    rx: watch::Receiver<Option<String>>,
}

impl AuthSubscription {
    /// The uid signed in right now
    pub fn current(&self) -> Option<String> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change. `None` once the provider has gone away.
    pub async fn changed(&mut self) -> Option<Option<String>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

struct LocalAccount {
    uid: String,
    salt: String,
    digest: String,
}

/// In-process identity provider for development and tests
pub struct LocalIdentityProvider {
    accounts: Mutex<HashMap<String, LocalAccount>>,
    state: AuthState,
}

impl LocalIdentityProvider {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            state: AuthState::new(),
        }
    }

    fn digest(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl Default for LocalIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<String> {
        let email = email.trim().to_lowercase();
        let accounts = self.accounts.lock().await;

        let account = accounts.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if Self::digest(&account.salt, password) != account.digest {
            return Err(AuthError::InvalidCredentials);
        }

        self.state.set(Some(account.uid.clone()));
        Ok(account.uid.clone())
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<String> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        if !is_strong_password(password) {
            return Err(AuthError::WeakPassword);
        }

        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&email) {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(16)
            .map(char::from)
            .collect();
        let uid = Uuid::new_v4().simple().to_string();
        let digest = Self::digest(&salt, password);
        accounts.insert(email, LocalAccount { uid: uid.clone(), salt, digest });

        self.state.set(Some(uid.clone()));
        Ok(uid)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.state.set(None);
        Ok(())
    }

    fn current_user(&self) -> Option<String> {
        self.state.current()
    }

    fn subscribe(&self) -> AuthSubscription {
        self.state.subscribe()
    }
}

/// Everything needed to register a new principal
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    pub display_name: Option<String>,
}

/// Resolves the authenticated principal to its `User` record
#[derive(Clone)]
pub struct IdentityContext {
    provider: Arc<dyn IdentityProvider>,
    users: Arc<dyn UserStorage>,
}

impl IdentityContext {
    pub fn new(provider: Arc<dyn IdentityProvider>, users: Arc<dyn UserStorage>) -> Self {
        Self { provider, users }
    }

    /// Create the provider account and the matching user record
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<User> {
        let email = request.email.trim().to_lowercase();
        debug!(email = %email, role = %request.role, "Signing up");

        let uid = self.provider.sign_up(&email, &request.password).await?;

        let display_name = request
            .display_name
            .map(|name| normalize_whitespace(&name))
            .filter(|name| !name.is_empty());

        let new_user = NewUser { uid: uid.clone(), email, role: request.role, display_name };
        let user = match self.users.insert_user(new_user).await {
            Ok(user) => user,
            Err(e) => {
                error!(uid = %uid, error = %e, "Account created but the user record could not be written");
                // A signed-in uid without a record would fail every later lookup
                if let Err(sign_out) = self.provider.sign_out().await {
                    warn!(uid = %uid, error = %sign_out, "Failed to sign out after the user record write failed");
                }
                return Err(e);
            }
        };

        info!(uid = %user.uid, role = %user.role, "User signed up");
        Ok(user)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let uid = self.provider.sign_in(email, password).await.map_err(|e| {
            warn!(error = %e, "Sign-in rejected");
            e
        })?;

        let user = self
            .users
            .find_user(&uid)
            .await?
            .ok_or_else(|| MealPlannerError::UserNotFound { uid: uid.clone() })?;

        info!(uid = %uid, "User signed in");
        Ok(user)
    }

    pub async fn sign_out(&self) -> Result<()> {
        self.provider.sign_out().await?;
        info!("User signed out");
        Ok(())
    }

    /// The signed-in principal's record, if anyone is signed in
    pub async fn current_user(&self) -> Result<Option<User>> {
        let Some(uid) = self.provider.current_user() else {
            return Ok(None);
        };

        match self.users.find_user(&uid).await? {
            Some(user) => Ok(Some(user)),
            None => Err(MealPlannerError::UserNotFound { uid }),
        }
    }

    /// Like `current_user`, but an anonymous caller is an authorization error
    pub async fn require_user(&self) -> Result<User> {
        self.current_user()
            .await?
            .ok_or_else(|| MealPlannerError::Authorization("No authenticated user".to_string()))
    }

    pub fn subscribe(&self) -> AuthSubscription {
        self.provider.subscribe()
    }
}
