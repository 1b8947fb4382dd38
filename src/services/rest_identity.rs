//! REST identity provider
//!
//! Talks to an identity toolkit style endpoint
//! (`{api_url}/accounts:signUp?key=...`, `accounts:signInWithPassword`).
//! Provider error messages are mapped onto `AuthError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::IdentityConfig;
use crate::services::identity::{AuthState, AuthSubscription, IdentityProvider};
use crate::utils::errors::{AuthError, AuthResult, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CredentialsRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Identity provider backed by a remote REST service
pub struct RestIdentityProvider {
    client: Client,
    api_url: Url,
    api_key: String,
    state: AuthState,
}

impl RestIdentityProvider {
    pub fn new(config: &IdentityConfig) -> Result<Self> {
        let api_url = Url::parse(&config.api_url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url,
            api_key: config.api_key.clone(),
            state: AuthState::new(),
        })
    }

    /// `{api_url}/accounts:{action}?key={api_key}`
    fn endpoint(&self, action: &str) -> AuthResult<Url> {
        let raw = format!("{}/accounts:{}", self.api_url.as_str().trim_end_matches('/'), action);
        let mut url = Url::parse(&raw).map_err(|e| AuthError::Unavailable(e.to_string()))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }

    async fn call(&self, action: &str, email: &str, password: &str) -> AuthResult<AccountResponse> {
        let url = self.endpoint(action)?;
        debug!(action = %action, "Calling identity service");

        let response = self
            .client
            .post(url)
            .json(&CredentialsRequest { email, password, return_secure_token: true })
            .send()
            .await
            .map_err(|e| {
                warn!(action = %action, error = %e, "Identity service request failed");
                AuthError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<AccountResponse>()
                .await
                .map_err(|e| AuthError::Unavailable(format!("Malformed identity response: {}", e)));
        }

        if status.is_server_error() {
            warn!(action = %action, status = %status, "Identity service error");
            return Err(AuthError::Unavailable(format!("Identity service returned {}", status)));
        }

        let body: ErrorResponse = response.json().await.map_err(|_| AuthError::Rejected {
            code: status.as_str().to_string(),
        })?;
        Err(map_error_message(&body.error.message))
    }

    fn signed_in(&self, account: AccountResponse) -> String {
        self.state.set(Some(account.local_id.clone()));
        account.local_id
    }
}

/// Map a provider message such as `WEAK_PASSWORD : Password should be ...`
fn map_error_message(message: &str) -> AuthError {
    let code = message.split([' ', ':']).next().unwrap_or(message);

    match code {
        "EMAIL_EXISTS" => AuthError::EmailAlreadyInUse,
        "INVALID_EMAIL" | "MISSING_EMAIL" => AuthError::InvalidEmail,
        "WEAK_PASSWORD" | "MISSING_PASSWORD" => AuthError::WeakPassword,
        "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            AuthError::InvalidCredentials
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => AuthError::Unavailable(code.to_string()),
        other => AuthError::Rejected { code: other.to_string() },
    }
}

#[async_trait]
impl IdentityProvider for RestIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<String> {
        let account = self.call("signInWithPassword", email, password).await?;
        let uid = self.signed_in(account);
        info!(uid = %uid, "Signed in with identity service");
        Ok(uid)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<String> {
        let account = self.call("signUp", email, password).await?;
        let uid = self.signed_in(account);
        info!(uid = %uid, "Account registered with identity service");
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
