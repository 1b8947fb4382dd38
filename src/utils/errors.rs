//! Error handling for the meal planner
//!
//! This module defines the main error type used throughout the crate
//! and maps every failure onto the user-facing error taxonomy.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for the meal planner
#[derive(Error, Debug)]
pub enum MealPlannerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Identity provider error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No group uses invite code '{code}'")]
    GroupNotFound { code: String },

    #[error("Group does not exist: {group_id}")]
    GroupMissing { group_id: Uuid },

    #[error("User not found: {uid}")]
    UserNotFound { uid: String },

    #[error("User {uid} already belongs to group {group_id}")]
    AlreadyInGroup { uid: String, group_id: Uuid },

    #[error("Invite code '{code}' is already taken")]
    CodeConflict { code: String },

    #[error("Could not generate a unique invite code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    #[error("Roster aggregation failed for group {group_id} on {date}: {source}")]
    AggregationFailed {
        group_id: Uuid,
        date: NaiveDate,
        #[source]
        source: Box<MealPlannerError>,
    },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Permission denied: {0}")]
    Authorization(String),

    #[error("Service unavailable: {0}")]
    Transient(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

/// Errors reported by an identity provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Email address is malformed")]
    InvalidEmail,

    #[error("Password is too weak")]
    WeakPassword,

    #[error("Email address is already registered")]
    EmailAlreadyInUse,

    #[error("Wrong email or password")]
    InvalidCredentials,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),

    #[error("Identity provider rejected the request: {code}")]
    Rejected { code: String },
}

/// Result type alias for meal planner operations
pub type Result<T> = std::result::Result<T, MealPlannerError>;

/// Result type alias for identity provider calls
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Error classes surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Transient,
    Authorization,
    CodeGenerationExhausted,
    AggregationFailed,
    Internal,
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unavailable(_) => ErrorKind::Transient,
            AuthError::Rejected { .. } => ErrorKind::Authorization,
            _ => ErrorKind::Validation,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::InvalidEmail => "auth.invalid_email",
            AuthError::WeakPassword => "auth.weak_password",
            AuthError::EmailAlreadyInUse => "auth.email_in_use",
            AuthError::InvalidCredentials => "auth.invalid_credentials",
            AuthError::Unavailable(_) => "auth.unavailable",
            AuthError::Rejected { .. } => "auth.rejected",
        }
    }
}

impl MealPlannerError {
    /// Classify the error for the presentation layer
    pub fn kind(&self) -> ErrorKind {
        match self {
            MealPlannerError::GroupNotFound { .. } => ErrorKind::NotFound,
            MealPlannerError::GroupMissing { .. } => ErrorKind::NotFound,
            MealPlannerError::UserNotFound { .. } => ErrorKind::NotFound,
            MealPlannerError::Validation(_) => ErrorKind::Validation,
            MealPlannerError::AlreadyInGroup { .. } => ErrorKind::Validation,
            MealPlannerError::Authorization(_) => ErrorKind::Authorization,
            MealPlannerError::InvalidStateTransition { .. } => ErrorKind::Authorization,
            MealPlannerError::Transient(_) => ErrorKind::Transient,
            MealPlannerError::CodeConflict { .. } => ErrorKind::Transient,
            MealPlannerError::CodeGenerationExhausted { .. } => ErrorKind::CodeGenerationExhausted,
            MealPlannerError::AggregationFailed { .. } => ErrorKind::AggregationFailed,
            MealPlannerError::Auth(e) => e.kind(),
            MealPlannerError::Database(e) => match e {
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => ErrorKind::Transient,
                _ => ErrorKind::Internal,
            },
            MealPlannerError::Redis(e) if e.is_io_error() || e.is_timeout() || e.is_connection_dropped() => {
                ErrorKind::Transient
            }
            MealPlannerError::Http(_) => ErrorKind::Transient,
            MealPlannerError::Io(_) => ErrorKind::Transient,
            _ => ErrorKind::Internal,
        }
    }

    /// Stable key the presentation layer uses to pick a localized message
    pub fn error_code(&self) -> &'static str {
        match self {
            MealPlannerError::Auth(e) => e.error_code(),
            MealPlannerError::GroupNotFound { .. } => "group.not_found",
            MealPlannerError::GroupMissing { .. } => "group.missing",
            MealPlannerError::UserNotFound { .. } => "user.not_found",
            MealPlannerError::AlreadyInGroup { .. } => "group.already_member",
            MealPlannerError::CodeGenerationExhausted { .. } => "group.code_exhausted",
            MealPlannerError::AggregationFailed { .. } => "roster.aggregation_failed",
            MealPlannerError::Validation(_) => "input.invalid",
            MealPlannerError::Authorization(_) => "auth.forbidden",
            MealPlannerError::InvalidStateTransition { .. } => "session.invalid_transition",
            _ => match self.kind() {
                ErrorKind::Transient => "service.retry_later",
                _ => "internal",
            },
        }
    }

    /// Check if the error is recoverable (the user may try again)
    pub fn is_recoverable(&self) -> bool {
        match self {
            MealPlannerError::AggregationFailed { source, .. } => source.is_recoverable(),
            _ => self.kind() == ErrorKind::Transient,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MealPlannerError::Migration(_) => ErrorSeverity::Critical,
            MealPlannerError::Config(_) => ErrorSeverity::Critical,
            MealPlannerError::Authorization(_) => ErrorSeverity::Warning,
            MealPlannerError::InvalidStateTransition { .. } => ErrorSeverity::Warning,
            MealPlannerError::CodeGenerationExhausted { .. } => ErrorSeverity::Warning,
            _ => match self.kind() {
                ErrorKind::NotFound | ErrorKind::Validation => ErrorSeverity::Info,
                ErrorKind::Transient => ErrorSeverity::Warning,
                _ => ErrorSeverity::Error,
            },
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomy_mapping() {
        let not_found = MealPlannerError::GroupNotFound { code: "ABC123".to_string() };
        assert_eq!(not_found.kind(), ErrorKind::NotFound);
        assert_eq!(not_found.error_code(), "group.not_found");
        assert!(!not_found.is_recoverable());

        let transient = MealPlannerError::Transient("store offline".to_string());
        assert!(transient.is_recoverable());
        assert_eq!(transient.error_code(), "service.retry_later");

        let weak: MealPlannerError = AuthError::WeakPassword.into();
        assert_eq!(weak.kind(), ErrorKind::Validation);
        assert_eq!(weak.error_code(), "auth.weak_password");
    }

    #[test]
    fn test_aggregation_failure_inherits_recoverability() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let err = MealPlannerError::AggregationFailed {
            group_id: Uuid::new_v4(),
            date,
            source: Box::new(MealPlannerError::Transient("timeout".to_string())),
        };
        assert_eq!(err.kind(), ErrorKind::AggregationFailed);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("2024-06-01"));
    }
}
