//! Helper functions and utilities
//!
//! Invite code generation and normalization, email checks and the
//! calendar-date formatting used for record keys.

use std::sync::OnceLock;

use chrono::NaiveDate;
use rand::Rng;
use regex::Regex;

use crate::utils::errors::{MealPlannerError, Result};

/// Minimum password length accepted by the identity providers
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Generate a random code of `length` characters drawn from `alphabet`
pub fn generate_invite_code<R: Rng + ?Sized>(rng: &mut R, alphabet: &[u8], length: usize) -> String {
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..alphabet.len());
            alphabet[idx] as char
        })
        .collect()
}

/// Normalize user-typed invite code input: surrounding whitespace is dropped
/// and letters are uppercased.
pub fn normalize_invite_code(input: &str) -> String {
    input.trim().to_ascii_uppercase()
}

/// Longest invite code worth looking up
pub const MAX_INVITE_CODE_LENGTH: usize = 32;

/// Loose shape check for a typed (normalized) code before it is looked up.
/// Codes minted under an earlier length or alphabet must still pass.
pub fn is_plausible_invite_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_INVITE_CODE_LENGTH && code.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Check that a (normalized) code could have been produced by the generator
pub fn is_well_formed_code(code: &str, alphabet: &str, length: usize) -> bool {
    code.chars().count() == length && code.chars().all(|c| alphabet.contains(c))
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    });
    re.is_match(email)
}

/// Check a password against the minimum strength rule
pub fn is_strong_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
}

/// Format a calendar date as `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| MealPlannerError::Validation(format!("Not a YYYY-MM-DD date: '{}'", input)))
}

/// Document key for a user's meal status on a date: `{uid}_{YYYY-MM-DD}`
pub fn status_key(uid: &str, date: NaiveDate) -> String {
    format!("{}_{}", uid, format_date(date))
}

/// Normalize whitespace in text
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
