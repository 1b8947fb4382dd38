//! Meal status model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::FromRow;

use super::user::User;
use crate::utils::helpers::status_key;

/// Which meals a user needs on one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MealSelection {
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
}

impl MealSelection {
    pub fn new(breakfast: bool, lunch: bool, dinner: bool) -> Self {
        Self { breakfast, lunch, dinner }
    }

    /// Number of meals requested
    pub fn count(&self) -> usize {
        [self.breakfast, self.lunch, self.dinner].iter().filter(|m| **m).count()
    }
}

/// Meal-need declaration for `(user_id, date)`.
///
/// `updated_at` is `None` for a synthesized default, i.e. nothing was ever
/// declared for the key. Readers treat that exactly like an explicit
/// all-false declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MealStatusRecord {
    pub user_id: String,
    pub date: NaiveDate,
    pub breakfast: bool,
    pub lunch: bool,
    pub dinner: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MealStatusRecord {
    pub fn new(user_id: &str, date: NaiveDate, selection: MealSelection, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            breakfast: selection.breakfast,
            lunch: selection.lunch,
            dinner: selection.dinner,
            updated_at: Some(updated_at),
        }
    }

    /// The all-false record readers see when nothing was declared
    pub fn not_declared(user_id: &str, date: NaiveDate) -> Self {
        Self {
            user_id: user_id.to_string(),
            date,
            breakfast: false,
            lunch: false,
            dinner: false,
            updated_at: None,
        }
    }

    pub fn selection(&self) -> MealSelection {
        MealSelection::new(self.breakfast, self.lunch, self.dinner)
    }

    /// Document key `{uid}_{YYYY-MM-DD}`
    pub fn key(&self) -> String {
        status_key(&self.user_id, self.date)
    }
}

/// One eater's line in the cook's roster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub user: User,
    pub status: MealStatusRecord,
}
