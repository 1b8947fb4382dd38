//! Test data helpers
//!
//! Builders for users, sign-up requests and dates.

use chrono::NaiveDate;
use fake::faker::name::en::Name;
use fake::Fake;
use uuid::Uuid;

use meal_planner::models::{MealSelection, Role};
use meal_planner::services::SignUpRequest;

pub const TEST_PASSWORD: &str = "correct-horse";

/// A day in June 2024
pub fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("valid June date")
}

/// Unique throwaway email address
pub fn unique_email() -> String {
    format!("{}@example.com", Uuid::new_v4().simple())
}

pub fn random_name() -> String {
    Name().fake()
}

pub fn sign_up_request(email: &str, role: Role, display_name: &str) -> SignUpRequest {
    SignUpRequest {
        email: email.to_string(),
        password: TEST_PASSWORD.to_string(),
        role,
        display_name: Some(display_name.to_string()),
    }
}

pub fn breakfast_and_dinner() -> MealSelection {
    MealSelection::new(true, false, true)
}

pub fn lunch_only() -> MealSelection {
    MealSelection::new(false, true, false)
}
