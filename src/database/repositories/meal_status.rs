//! Meal status repository implementation

use std::time::Instant;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;

use crate::database::store::MealStatusStorage;
use crate::models::meal_status::MealStatusRecord;
use crate::utils::errors::Result;
use crate::utils::logging::log_database_operation;

#[derive(Clone, Debug)]
pub struct MealStatusRepository {
    pool: PgPool,
}

impl MealStatusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MealStatusStorage for MealStatusRepository {
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()> {
        let started = Instant::now();
        let result = sqlx::query(
            r#"
            INSERT INTO meal_status (user_id, date, breakfast, lunch, dinner, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, date) DO UPDATE
            SET breakfast = EXCLUDED.breakfast,
                lunch = EXCLUDED.lunch,
                dinner = EXCLUDED.dinner,
                updated_at = EXCLUDED.updated_at
            "#
        )
        .bind(&record.user_id)
        .bind(record.date)
        .bind(record.breakfast)
        .bind(record.lunch)
        .bind(record.dinner)
        .bind(record.updated_at.unwrap_or_else(Utc::now))
        .execute(&self.pool)
        .await;

        log_database_operation("upsert", "meal_status", started.elapsed().as_millis() as u64, result.is_ok());
        result?;
        Ok(())
    }

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>> {
        let record = sqlx::query_as::<_, MealStatusRecord>(
            "SELECT user_id, date, breakfast, lunch, dinner, updated_at FROM meal_status WHERE user_id = $1 AND date = $2"
        )
        .bind(uid)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }
}
