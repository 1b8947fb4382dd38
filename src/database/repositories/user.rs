//! User repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use chrono::Utc;
use uuid::Uuid;

use crate::database::store::UserStorage;
use crate::models::user::{NewUser, Role, User};
use crate::utils::errors::{MealPlannerError, Result};

const USER_COLUMNS: &str = "uid, email, role, group_id, display_name, created_at";

#[derive(Clone)]
#[derive(Debug)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStorage for UserRepository {
    async fn insert_user(&self, request: NewUser) -> Result<User> {
        let inserted = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (uid, email, role, display_name, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&request.uid)
        .bind(&request.email)
        .bind(request.role)
        .bind(&request.display_name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(MealPlannerError::Validation(
                format!("User {} or email {} is already registered", request.uid, request.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user(&self, uid: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE uid = $1"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_members(&self, group_id: Uuid, role: Role) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE group_id = $1 AND role = $2 ORDER BY created_at ASC, uid ASC"
        ))
        .bind(group_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
