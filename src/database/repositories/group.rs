//! Group repository implementation
//!
//! Membership writes run in a transaction that also updates the member's
//! `users.group_id`, with both rows locked `FOR UPDATE`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::store::GroupStorage;
use crate::models::group::Group;
use crate::models::user::Role;
use crate::utils::errors::{MealPlannerError, Result};

const GROUP_COLUMNS: &str = "id, name, code, cook_ids, eater_ids, created_at";

#[derive(Clone, Debug)]
pub struct GroupRepository {
    pool: PgPool,
}

impl GroupRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lock the user row and make sure they may join `group_id`
    async fn lock_joinable_user(
        tx: &mut Transaction<'static, Postgres>,
        uid: &str,
        group_id: Uuid,
    ) -> Result<()> {
        let current: Option<(Option<Uuid>,)> =
            sqlx::query_as("SELECT group_id FROM users WHERE uid = $1 FOR UPDATE")
                .bind(uid)
                .fetch_optional(&mut **tx)
                .await?;

        match current {
            None => Err(MealPlannerError::UserNotFound { uid: uid.to_string() }),
            Some((Some(current),)) if current != group_id => Err(MealPlannerError::AlreadyInGroup {
                uid: uid.to_string(),
                group_id: current,
            }),
            Some(_) => Ok(()),
        }
    }

    async fn assign_user_group(tx: &mut Transaction<'static, Postgres>, uid: &str, group_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE users SET group_id = $1 WHERE uid = $2")
            .bind(group_id)
            .bind(uid)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GroupStorage for GroupRepository {
    async fn code_in_use(&self, code: &str) -> Result<bool> {
        let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM groups WHERE code = $1)")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists.0)
    }

    async fn create_group(&self, group: &Group, creator_uid: &str) -> Result<Group> {
        let mut tx = self.pool.begin().await?;

        Self::lock_joinable_user(&mut tx, creator_uid, group.id).await?;

        let inserted = sqlx::query_as::<_, Group>(&format!(
            r#"
            INSERT INTO groups (id, name, code, cook_ids, eater_ids, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {GROUP_COLUMNS}
            "#
        ))
        .bind(group.id)
        .bind(&group.name)
        .bind(&group.code)
        .bind(&group.cook_ids)
        .bind(&group.eater_ids)
        .bind(group.created_at)
        .fetch_one(&mut *tx)
        .await;

        let created = match inserted {
            Ok(created) => created,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(MealPlannerError::CodeConflict { code: group.code.clone() });
            }
            Err(e) => return Err(e.into()),
        };

        Self::assign_user_group(&mut tx, creator_uid, created.id).await?;
        tx.commit().await?;

        Ok(created)
    }

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn find_group_by_code(&self, code: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!("SELECT {GROUP_COLUMNS} FROM groups WHERE code = $1"))
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(group)
    }

    async fn find_group_by_member(&self, uid: &str) -> Result<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE $1 = ANY(eater_ids) OR $1 = ANY(cook_ids) LIMIT 1"
        ))
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(group)
    }

    async fn add_member(&self, group_id: Uuid, uid: &str, role: Role) -> Result<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1 FOR UPDATE"
        ))
        .bind(group_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(MealPlannerError::GroupMissing { group_id })?;

        Self::lock_joinable_user(&mut tx, uid, group_id).await?;

        if let Some(existing) = group.role_of(uid) {
            if existing != role {
                return Err(MealPlannerError::Validation(format!(
                    "{} is already a {} in this group",
                    uid, existing
                )));
            }
        }

        let append = match role {
            Role::Cook => format!(
                "UPDATE groups SET cook_ids = array_append(cook_ids, $2) \
                 WHERE id = $1 AND NOT ($2 = ANY(cook_ids)) RETURNING {GROUP_COLUMNS}"
            ),
            Role::Eater => format!(
                "UPDATE groups SET eater_ids = array_append(eater_ids, $2) \
                 WHERE id = $1 AND NOT ($2 = ANY(eater_ids)) RETURNING {GROUP_COLUMNS}"
            ),
        };

        let updated = sqlx::query_as::<_, Group>(&append)
            .bind(group_id)
            .bind(uid)
            .fetch_optional(&mut *tx)
            .await?
            .unwrap_or(group);

        Self::assign_user_group(&mut tx, uid, group_id).await?;
        tx.commit().await?;

        Ok(updated)
    }
}
