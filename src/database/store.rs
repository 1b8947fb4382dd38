//! Storage traits
//!
//! The services only talk to storage through these traits. Every
//! implementation must give the group-membership writes the same
//! guarantees: the group mutation and the `users.group_id` update are
//! applied together or not at all.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Group, MealStatusRecord, NewUser, Role, User};
use crate::utils::errors::Result;

#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Create the user record written at sign-up. Duplicate uid or email is
    /// a `Validation` error.
    async fn insert_user(&self, user: NewUser) -> Result<User>;

    async fn find_user(&self, uid: &str) -> Result<Option<User>>;

    /// Users of `group_id` registered with `role`
    async fn find_members(&self, group_id: Uuid, role: Role) -> Result<Vec<User>>;
}

#[async_trait]
pub trait GroupStorage: Send + Sync {
    async fn code_in_use(&self, code: &str) -> Result<bool>;

    /// Persist a new group and point the creator's `group_id` at it.
    ///
    /// Fails with `CodeConflict` if the code is taken, `UserNotFound` for an
    /// unknown creator and `AlreadyInGroup` if the creator has a group.
    async fn create_group(&self, group: &Group, creator_uid: &str) -> Result<Group>;

    async fn find_group(&self, id: Uuid) -> Result<Option<Group>>;

    /// Exact match on the invite code
    async fn find_group_by_code(&self, code: &str) -> Result<Option<Group>>;

    /// Group listing `uid` under either role
    async fn find_group_by_member(&self, uid: &str) -> Result<Option<Group>>;

    /// Add `uid` to the role's member list and set the user's `group_id`.
    ///
    /// Idempotent. Fails with `GroupMissing`, `UserNotFound`,
    /// `AlreadyInGroup` (member of another group) or `Validation` (listed
    /// under the other role).
    async fn add_member(&self, group_id: Uuid, uid: &str, role: Role) -> Result<Group>;
}

#[async_trait]
pub trait MealStatusStorage: Send + Sync {
    /// Unconditional overwrite of the record at `(user_id, date)`. The user
    /// id is an opaque key and needs no user record.
    async fn upsert_status(&self, record: &MealStatusRecord) -> Result<()>;

    async fn find_status(&self, uid: &str, date: NaiveDate) -> Result<Option<MealStatusRecord>>;
}
