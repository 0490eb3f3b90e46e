//! User repository.

use crate::error::MetadataResult;
use crate::models::{NewUser, UserRow};
use async_trait::async_trait;

/// Repository for user accounts.
#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Create a user, returning the new user id.
    /// Fails `AlreadyExists` if the email is taken.
    async fn create_user(&self, user: &NewUser) -> MetadataResult<i64>;

    /// Get a user by id.
    async fn get_user(&self, user_id: i64) -> MetadataResult<Option<UserRow>>;

    /// Get a user by exact (lowercased) email.
    async fn get_user_by_email(&self, email: &str) -> MetadataResult<Option<UserRow>>;

    /// Get a user by case-insensitive username.
    async fn get_user_by_username(&self, username: &str) -> MetadataResult<Option<UserRow>>;

    /// Replace the password hash.
    async fn set_password_hash(&self, user_id: i64, password_hash: &str) -> MetadataResult<()>;

    /// Set or clear the forced-reset credential hash.
    async fn set_reset_hash(&self, user_id: i64, reset_hash: Option<&str>) -> MetadataResult<()>;

    /// Change a user's role.
    async fn set_role(&self, user_id: i64, role: &str) -> MetadataResult<()>;
}
