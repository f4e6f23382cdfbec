//! # User Service
//!
//! Orchestrates end-user CRUD on top of [`UserRepository`], and the
//! "default group" auto-assignment new users get at creation time.

use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::{User, UserDirectoryEntry};
use crate::repository::{RbacRepository, UserRepository};

const DEFAULT_GROUP_KEY: &str = "default";

#[derive(Clone)]
pub struct UserService {
    repository: UserRepository,
    rbac: RbacRepository,
}

impl UserService {
    pub fn new(repository: UserRepository, rbac: RbacRepository) -> Self {
        Self { repository, rbac }
    }

    /// Creates a user row and assigns the `default` group. Callers persist
    /// the OPAQUE envelope separately — user creation and OPAQUE
    /// registration are orchestrated together one layer up.
    pub async fn create(&self, email: &str, name: &str) -> Result<User, ApiError> {
        let user = self.repository.create(email, name).await?;
        self.rbac.add_user_to_group(user.sub, DEFAULT_GROUP_KEY).await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        self.repository.find_by_email(email).await
    }

    pub async fn find_by_sub(&self, sub: Uuid) -> Result<Option<User>, ApiError> {
        self.repository.find_by_sub(sub).await
    }

    pub async fn get(&self, sub: Uuid) -> Result<User, ApiError> {
        self.repository
            .find_by_sub(sub)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "user".to_string() })
    }

    pub async fn directory(&self, limit: i64, offset: i64) -> Result<Vec<UserDirectoryEntry>, ApiError> {
        Ok(self.repository.list(limit, offset).await?.into_iter().map(UserDirectoryEntry::from).collect())
    }

    pub async fn set_email_verified(&self, sub: Uuid, verified: bool) -> Result<(), ApiError> {
        self.repository.set_email_verified(sub, verified).await
    }

    pub async fn set_password_reset_required(&self, sub: Uuid, required: bool) -> Result<(), ApiError> {
        self.repository.set_password_reset_required(sub, required).await
    }

    pub async fn delete(&self, sub: Uuid) -> Result<(), ApiError> {
        self.repository.delete(sub).await
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        self.repository.email_exists(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UserService>();
    }
}
