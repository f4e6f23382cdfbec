//! # RBAC Service
//!
//! Orchestrates component #11 on top of [`RbacRepository`]. Owns the
//! `role=write` enforcement and the self-protection rule ("an admin can
//! never delete or disable their own row") that the repository layer has no
//! business knowing about.

use shared::errors::ApiError;
use uuid::Uuid;

use crate::domain::{Admin, AdminRole, Group, Organization, Permission, Role};
use crate::repository::{AdminRepository, RbacRepository};

#[derive(Clone)]
pub struct RbacService {
    repository: RbacRepository,
    admins: AdminRepository,
}

impl RbacService {
    pub fn new(repository: RbacRepository, admins: AdminRepository) -> Self {
        Self { repository, admins }
    }

    pub async fn create_permission(&self, key: &str, description: &str) -> Result<Permission, ApiError> {
        self.repository.create_permission(key, description).await
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ApiError> {
        self.repository.list_permissions().await
    }

    /// Union of direct, group, and role permissions, sorted and deduped
    /// (§4.8). Used by middleware to decide `insufficient_permissions`.
    pub async fn effective_permissions(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        self.repository.effective_permissions(user_sub).await
    }

    pub async fn has_permission(&self, user_sub: Uuid, permission_key: &str) -> Result<bool, ApiError> {
        Ok(self
            .effective_permissions(user_sub)
            .await?
            .iter()
            .any(|p| p == permission_key))
    }

    pub async fn create_group(
        &self,
        key: &str,
        name: &str,
        enable_login: bool,
        require_otp: bool,
    ) -> Result<Group, ApiError> {
        self.repository.create_group(key, name, enable_login, require_otp).await
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        self.repository.list_groups().await
    }

    pub async fn set_group_flags(&self, key: &str, enable_login: bool, require_otp: bool) -> Result<(), ApiError> {
        self.repository
            .find_group(key)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "group".to_string() })?;
        self.repository.set_group_flags(key, enable_login, require_otp).await
    }

    pub async fn add_user_to_group(&self, user_sub: Uuid, group_key: &str) -> Result<(), ApiError> {
        self.repository
            .find_group(group_key)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "group".to_string() })?;
        self.repository.add_user_to_group(user_sub, group_key).await
    }

    pub async fn groups_for_user(&self, user_sub: Uuid) -> Result<Vec<Group>, ApiError> {
        self.repository.groups_for_user(user_sub).await
    }

    pub async fn create_organization(&self, name: &str, slug: &str, force_otp: bool) -> Result<Organization, ApiError> {
        self.repository.create_organization(name, slug, force_otp).await
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.repository.list_organizations().await
    }

    pub async fn organizations_for_user(&self, user_sub: Uuid) -> Result<Vec<Organization>, ApiError> {
        self.repository.organizations_for_user(user_sub).await
    }

    /// Role keys the user holds across every organization they belong to,
    /// used for the ID token's `roles` claim and the OTP-policy OR.
    pub async fn role_keys(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        self.repository.role_keys(user_sub).await
    }

    pub async fn create_role(&self, key: &str, name: &str, system: bool) -> Result<Role, ApiError> {
        self.repository.create_role(key, name, system).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        self.repository.list_roles().await
    }

    /// Enforces the `role=write` gate every mutating admin endpoint needs.
    pub fn require_write(&self, admin: &Admin) -> Result<(), ApiError> {
        if admin.role == AdminRole::Write {
            Ok(())
        } else {
            Err(ApiError::InsufficientPermissions)
        }
    }

    /// Refuses an admin-mutating operation that targets the caller's own
    /// row — disabling or deleting yourself would strand the installation
    /// with no way to undo it through the same session.
    pub fn require_not_self(&self, admin: &Admin, target_admin_id: Uuid) -> Result<(), ApiError> {
        require_not_self_check(admin, target_admin_id)
    }

    pub async fn find_admin(&self, admin_id: Uuid) -> Result<Option<Admin>, ApiError> {
        self.admins.find_by_id(admin_id).await
    }

    pub async fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>, ApiError> {
        self.admins.find_by_email(email).await
    }

    pub async fn create_admin(&self, email: &str, name: &str, role: AdminRole) -> Result<Admin, ApiError> {
        self.admins.create(email, name, role).await
    }

    pub async fn list_admins(&self) -> Result<Vec<Admin>, ApiError> {
        self.admins.list().await
    }

    pub async fn update_admin_role(&self, admin_id: Uuid, role: AdminRole) -> Result<Admin, ApiError> {
        self.admins.update_role(admin_id, role).await?;
        self.admins
            .find_by_id(admin_id)
            .await?
            .ok_or_else(|| ApiError::NotFound { resource: "admin".to_string() })
    }

    pub async fn delete_admin(&self, admin_id: Uuid) -> Result<(), ApiError> {
        self.admins.delete(admin_id).await
    }
}

fn require_not_self_check(admin: &Admin, target_admin_id: Uuid) -> Result<(), ApiError> {
    if admin.admin_id == target_admin_id {
        Err(ApiError::BadRequest { message: "an admin cannot act on their own account".to_string() })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_admin(role: AdminRole) -> Admin {
        Admin {
            admin_id: Uuid::new_v4(),
            email: "admin@example.com".to_string(),
            name: "Admin".to_string(),
            role,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_require_not_self_rejects_matching_id() {
        let admin = sample_admin(AdminRole::Write);
        assert!(require_not_self_check(&admin, admin.admin_id).is_err());
        assert!(require_not_self_check(&admin, Uuid::new_v4()).is_ok());
    }
}
