//! # RBAC Repository
//!
//! Backs component #11. Users relate to groups and direct permissions;
//! groups relate to organizations, which relate to roles, which relate to
//! permissions. Effective-permission resolution (§4.8) always runs as a
//! joined SQL read — this codebase never materializes the graph in memory.

use shared::errors::ApiError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Group, Organization, Permission, Role};

#[derive(Debug, Clone)]
pub struct RbacRepository {
    pool: PgPool,
}

impl RbacRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // PERMISSIONS
    // =========================================================================

    pub async fn create_permission(&self, key: &str, description: &str) -> Result<Permission, ApiError> {
        sqlx::query_as::<_, Permission>(
            "INSERT INTO permissions (key, description) VALUES ($1, $2) RETURNING *",
        )
        .bind(key)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.constraint() == Some("permissions_pkey") {
                    return ApiError::Conflict { resource: "permission".to_string() };
                }
            }
            ApiError::InternalError { message: format!("database error: {e}") }
        })
    }

    pub async fn list_permissions(&self) -> Result<Vec<Permission>, ApiError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Direct user→permission assignments (one leg of §4.8's union).
    pub async fn direct_user_permissions(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT permission_key FROM user_permissions WHERE user_sub = $1",
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    /// Permissions reachable via user→group→permission.
    pub async fn group_permissions(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT gp.permission_key
            FROM user_groups ug
            JOIN group_permissions gp ON gp.group_key = ug.group_key
            WHERE ug.user_sub = $1
            "#,
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    /// Permissions reachable via user→organization-member→role→permission.
    pub async fn role_permissions(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT rp.permission_key
            FROM organization_members om
            JOIN member_roles mr ON mr.org_id = om.org_id AND mr.user_sub = om.user_sub
            JOIN role_permissions rp ON rp.role_id = mr.role_id
            WHERE om.user_sub = $1
            "#,
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    /// Deterministic union of direct, group, and role permissions, sorted by
    /// key as required by §4.8.
    pub async fn effective_permissions(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        let mut all = self.direct_user_permissions(user_sub).await?;
        all.extend(self.group_permissions(user_sub).await?);
        all.extend(self.role_permissions(user_sub).await?);
        all.sort();
        all.dedup();
        Ok(all)
    }

    /// Role keys the user holds across all their organization memberships,
    /// used to test `otp_required` membership in the OTP-policy OR.
    pub async fn role_keys(&self, user_sub: Uuid) -> Result<Vec<String>, ApiError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT r.key
            FROM organization_members om
            JOIN member_roles mr ON mr.org_id = om.org_id AND mr.user_sub = om.user_sub
            JOIN roles r ON r.role_id = mr.role_id
            WHERE om.user_sub = $1
            "#,
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(rows.into_iter().map(|(k,)| k).collect())
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub async fn create_group(&self, key: &str, name: &str, enable_login: bool, require_otp: bool) -> Result<Group, ApiError> {
        sqlx::query_as::<_, Group>(
            "INSERT INTO groups (key, name, enable_login, require_otp) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(key)
        .bind(name)
        .bind(enable_login)
        .bind(require_otp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn find_group(&self, key: &str) -> Result<Option<Group>, ApiError> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list_groups(&self) -> Result<Vec<Group>, ApiError> {
        sqlx::query_as::<_, Group>("SELECT * FROM groups ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn set_group_flags(&self, key: &str, enable_login: bool, require_otp: bool) -> Result<(), ApiError> {
        sqlx::query("UPDATE groups SET enable_login = $1, require_otp = $2 WHERE key = $3")
            .bind(enable_login)
            .bind(require_otp)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    pub async fn add_user_to_group(&self, user_sub: Uuid, group_key: &str) -> Result<(), ApiError> {
        sqlx::query(
            "INSERT INTO user_groups (user_sub, group_key) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_sub)
        .bind(group_key)
        .execute(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })?;
        Ok(())
    }

    /// Groups a user belongs to that gate login (`enable_login`) or force
    /// OTP (`require_otp`), consulted directly by the OTP/login-gating
    /// policy so it doesn't need the full group list.
    pub async fn groups_for_user(&self, user_sub: Uuid) -> Result<Vec<Group>, ApiError> {
        sqlx::query_as::<_, Group>(
            r#"
            SELECT g.* FROM groups g
            JOIN user_groups ug ON ug.group_key = g.key
            WHERE ug.user_sub = $1
            "#,
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    // =========================================================================
    // ORGANIZATIONS
    // =========================================================================

    pub async fn create_organization(&self, name: &str, slug: &str, force_otp: bool) -> Result<Organization, ApiError> {
        sqlx::query_as::<_, Organization>(
            "INSERT INTO organizations (org_id, name, slug, force_otp) VALUES (gen_random_uuid(), $1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(slug)
        .bind(force_otp)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        sqlx::query_as::<_, Organization>("SELECT * FROM organizations ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    /// Organizations a user is a member of; `force_otp` from any of these
    /// feeds the OTP-policy OR.
    pub async fn organizations_for_user(&self, user_sub: Uuid) -> Result<Vec<Organization>, ApiError> {
        sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.* FROM organizations o
            JOIN organization_members om ON om.org_id = o.org_id
            WHERE om.user_sub = $1
            "#,
        )
        .bind(user_sub)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    // =========================================================================
    // ROLES
    // =========================================================================

    pub async fn create_role(&self, key: &str, name: &str, system: bool) -> Result<Role, ApiError> {
        sqlx::query_as::<_, Role>(
            "INSERT INTO roles (role_id, key, name, system) VALUES (gen_random_uuid(), $1, $2, $3) RETURNING *",
        )
        .bind(key)
        .bind(name)
        .bind(system)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, ApiError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ApiError::InternalError { message: format!("database error: {e}") })
    }
}
