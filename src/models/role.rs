//! Role and permission model module.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Role slugs that can never be deleted.
pub const PROTECTED_ROLES: [&str; 3] = ["admin", "provider", "client"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_protected(&self) -> bool {
        PROTECTED_ROLES.contains(&self.slug.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

impl Permission {
    /// Module prefix of the slug, `users` for `users.view`.
    pub fn module(&self) -> &str {
        self.slug.split('.').next().unwrap_or(&self.slug)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Groups permissions by module prefix.
pub fn group_by_module(permissions: &[Permission]) -> BTreeMap<String, Vec<Permission>> {
    let mut grouped: BTreeMap<String, Vec<Permission>> = BTreeMap::new();
    for permission in permissions {
        grouped
            .entry(permission.module().to_string())
            .or_default()
            .push(permission.clone());
    }
    grouped
}

#[derive(FromRow)]
struct RolePermissionRow {
    role_id: i64,
    #[sqlx(flatten)]
    permission: Permission,
}

/// Role repository for database operations.
pub struct RoleRepository;

impl RoleRepository {
    pub async fn all_with_permissions(pool: &PgPool) -> AppResult<Vec<RoleWithPermissions>> {
        let roles = sqlx::query_as::<_, Role>(
            "SELECT id, name, slug, created_at, updated_at FROM roles ORDER BY id",
        )
        .fetch_all(pool)
        .await?;

        let rows = sqlx::query_as::<_, RolePermissionRow>(
            r"
            SELECT rp.role_id, p.id, p.name, p.slug
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            ORDER BY p.slug
            ",
        )
        .fetch_all(pool)
        .await?;

        let mut by_role: BTreeMap<i64, Vec<Permission>> = BTreeMap::new();
        for row in rows {
            by_role.entry(row.role_id).or_default().push(row.permission);
        }

        Ok(roles
            .into_iter()
            .map(|role| {
                let permissions = by_role.remove(&role.id).unwrap_or_default();
                RoleWithPermissions { role, permissions }
            })
            .collect())
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            "SELECT id, name, slug, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    pub async fn with_permissions(pool: &PgPool, role: Role) -> AppResult<RoleWithPermissions> {
        let permissions = sqlx::query_as::<_, Permission>(
            r"
            SELECT p.id, p.name, p.slug
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.slug
            ",
        )
        .bind(role.id)
        .fetch_all(pool)
        .await?;

        Ok(RoleWithPermissions { role, permissions })
    }

    pub async fn slug_taken(pool: &PgPool, slug: &str) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM roles WHERE slug = $1)")
            .bind(slug)
            .fetch_one(pool)
            .await?;

        Ok(taken)
    }

    pub async fn create(pool: &PgPool, name: &str, slug: &str) -> AppResult<Role> {
        let role = sqlx::query_as::<_, Role>(
            r"
            INSERT INTO roles (name, slug) VALUES ($1, $2)
            RETURNING id, name, slug, created_at, updated_at
            ",
        )
        .bind(name)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(role)
    }

    pub async fn rename(pool: &PgPool, id: i64, name: &str) -> AppResult<Option<Role>> {
        let role = sqlx::query_as::<_, Role>(
            r"
            UPDATE roles SET name = $2, updated_at = NOW() WHERE id = $1
            RETURNING id, name, slug, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(pool)
        .await?;

        Ok(role)
    }

    /// Replaces the role's permission set. Unknown permission ids are ignored.
    pub async fn sync_permissions(
        pool: &PgPool,
        role_id: i64,
        permission_ids: &[i64],
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r"
            INSERT INTO role_permissions (role_id, permission_id)
            SELECT $1, p.id FROM permissions p WHERE p.id = ANY($2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(role_id)
        .bind(permission_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    pub async fn users_count(pool: &PgPool, role: &Role) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role_id = $1 OR role = $2")
                .bind(role.id)
                .bind(&role.slug)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn permissions(pool: &PgPool) -> AppResult<Vec<Permission>> {
        let permissions =
            sqlx::query_as::<_, Permission>("SELECT id, name, slug FROM permissions ORDER BY slug")
                .fetch_all(pool)
                .await?;

        Ok(permissions)
    }

    /// Whether the user's role grants `permission`. Users without `role_id`
    /// resolve their role through the slug column.
    pub async fn has_permission(pool: &PgPool, user_id: i64, permission: &str) -> AppResult<bool> {
        let granted: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM users u
                JOIN roles r ON r.id = u.role_id OR (u.role_id IS NULL AND r.slug = u.role)
                JOIN role_permissions rp ON rp.role_id = r.id
                JOIN permissions p ON p.id = rp.permission_id
                WHERE u.id = $1 AND p.slug = $2
            )
            ",
        )
        .bind(user_id)
        .bind(permission)
        .fetch_one(pool)
        .await?;

        Ok(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permission(id: i64, slug: &str) -> Permission {
        Permission {
            id,
            name: slug.to_string(),
            slug: slug.to_string(),
        }
    }

    #[test]
    fn test_permission_module() {
        assert_eq!(permission(1, "users.view").module(), "users");
        assert_eq!(permission(2, "dashboard").module(), "dashboard");
    }

    #[test]
    fn test_group_by_module() {
        let permissions = vec![
            permission(1, "users.view"),
            permission(2, "reports.manage"),
            permission(3, "users.edit"),
        ];

        let grouped = group_by_module(&permissions);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["users"].len(), 2);
        assert_eq!(grouped["reports"][0].slug, "reports.manage");
    }

    #[test]
    fn test_protected_roles() {
        let now = Utc::now();
        let role = |slug: &str| Role {
            id: 1,
            name: slug.to_string(),
            slug: slug.to_string(),
            created_at: now,
            updated_at: now,
        };

        assert!(role("admin").is_protected());
        assert!(role("client").is_protected());
        assert!(!role("moderator").is_protected());
    }
}
