//! User model module.
//!
//! Accounts, their role, activation state and token version.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::AppResult;
use crate::utils::PageParams;

/// Built-in role slugs.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const PROVIDER: &str = "provider";
    pub const CLIENT: &str = "client";
    pub const MODERATOR: &str = "moderator";
}

/// Account row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: String,
    pub role_id: Option<i64>,
    pub is_active: bool,
    #[serde(skip_serializing, default)]
    pub token_version: i32,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == roles::ADMIN
    }
}

/// Public identity of a user embedded in other payloads.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
}

/// Fields for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub password_hash: String,
    pub role: String,
    pub role_id: Option<i64>,
}

/// Partial update of contact fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Option<String>,
    pub role_id: Option<i64>,
}

const USER_COLUMNS: &str = "id, name, first_name, last_name, email, phone, address, password_hash, \
     role, role_id, is_active, token_version, last_seen_at, created_at, updated_at";

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Case-insensitive lookup by e-mail.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        except_id: Option<i64>,
    ) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM users
                WHERE LOWER(email) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
            ",
        )
        .bind(email)
        .bind(except_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn create<'e>(executor: impl PgExecutor<'e>, new_user: &NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r"
            INSERT INTO users (name, first_name, last_name, email, phone, address,
                               password_hash, role, role_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8,
                    COALESCE($9, (SELECT id FROM roles WHERE slug = $8)))
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&new_user.name)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .bind(&new_user.email)
        .bind(&new_user.phone)
        .bind(&new_user.address)
        .bind(&new_user.password_hash)
        .bind(&new_user.role)
        .bind(new_user.role_id)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    pub async fn update(pool: &PgPool, id: i64, changes: &UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r"
            UPDATE users SET
                name = COALESCE($2, name),
                first_name = COALESCE($3, first_name),
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                role = COALESCE($8, role),
                role_id = COALESCE($9, role_id),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(&changes.address)
        .bind(&changes.role)
        .bind(changes.role_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Replaces the password hash and revokes every issued token.
    pub async fn set_password_hash(pool: &PgPool, id: i64, password_hash: &str) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE users
            SET password_hash = $2, token_version = token_version + 1, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Revokes every token issued to the user.
    pub async fn bump_token_version(pool: &PgPool, id: i64) -> AppResult<()> {
        sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn set_active(pool: &PgPool, id: i64, is_active: bool) -> AppResult<()> {
        sqlx::query("UPDATE users SET is_active = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(is_active)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Records activity unless it was already recorded within `throttle_secs`.
    ///
    /// Returns whether a write happened.
    pub async fn touch_last_seen(pool: &PgPool, id: i64, throttle_secs: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE users SET last_seen_at = NOW()
            WHERE id = $1
              AND (last_seen_at IS NULL
                   OR last_seen_at < NOW() - make_interval(secs => $2::DOUBLE PRECISION))
            ",
        )
        .bind(id)
        .bind(throttle_secs as f64)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Admin listing filtered by name/e-mail search and role, newest first.
    pub async fn search(
        pool: &PgPool,
        search: Option<&str>,
        role: Option<&str>,
        page: PageParams,
    ) -> AppResult<(Vec<User>, i64)> {
        let (limit, offset) = page.limit_offset(20);
        let pattern = search.map(|s| format!("%{s}%"));

        let users = sqlx::query_as::<_, User>(&format!(
            r"
            SELECT {USER_COLUMNS} FROM users
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::TEXT IS NULL OR role = $2)
            ORDER BY created_at DESC, id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(&pattern)
        .bind(role)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM users
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR email ILIKE $1)
              AND ($2::TEXT IS NULL OR role = $2)
            ",
        )
        .bind(&pattern)
        .bind(role)
        .fetch_one(pool)
        .await?;

        Ok((users, total))
    }

    pub async fn count(pool: &PgPool, role: Option<&str>) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::TEXT IS NULL OR role = $1)")
                .bind(role)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(role: &str) -> User {
        User {
            id: 1,
            name: "Amina Diallo".to_string(),
            first_name: Some("Amina".to_string()),
            last_name: Some("Diallo".to_string()),
            email: "amina@example.com".to_string(),
            phone: None,
            address: None,
            password_hash: "$argon2id$secret".to_string(),
            role: role.to_string(),
            role_id: None,
            is_active: true,
            token_version: 4,
            last_seen_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_serialization_hides_credentials() {
        let json = serde_json::to_value(sample_user(roles::CLIENT)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("token_version").is_none());
        assert_eq!(json["email"], "amina@example.com");
    }

    #[test]
    fn test_is_admin() {
        assert!(sample_user(roles::ADMIN).is_admin());
        assert!(!sample_user(roles::MODERATOR).is_admin());
    }
}
