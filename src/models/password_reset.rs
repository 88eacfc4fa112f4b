//! Password reset token storage. One outstanding token per email.

use chrono::{DateTime, Duration, Utc};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

#[derive(Debug, Clone, FromRow)]
pub struct PasswordReset {
    pub email: String,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    pub fn is_expired_at(&self, now: DateTime<Utc>, ttl_minutes: i64) -> bool {
        now - self.created_at > Duration::minutes(ttl_minutes)
    }
}

/// Password reset repository for database operations.
pub struct PasswordResetRepository;

impl PasswordResetRepository {
    /// Stores a token hash, replacing any previous token for the email.
    pub async fn upsert(pool: &PgPool, email: &str, token_hash: &str) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO password_reset_tokens (email, token_hash, created_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (email) DO UPDATE SET token_hash = EXCLUDED.token_hash, created_at = NOW()
            ",
        )
        .bind(email)
        .bind(token_hash)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn find(pool: &PgPool, email: &str) -> AppResult<Option<PasswordReset>> {
        let reset = sqlx::query_as::<_, PasswordReset>(
            "SELECT email, token_hash, created_at FROM password_reset_tokens WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(reset)
    }

    pub async fn delete(pool: &PgPool, email: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE email = $1")
            .bind(email)
            .execute(pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_expiry() {
        let now = Utc::now();
        let reset = PasswordReset {
            email: "a@b.c".to_string(),
            token_hash: String::new(),
            created_at: now - Duration::minutes(30),
        };

        assert!(!reset.is_expired_at(now, 60));
        assert!(reset.is_expired_at(now, 15));
    }
}
