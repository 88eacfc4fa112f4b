//! Audit trail of security-relevant user actions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;
use crate::utils::PageParams;

/// Action names written to the audit trail.
pub mod actions {
    pub const LOGIN: &str = "login";
    pub const LOGIN_FAILED: &str = "login_failed";
    pub const LOGOUT: &str = "logout";
    pub const REGISTER: &str = "register";
    pub const UPDATE_PASSWORD: &str = "update_password";
    pub const RESET_PASSWORD: &str = "reset_password";
    pub const WARN: &str = "warn";
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ActivityLog {
    pub id: i64,
    pub user_id: Option<i64>,
    pub user_name: Option<String>,
    pub action: String,
    pub description: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client metadata attached to a log entry.
#[derive(Debug, Clone, Default)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Repeated failed logins from one address.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FailedLoginAlert {
    pub ip_address: Option<String>,
    pub attempts: i64,
    pub last_attempt: DateTime<Utc>,
}

/// Activity log repository for database operations.
pub struct ActivityLogRepository;

impl ActivityLogRepository {
    pub async fn record(
        pool: &PgPool,
        user_id: Option<i64>,
        action: &str,
        description: &str,
        origin: &RequestOrigin,
    ) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO activity_logs (user_id, action, description, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(user_id)
        .bind(action)
        .bind(description)
        .bind(&origin.ip_address)
        .bind(&origin.user_agent)
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn latest(pool: &PgPool, page: PageParams) -> AppResult<(Vec<ActivityLog>, i64)> {
        let (limit, offset) = page.limit_offset(20);

        let logs = sqlx::query_as::<_, ActivityLog>(
            r"
            SELECT l.id, l.user_id, u.name AS user_name, l.action, l.description,
                   l.ip_address, l.user_agent, l.created_at
            FROM activity_logs l
            LEFT JOIN users u ON u.id = l.user_id
            ORDER BY l.created_at DESC, l.id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(pool)
            .await?;

        Ok((logs, total))
    }

    /// Failed logins since `since`, grouped by address, worst first.
    pub async fn failed_logins_since(
        pool: &PgPool,
        since: DateTime<Utc>,
    ) -> AppResult<Vec<FailedLoginAlert>> {
        let alerts = sqlx::query_as::<_, FailedLoginAlert>(
            r"
            SELECT ip_address, COUNT(*) AS attempts, MAX(created_at) AS last_attempt
            FROM activity_logs
            WHERE action = $1 AND created_at >= $2
            GROUP BY ip_address
            ORDER BY attempts DESC, last_attempt DESC
            ",
        )
        .bind(actions::LOGIN_FAILED)
        .bind(since)
        .fetch_all(pool)
        .await?;

        Ok(alerts)
    }
}
