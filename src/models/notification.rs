//! In-app notification model module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Notification kinds emitted by the platform.
pub mod kinds {
    pub const NEW_APPLICATION: &str = "new_application";
    pub const NEW_INVITATION: &str = "new_invitation";
    pub const REQUEST_STATUS: &str = "request_status_changed";
    pub const ACCOUNT_WARNING: &str = "account_warning";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: i64,
    pub kind: String,
    pub data: Value,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Notification repository for database operations.
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        kind: &str,
        data: &Value,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r"
            INSERT INTO notifications (id, user_id, kind, data)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, kind, data, read_at, created_at
            ",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(kind)
        .bind(data)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }

    pub async fn latest(pool: &PgPool, user_id: i64, limit: i64) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r"
            SELECT id, user_id, kind, data, read_at, created_at FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(notifications)
    }

    pub async fn unread_count(pool: &PgPool, user_id: i64) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Marks one of the user's notifications read. `false` when it is not theirs.
    pub async fn mark_read(pool: &PgPool, user_id: i64, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE notifications SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn mark_all_read(pool: &PgPool, user_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read_at = NOW() WHERE user_id = $1 AND read_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, user_id: i64, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
