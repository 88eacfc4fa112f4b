//! Platform settings model module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Setting keys read by the platform.
pub mod keys {
    pub const SCORE_WEIGHT_MISSION: &str = "score_weight_mission";
    pub const SCORE_WEIGHT_RATING: &str = "score_weight_rating";
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SystemSetting {
    pub id: i64,
    pub key: String,
    pub value: Option<String>,
    /// `string`, `integer`, `boolean` or `json`.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub value_type: String,
    pub group: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Settings repository for database operations.
pub struct SettingRepository;

impl SettingRepository {
    pub async fn all(pool: &PgPool) -> AppResult<Vec<SystemSetting>> {
        let settings = sqlx::query_as::<_, SystemSetting>(
            r#"
            SELECT id, key, value, type, "group", description, created_at, updated_at
            FROM system_settings
            ORDER BY "group", key
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(settings)
    }

    /// Raw value of a key; `None` when the key is unknown or unset.
    pub async fn value_of(pool: &PgPool, key: &str) -> AppResult<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT value FROM system_settings WHERE key = $1")
                .bind(key)
                .fetch_optional(pool)
                .await?;

        Ok(value.flatten())
    }

    /// Updates an existing key. Returns `false` when the key is unknown.
    pub async fn set_value(pool: &PgPool, key: &str, value: &str) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE system_settings SET value = $2, updated_at = NOW() WHERE key = $1")
                .bind(key)
                .bind(value)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
