//! Badge model module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// Slug of the badge that makes a provider certified.
pub const CERTIFIED_BADGE: &str = "certifie";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub slug: String,
    /// Pro score needed to hold the badge.
    pub threshold: i32,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const BADGE_COLUMNS: &str =
    "b.id, b.name, b.slug, b.threshold, b.icon, b.description, b.created_at, b.updated_at";

/// Badge repository for database operations.
pub struct BadgeRepository;

impl BadgeRepository {
    pub async fn all(pool: &PgPool) -> AppResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges b ORDER BY b.threshold, b.id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(badges)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        name: Option<&str>,
        threshold: Option<i32>,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Option<Badge>> {
        let badge = sqlx::query_as::<_, Badge>(&format!(
            r"
            UPDATE badges AS b SET
                name = COALESCE($2, b.name),
                threshold = COALESCE($3, b.threshold),
                icon = COALESCE($4, b.icon),
                description = COALESCE($5, b.description),
                updated_at = NOW()
            WHERE b.id = $1
            RETURNING {BADGE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(threshold)
        .bind(icon)
        .bind(description)
        .fetch_optional(pool)
        .await?;

        Ok(badge)
    }

    /// Badges currently held by a provider.
    pub async fn held_by(pool: &PgPool, provider_id: i64) -> AppResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(&format!(
            r"
            SELECT {BADGE_COLUMNS} FROM badges b
            JOIN provider_badges pb ON pb.badge_id = b.id
            WHERE pb.provider_id = $1
            ORDER BY b.threshold, b.id
            "
        ))
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

        Ok(badges)
    }

    pub async fn holds(pool: &PgPool, provider_id: i64, slug: &str) -> AppResult<bool> {
        let holds: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM provider_badges pb
                JOIN badges b ON b.id = pb.badge_id
                WHERE pb.provider_id = $1 AND b.slug = $2
            )
            ",
        )
        .bind(provider_id)
        .bind(slug)
        .fetch_one(pool)
        .await?;

        Ok(holds)
    }

    /// Makes the provider hold exactly `badge_ids`.
    pub async fn replace_for_provider(
        pool: &PgPool,
        provider_id: i64,
        badge_ids: &[i64],
    ) -> AppResult<()> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "DELETE FROM provider_badges WHERE provider_id = $1 AND NOT (badge_id = ANY($2))",
        )
        .bind(provider_id)
        .bind(badge_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO provider_badges (provider_id, badge_id)
            SELECT $1, UNNEST($2::BIGINT[])
            ON CONFLICT (provider_id, badge_id) DO NOTHING
            ",
        )
        .bind(provider_id)
        .bind(badge_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }
}
