//! Provider grade model module.
//!
//! Grades are tiers (bronze, silver, gold) reached through missions, rating
//! and seniority. Every change of a provider's grade is recorded as an
//! attribution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub color: String,
    pub bg_color: String,
    pub border_color: String,
    pub icon: String,
    pub missions_threshold: i32,
    pub rating_threshold: f64,
    pub seniority_threshold_months: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Grade definition supplied by an admin. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default)]
pub struct GradeFields {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub color: Option<String>,
    pub bg_color: Option<String>,
    pub border_color: Option<String>,
    pub icon: Option<String>,
    pub missions_threshold: Option<i32>,
    pub rating_threshold: Option<f64>,
    pub seniority_threshold_months: Option<i32>,
}

/// How a grade reached a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionKind {
    Automatic,
    Manual,
}

impl AttributionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GradeAttribution {
    pub id: i64,
    pub provider_id: i64,
    pub grade_id: i64,
    pub assigned_by: Option<i64>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

/// Attribution with provider and grade display fields.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AttributionListing {
    pub id: i64,
    pub provider_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub grade_id: i64,
    pub grade_name: String,
    pub grade_color: String,
    pub assigned_by: Option<i64>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

const GRADE_COLUMNS: &str = "id, name, slug, color, bg_color, border_color, icon, \
     missions_threshold, rating_threshold, seniority_threshold_months, created_at, updated_at";

/// Grade repository for database operations.
pub struct GradeRepository;

impl GradeRepository {
    /// Lowest tier first.
    pub async fn all(pool: &PgPool) -> AppResult<Vec<Grade>> {
        let grades = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades ORDER BY missions_threshold, rating_threshold, id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(grades)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Grade>> {
        let grade = sqlx::query_as::<_, Grade>(&format!(
            "SELECT {GRADE_COLUMNS} FROM grades WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(grade)
    }

    pub async fn slug_taken(pool: &PgPool, slug: &str, except_id: Option<i64>) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM grades WHERE slug = $1 AND ($2::BIGINT IS NULL OR id <> $2)
            )
            ",
        )
        .bind(slug)
        .bind(except_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    /// Inserts a grade. Missing styling fields fall back to column defaults.
    pub async fn create(pool: &PgPool, fields: &GradeFields) -> AppResult<Grade> {
        let grade = sqlx::query_as::<_, Grade>(&format!(
            r"
            INSERT INTO grades (name, slug, missions_threshold, rating_threshold,
                                seniority_threshold_months, color, bg_color, border_color, icon)
            VALUES ($1, $2, COALESCE($3, 0), COALESCE($4, 0), COALESCE($5, 0),
                    COALESCE($6, 'text-gray-500'), COALESCE($7, 'bg-gray-500/20'),
                    COALESCE($8, 'border-gray-500/30'), COALESCE($9, 'shield'))
            RETURNING {GRADE_COLUMNS}
            "
        ))
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.missions_threshold)
        .bind(fields.rating_threshold)
        .bind(fields.seniority_threshold_months)
        .bind(&fields.color)
        .bind(&fields.bg_color)
        .bind(&fields.border_color)
        .bind(&fields.icon)
        .fetch_one(pool)
        .await?;

        Ok(grade)
    }

    pub async fn update(pool: &PgPool, id: i64, fields: &GradeFields) -> AppResult<Option<Grade>> {
        let grade = sqlx::query_as::<_, Grade>(&format!(
            r"
            UPDATE grades SET
                name = COALESCE($2, name),
                slug = COALESCE($3, slug),
                missions_threshold = COALESCE($4, missions_threshold),
                rating_threshold = COALESCE($5, rating_threshold),
                seniority_threshold_months = COALESCE($6, seniority_threshold_months),
                color = COALESCE($7, color),
                bg_color = COALESCE($8, bg_color),
                border_color = COALESCE($9, border_color),
                icon = COALESCE($10, icon),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GRADE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&fields.name)
        .bind(&fields.slug)
        .bind(fields.missions_threshold)
        .bind(fields.rating_threshold)
        .bind(fields.seniority_threshold_months)
        .bind(&fields.color)
        .bind(&fields.bg_color)
        .bind(&fields.border_color)
        .bind(&fields.icon)
        .fetch_optional(pool)
        .await?;

        Ok(grade)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM grades WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Grade attribution repository for database operations.
pub struct AttributionRepository;

impl AttributionRepository {
    pub async fn record(
        pool: &PgPool,
        provider_id: i64,
        grade_id: i64,
        assigned_by: Option<i64>,
        kind: AttributionKind,
    ) -> AppResult<GradeAttribution> {
        let attribution = sqlx::query_as::<_, GradeAttribution>(
            r"
            INSERT INTO grade_attributions (provider_id, grade_id, assigned_by, kind)
            VALUES ($1, $2, $3, $4)
            RETURNING id, provider_id, grade_id, assigned_by, kind, created_at
            ",
        )
        .bind(provider_id)
        .bind(grade_id)
        .bind(assigned_by)
        .bind(kind.as_str())
        .fetch_one(pool)
        .await?;

        Ok(attribution)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<GradeAttribution>> {
        let attribution = sqlx::query_as::<_, GradeAttribution>(
            r"
            SELECT id, provider_id, grade_id, assigned_by, kind, created_at
            FROM grade_attributions WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(attribution)
    }

    pub async fn recent(pool: &PgPool, limit: i64) -> AppResult<Vec<AttributionListing>> {
        let attributions = sqlx::query_as::<_, AttributionListing>(
            r"
            SELECT a.id, a.provider_id, u.id AS user_id, u.name AS user_name,
                   a.grade_id, g.name AS grade_name, g.color AS grade_color,
                   a.assigned_by, a.kind, a.created_at
            FROM grade_attributions a
            JOIN providers p ON p.id = a.provider_id
            JOIN users u ON u.id = p.user_id
            JOIN grades g ON g.id = a.grade_id
            ORDER BY a.created_at DESC, a.id DESC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(attributions)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM grade_attributions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
