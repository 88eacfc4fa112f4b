//! Service category model module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub icon: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Category with the number of offers filed under it.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub offers_count: i64,
}

const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.slug, c.icon, c.description, c.created_at, c.updated_at";

/// Category repository for database operations.
pub struct CategoryRepository;

impl CategoryRepository {
    /// All categories in alphabetical order.
    pub async fn all(pool: &PgPool) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM service_categories c ORDER BY c.name"
        ))
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM service_categories c WHERE c.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    /// Admin listing; `popular` orders by offer count instead of name.
    pub async fn with_counts(
        pool: &PgPool,
        search: Option<&str>,
        popular: bool,
    ) -> AppResult<Vec<CategoryWithCount>> {
        let order = if popular {
            "offers_count DESC, c.name"
        } else {
            "c.name"
        };

        let categories = sqlx::query_as::<_, CategoryWithCount>(&format!(
            r"
            SELECT {CATEGORY_COLUMNS}, COUNT(o.id) AS offers_count
            FROM service_categories c
            LEFT JOIN service_offers o ON o.category_id = c.id
            WHERE ($1::TEXT IS NULL OR c.name ILIKE $1)
            GROUP BY c.id
            ORDER BY {order}
            "
        ))
        .bind(search.map(|s| format!("%{s}%")))
        .fetch_all(pool)
        .await?;

        Ok(categories)
    }

    pub async fn name_taken(pool: &PgPool, name: &str, except_id: Option<i64>) -> AppResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM service_categories
                WHERE LOWER(name) = LOWER($1) AND ($2::BIGINT IS NULL OR id <> $2)
            )
            ",
        )
        .bind(name)
        .bind(except_id)
        .fetch_one(pool)
        .await?;

        Ok(taken)
    }

    pub async fn create(
        pool: &PgPool,
        name: &str,
        slug: &str,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Category> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r"
            INSERT INTO service_categories AS c (name, slug, icon, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(name)
        .bind(slug)
        .bind(icon)
        .bind(description)
        .fetch_one(pool)
        .await?;

        Ok(category)
    }

    pub async fn update(
        pool: &PgPool,
        id: i64,
        name: &str,
        slug: &str,
        icon: Option<&str>,
        description: Option<&str>,
    ) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            r"
            UPDATE service_categories AS c SET
                name = $2, slug = $3,
                icon = COALESCE($4, c.icon),
                description = COALESCE($5, c.description),
                updated_at = NOW()
            WHERE c.id = $1
            RETURNING {CATEGORY_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(slug)
        .bind(icon)
        .bind(description)
        .fetch_optional(pool)
        .await?;

        Ok(category)
    }

    pub async fn offers_count(pool: &PgPool, id: i64) -> AppResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM service_offers WHERE category_id = $1")
                .bind(id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM service_categories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
