//! Provider profile model module.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::AppResult;
use crate::utils::PageParams;

/// Provider profile row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub city: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Option<String>,
    pub description: Option<String>,
    pub experience: Option<String>,
    pub diplomas: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Weekly calendar keyed by lowercase weekday name.
    pub availabilities: Value,
    pub is_available: bool,
    pub is_visible: bool,
    pub rating: f64,
    pub missions_count: i32,
    pub grade_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Provider joined with owner identity, category and grade names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProviderListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub provider: Provider,
    pub name: String,
    pub email: String,
    pub category_name: Option<String>,
    pub grade_name: Option<String>,
    pub grade_slug: Option<String>,
}

/// Editable profile fields. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProviderChanges {
    pub category_id: Option<i64>,
    pub city: Option<String>,
    pub hourly_rate: Option<f64>,
    pub skills: Option<String>,
    pub description: Option<String>,
    pub experience: Option<String>,
    pub diplomas: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub is_available: Option<bool>,
}

/// Public directory filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderFilter {
    pub keyword: Option<String>,
    pub category_id: Option<i64>,
    pub location: Option<String>,
    pub min_rating: Option<f64>,
}

const PROVIDER_COLUMNS: &str = "p.id, p.user_id, p.category_id, p.city, p.hourly_rate, p.skills, \
     p.description, p.experience, p.diplomas, p.birth_date, p.availabilities, p.is_available, \
     p.is_visible, p.rating, p.missions_count, p.grade_id, p.created_at, p.updated_at";

const LISTING_JOINS: &str = r"
    FROM providers p
    JOIN users u ON u.id = p.user_id
    LEFT JOIN service_categories c ON c.id = p.category_id
    LEFT JOIN grades g ON g.id = p.grade_id
";

const DIRECTORY_FILTER: &str = r"
    WHERE p.is_visible AND u.is_active
      AND ($1::TEXT IS NULL OR u.name ILIKE $1 OR p.skills ILIKE $1 OR p.description ILIKE $1)
      AND ($2::BIGINT IS NULL OR p.category_id = $2)
      AND ($3::TEXT IS NULL OR p.city ILIKE $3)
      AND ($4::DOUBLE PRECISION IS NULL OR p.rating >= $4)
";

/// Provider repository for database operations.
pub struct ProviderRepository;

impl ProviderRepository {
    pub async fn find_by_user_id(pool: &PgPool, user_id: i64) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers p WHERE p.user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(provider)
    }

    /// Public profile of the provider account `user_id`.
    pub async fn find_listing(pool: &PgPool, user_id: i64) -> AppResult<Option<ProviderListing>> {
        let listing = sqlx::query_as::<_, ProviderListing>(&format!(
            r"
            SELECT {PROVIDER_COLUMNS}, u.name, u.email,
                   c.name AS category_name, g.name AS grade_name, g.slug AS grade_slug
            {LISTING_JOINS}
            WHERE p.user_id = $1
            "
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(listing)
    }

    /// Creates an empty profile for a freshly registered provider.
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        user_id: i64,
        changes: &ProviderChanges,
    ) -> AppResult<Provider> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            INSERT INTO providers AS p (user_id, category_id, city, hourly_rate, skills,
                                        description, experience, diplomas, birth_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(changes.category_id)
        .bind(&changes.city)
        .bind(changes.hourly_rate)
        .bind(&changes.skills)
        .bind(&changes.description)
        .bind(&changes.experience)
        .bind(&changes.diplomas)
        .bind(changes.birth_date)
        .fetch_one(executor)
        .await?;

        Ok(provider)
    }

    pub async fn update_profile(
        pool: &PgPool,
        user_id: i64,
        changes: &ProviderChanges,
    ) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            UPDATE providers AS p SET
                category_id = COALESCE($2, p.category_id),
                city = COALESCE($3, p.city),
                hourly_rate = COALESCE($4, p.hourly_rate),
                skills = COALESCE($5, p.skills),
                description = COALESCE($6, p.description),
                experience = COALESCE($7, p.experience),
                diplomas = COALESCE($8, p.diplomas),
                birth_date = COALESCE($9, p.birth_date),
                is_available = COALESCE($10, p.is_available),
                updated_at = NOW()
            WHERE p.user_id = $1
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(changes.category_id)
        .bind(&changes.city)
        .bind(changes.hourly_rate)
        .bind(&changes.skills)
        .bind(&changes.description)
        .bind(&changes.experience)
        .bind(&changes.diplomas)
        .bind(changes.birth_date)
        .bind(changes.is_available)
        .fetch_optional(pool)
        .await?;

        Ok(provider)
    }

    pub async fn set_availabilities(
        pool: &PgPool,
        user_id: i64,
        availabilities: &Value,
    ) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            UPDATE providers AS p SET availabilities = $2, updated_at = NOW()
            WHERE p.user_id = $1
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(availabilities)
        .fetch_optional(pool)
        .await?;

        Ok(provider)
    }

    /// Flips directory visibility and returns the new value.
    pub async fn toggle_visibility(pool: &PgPool, user_id: i64) -> AppResult<Option<bool>> {
        let visible: Option<bool> = sqlx::query_scalar(
            r"
            UPDATE providers SET is_visible = NOT is_visible, updated_at = NOW()
            WHERE user_id = $1
            RETURNING is_visible
            ",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(visible)
    }

    /// Visible providers, best rated first.
    pub async fn list(
        pool: &PgPool,
        filter: &ProviderFilter,
        page: PageParams,
    ) -> AppResult<(Vec<ProviderListing>, i64)> {
        let (limit, offset) = page.limit_offset(12);
        let keyword = filter.keyword.as_deref().map(|k| format!("%{k}%"));
        let location = filter.location.as_deref().map(|l| format!("%{l}%"));

        let providers = sqlx::query_as::<_, ProviderListing>(&format!(
            r"
            SELECT {PROVIDER_COLUMNS}, u.name, u.email,
                   c.name AS category_name, g.name AS grade_name, g.slug AS grade_slug
            {LISTING_JOINS}
            {DIRECTORY_FILTER}
            ORDER BY p.rating DESC, p.missions_count DESC, p.id DESC
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(&keyword)
        .bind(filter.category_id)
        .bind(&location)
        .bind(filter.min_rating)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) {LISTING_JOINS} {DIRECTORY_FILTER}"
        ))
        .bind(&keyword)
        .bind(filter.category_id)
        .bind(&location)
        .bind(filter.min_rating)
        .fetch_one(pool)
        .await?;

        Ok((providers, total))
    }

    pub async fn all(pool: &PgPool) -> AppResult<Vec<Provider>> {
        let providers = sqlx::query_as::<_, Provider>(&format!(
            "SELECT {PROVIDER_COLUMNS} FROM providers p ORDER BY p.id"
        ))
        .fetch_all(pool)
        .await?;

        Ok(providers)
    }

    /// Adds one completed mission and returns the refreshed profile.
    pub async fn increment_missions<'e>(
        executor: impl PgExecutor<'e>,
        user_id: i64,
    ) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            UPDATE providers AS p SET missions_count = p.missions_count + 1, updated_at = NOW()
            WHERE p.user_id = $1
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(provider)
    }

    /// Recomputes the average rating from received reviews, rounded to one decimal.
    pub async fn refresh_rating(pool: &PgPool, user_id: i64) -> AppResult<Option<Provider>> {
        let provider = sqlx::query_as::<_, Provider>(&format!(
            r"
            UPDATE providers AS p SET
                rating = COALESCE(
                    (SELECT ROUND(AVG(r.rating)::NUMERIC, 1)::DOUBLE PRECISION
                     FROM reviews r WHERE r.user_id = p.user_id),
                    0),
                updated_at = NOW()
            WHERE p.user_id = $1
            RETURNING {PROVIDER_COLUMNS}
            "
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(provider)
    }

    pub async fn set_grade(
        pool: &PgPool,
        provider_id: i64,
        grade_id: Option<i64>,
    ) -> AppResult<()> {
        sqlx::query("UPDATE providers SET grade_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(provider_id)
            .bind(grade_id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Clears the grade only while the provider still holds `grade_id`.
    pub async fn clear_grade_if(
        pool: &PgPool,
        provider_id: i64,
        grade_id: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE providers SET grade_id = NULL, updated_at = NOW()
            WHERE id = $1 AND grade_id = $2
            ",
        )
        .bind(provider_id)
        .bind(grade_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
