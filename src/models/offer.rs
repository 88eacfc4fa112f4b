//! Service offer model module.
//!
//! An offer is a job posted by a client that providers apply to.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{AppError, AppResult};
use crate::utils::PageParams;

/// Lifecycle of an offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Active,
    InProgress,
    Completed,
    Cancelled,
}

impl OfferStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OfferStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::Validation(format!("Unknown offer status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub estimated_duration: Option<String>,
    pub material_required: Option<String>,
    pub budget: Option<f64>,
    pub location: Option<String>,
    pub desired_date: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Offer joined with its owner and category.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OfferListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub offer: Offer,
    pub owner_name: String,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub category_icon: Option<String>,
}

/// Offer fields supplied by the owner. `None` keeps the stored value on update.
#[derive(Debug, Clone, Default)]
pub struct OfferFields {
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub estimated_duration: Option<String>,
    pub material_required: Option<String>,
    pub budget: Option<f64>,
    pub location: Option<String>,
    pub desired_date: Option<NaiveDate>,
    pub status: Option<OfferStatus>,
}

/// Public catalogue filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferFilter {
    pub keyword: Option<String>,
    pub category_id: Option<i64>,
    pub location: Option<String>,
    pub min_budget: Option<f64>,
    pub max_budget: Option<f64>,
    pub desired_date: Option<NaiveDate>,
}

const OFFER_COLUMNS: &str = "o.id, o.user_id, o.category_id, o.title, o.description, \
     o.requirements, o.estimated_duration, o.material_required, o.budget, o.location, \
     o.desired_date, o.status, o.created_at, o.updated_at";

const LISTING_SELECT: &str = r"
    c.name AS category_name, c.slug AS category_slug, c.icon AS category_icon, u.name AS owner_name
    FROM service_offers o
    JOIN users u ON u.id = o.user_id
    LEFT JOIN service_categories c ON c.id = o.category_id
";

const CATALOGUE_FILTER: &str = r"
    WHERE o.status = 'active'
      AND ($1::TEXT IS NULL OR o.title ILIKE $1 OR o.description ILIKE $1)
      AND ($2::BIGINT IS NULL OR o.category_id = $2)
      AND ($3::TEXT IS NULL OR o.location ILIKE $3)
      AND ($4::DOUBLE PRECISION IS NULL OR o.budget >= $4)
      AND ($5::DOUBLE PRECISION IS NULL OR o.budget <= $5)
      AND ($6::DATE IS NULL OR o.desired_date = $6)
";

const ADMIN_FILTER: &str = r"
    WHERE ($1::TEXT IS NULL OR o.title ILIKE $1 OR u.name ILIKE $1)
      AND ($2::TEXT IS NULL OR o.status = $2)
";

/// Offer repository for database operations.
pub struct OfferRepository;

impl OfferRepository {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Offer>> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            "SELECT {OFFER_COLUMNS} FROM service_offers o WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(offer)
    }

    pub async fn find_listing(pool: &PgPool, id: i64) -> AppResult<Option<OfferListing>> {
        let offer = sqlx::query_as::<_, OfferListing>(&format!(
            "SELECT {OFFER_COLUMNS}, {LISTING_SELECT} WHERE o.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(offer)
    }

    /// Active offers, newest first.
    pub async fn list_active(
        pool: &PgPool,
        filter: &OfferFilter,
        page: PageParams,
    ) -> AppResult<(Vec<OfferListing>, i64)> {
        let (limit, offset) = page.limit_offset(10);
        let keyword = filter.keyword.as_deref().map(|k| format!("%{k}%"));
        let location = filter.location.as_deref().map(|l| format!("%{l}%"));

        let offers = sqlx::query_as::<_, OfferListing>(&format!(
            r"
            SELECT {OFFER_COLUMNS}, {LISTING_SELECT}
            {CATALOGUE_FILTER}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $7 OFFSET $8
            "
        ))
        .bind(&keyword)
        .bind(filter.category_id)
        .bind(&location)
        .bind(filter.min_budget)
        .bind(filter.max_budget)
        .bind(filter.desired_date)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*) FROM service_offers o
            JOIN users u ON u.id = o.user_id
            {CATALOGUE_FILTER}
            "
        ))
        .bind(&keyword)
        .bind(filter.category_id)
        .bind(&location)
        .bind(filter.min_budget)
        .bind(filter.max_budget)
        .bind(filter.desired_date)
        .fetch_one(pool)
        .await?;

        Ok((offers, total))
    }

    /// Offers owned by a client, newest first.
    pub async fn list_by_owner(pool: &PgPool, user_id: i64) -> AppResult<Vec<OfferListing>> {
        let offers = sqlx::query_as::<_, OfferListing>(&format!(
            r"
            SELECT {OFFER_COLUMNS}, {LISTING_SELECT}
            WHERE o.user_id = $1
            ORDER BY o.created_at DESC, o.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(offers)
    }

    /// Every offer regardless of status, for moderators.
    pub async fn list_all(
        pool: &PgPool,
        search: Option<&str>,
        status: Option<&str>,
        page: PageParams,
    ) -> AppResult<(Vec<OfferListing>, i64)> {
        let (limit, offset) = page.limit_offset(20);
        let pattern = search.map(|s| format!("%{s}%"));

        let offers = sqlx::query_as::<_, OfferListing>(&format!(
            r"
            SELECT {OFFER_COLUMNS}, {LISTING_SELECT}
            {ADMIN_FILTER}
            ORDER BY o.created_at DESC, o.id DESC
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(&pattern)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*) FROM service_offers o
            JOIN users u ON u.id = o.user_id
            {ADMIN_FILTER}
            "
        ))
        .bind(&pattern)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((offers, total))
    }

    pub async fn create(pool: &PgPool, user_id: i64, fields: &OfferFields) -> AppResult<Offer> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            r"
            INSERT INTO service_offers AS o (user_id, category_id, title, description, requirements,
                                             estimated_duration, material_required, budget,
                                             location, desired_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {OFFER_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(fields.category_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.requirements)
        .bind(&fields.estimated_duration)
        .bind(&fields.material_required)
        .bind(fields.budget)
        .bind(&fields.location)
        .bind(fields.desired_date)
        .fetch_one(pool)
        .await?;

        Ok(offer)
    }

    pub async fn update(pool: &PgPool, id: i64, fields: &OfferFields) -> AppResult<Option<Offer>> {
        let offer = sqlx::query_as::<_, Offer>(&format!(
            r"
            UPDATE service_offers AS o SET
                category_id = COALESCE($2, o.category_id),
                title = COALESCE($3, o.title),
                description = COALESCE($4, o.description),
                requirements = COALESCE($5, o.requirements),
                estimated_duration = COALESCE($6, o.estimated_duration),
                material_required = COALESCE($7, o.material_required),
                budget = COALESCE($8, o.budget),
                location = COALESCE($9, o.location),
                desired_date = COALESCE($10, o.desired_date),
                status = COALESCE($11, o.status),
                updated_at = NOW()
            WHERE o.id = $1
            RETURNING {OFFER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.category_id)
        .bind(&fields.title)
        .bind(&fields.description)
        .bind(&fields.requirements)
        .bind(&fields.estimated_duration)
        .bind(&fields.material_required)
        .bind(fields.budget)
        .bind(&fields.location)
        .bind(fields.desired_date)
        .bind(fields.status.map(OfferStatus::as_str))
        .fetch_optional(pool)
        .await?;

        Ok(offer)
    }

    pub async fn set_status<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        status: OfferStatus,
    ) -> AppResult<()> {
        sqlx::query("UPDATE service_offers SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM service_offers WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count(pool: &PgPool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM service_offers")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_status_parse() {
        assert_eq!("in_progress".parse::<OfferStatus>().unwrap(), OfferStatus::InProgress);
        assert_eq!("cancelled".parse::<OfferStatus>().unwrap(), OfferStatus::Cancelled);
        assert!(matches!(
            "open".parse::<OfferStatus>(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_offer_status_serde_matches_storage() {
        for status in [
            OfferStatus::Active,
            OfferStatus::InProgress,
            OfferStatus::Completed,
            OfferStatus::Cancelled,
        ] {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
            assert_eq!(status.to_string(), status.as_str());
        }
    }
}
