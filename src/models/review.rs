//! Review model module.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

/// How long a reviewer may still edit a review.
pub const REVIEW_EDIT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Review {
    pub id: i64,
    /// The reviewed provider.
    pub user_id: i64,
    pub reviewer_id: i64,
    pub service_offer_id: i64,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Review {
    /// Whether the edit window is still open at `now`.
    pub fn is_editable_at(&self, now: DateTime<Utc>) -> bool {
        now < self.created_at + Duration::hours(REVIEW_EDIT_WINDOW_HOURS)
    }
}

/// Review with the names on both sides and the offer title.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReviewListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub review: Review,
    pub reviewer_name: String,
    pub reviewed_name: String,
    pub offer_title: String,
}

const REVIEW_COLUMNS: &str = "r.id, r.user_id, r.reviewer_id, r.service_offer_id, r.rating, \
     r.comment, r.created_at, r.updated_at";

const LISTING_SELECT: &str = r"
    rv.name AS reviewer_name, ru.name AS reviewed_name, o.title AS offer_title
    FROM reviews r
    JOIN users rv ON rv.id = r.reviewer_id
    JOIN users ru ON ru.id = r.user_id
    JOIN service_offers o ON o.id = r.service_offer_id
";

/// Review repository for database operations.
pub struct ReviewRepository;

impl ReviewRepository {
    pub async fn find_by_id(pool: &PgPool, id: i64) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews r WHERE r.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(review)
    }

    /// Reviews received by a provider, newest first.
    pub async fn received_by(pool: &PgPool, user_id: i64) -> AppResult<Vec<ReviewListing>> {
        let reviews = sqlx::query_as::<_, ReviewListing>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}, {LISTING_SELECT}
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(reviews)
    }

    /// Reviews written by a user, newest first.
    pub async fn written_by(pool: &PgPool, reviewer_id: i64) -> AppResult<Vec<ReviewListing>> {
        let reviews = sqlx::query_as::<_, ReviewListing>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}, {LISTING_SELECT}
            WHERE r.reviewer_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            "
        ))
        .bind(reviewer_id)
        .fetch_all(pool)
        .await?;

        Ok(reviews)
    }

    /// Average rating received, rounded to one decimal; zero without reviews.
    pub async fn average_for(pool: &PgPool, user_id: i64) -> AppResult<f64> {
        let average: f64 = sqlx::query_scalar(
            r"
            SELECT COALESCE(ROUND(AVG(rating)::NUMERIC, 1), 0)::DOUBLE PRECISION
            FROM reviews WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(average)
    }

    pub async fn exists_for_offer(
        pool: &PgPool,
        reviewer_id: i64,
        offer_id: i64,
    ) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM reviews WHERE reviewer_id = $1 AND service_offer_id = $2)",
        )
        .bind(reviewer_id)
        .bind(offer_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    pub async fn create(
        pool: &PgPool,
        user_id: i64,
        reviewer_id: i64,
        offer_id: i64,
        rating: i16,
        comment: Option<&str>,
    ) -> AppResult<Review> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r"
            INSERT INTO reviews AS r (user_id, reviewer_id, service_offer_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(reviewer_id)
        .bind(offer_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(pool)
        .await?;

        Ok(review)
    }

    /// Partial update. `comment: Some(None)` clears the comment.
    #[allow(clippy::option_option)]
    pub async fn update(
        pool: &PgPool,
        id: i64,
        rating: Option<i16>,
        comment: Option<Option<&str>>,
    ) -> AppResult<Option<Review>> {
        let review = sqlx::query_as::<_, Review>(&format!(
            r"
            UPDATE reviews AS r SET
                rating = COALESCE($2, r.rating),
                comment = CASE WHEN $4 THEN $3 ELSE r.comment END,
                updated_at = NOW()
            WHERE r.id = $1
            RETURNING {REVIEW_COLUMNS}
            "
        ))
        .bind(id)
        .bind(rating)
        .bind(comment.flatten())
        .bind(comment.is_some())
        .fetch_optional(pool)
        .await?;

        Ok(review)
    }

    pub async fn delete(pool: &PgPool, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review_created_at(created_at: DateTime<Utc>) -> Review {
        Review {
            id: 1,
            user_id: 2,
            reviewer_id: 3,
            service_offer_id: 4,
            rating: 5,
            comment: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn test_review_editable_within_window() {
        let now = Utc::now();
        let review = review_created_at(now - Duration::hours(23));
        assert!(review.is_editable_at(now));
    }

    #[test]
    fn test_review_locked_after_window() {
        let now = Utc::now();
        assert!(!review_created_at(now - Duration::hours(24)).is_editable_at(now));
        assert!(!review_created_at(now - Duration::days(3)).is_editable_at(now));
    }
}
