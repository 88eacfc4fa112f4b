//! Service request model module.
//!
//! A request links a provider to an offer. When the provider created it, it
//! is an application; when the offer owner created it, it is an invitation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};

use crate::error::{AppError, AppResult};
use crate::utils::PageParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// States a request must currently be in to move to `self`.
    pub const fn allowed_from(self) -> &'static [Self] {
        match self {
            Self::Accepted | Self::Rejected => &[Self::Pending],
            Self::Cancelled => &[Self::Pending, Self::Accepted],
            Self::Completed => &[Self::Accepted],
            Self::Pending => &[],
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "rejected" => Ok(Self::Rejected),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(AppError::Validation(format!(
                "Unknown request status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ServiceRequest {
    pub id: i64,
    pub service_offer_id: i64,
    /// The provider the request concerns.
    pub user_id: i64,
    pub created_by_id: i64,
    pub message: Option<String>,
    pub status: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRequest {
    /// The provider applied on their own initiative.
    pub fn is_application(&self) -> bool {
        self.created_by_id == self.user_id
    }

    /// Whether `actor_id` may move this request to `target`.
    ///
    /// `offer_owner_id` is the client who posted the offer.
    pub fn can_transition(
        &self,
        actor_id: i64,
        offer_owner_id: i64,
        target: RequestStatus,
    ) -> bool {
        match target {
            RequestStatus::Accepted | RequestStatus::Rejected => {
                if self.is_application() {
                    actor_id == offer_owner_id
                } else {
                    actor_id == self.user_id
                }
            }
            RequestStatus::Cancelled => actor_id == self.created_by_id || actor_id == self.user_id,
            RequestStatus::Completed => {
                self.status == RequestStatus::Accepted.as_str()
                    && (actor_id == offer_owner_id || actor_id == self.user_id)
            }
            RequestStatus::Pending => false,
        }
    }

    /// The participant to notify after `actor_id` acts on the request.
    pub fn counterpart(&self, actor_id: i64, offer_owner_id: i64) -> i64 {
        if actor_id == self.user_id {
            offer_owner_id
        } else {
            self.user_id
        }
    }
}

/// Request joined with its offer and the three people involved.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RequestListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub request: ServiceRequest,
    pub offer_title: String,
    pub offer_status: String,
    pub offer_owner_id: i64,
    pub offer_owner_name: String,
    pub category_name: Option<String>,
    pub provider_name: String,
    pub creator_name: String,
}

const REQUEST_COLUMNS: &str = "sr.id, sr.service_offer_id, sr.user_id, sr.created_by_id, \
     sr.message, sr.status, sr.is_read, sr.created_at, sr.updated_at";

const LISTING_SELECT: &str = r"
    o.title AS offer_title, o.status AS offer_status, o.user_id AS offer_owner_id,
    ou.name AS offer_owner_name, c.name AS category_name,
    pu.name AS provider_name, cu.name AS creator_name
    FROM service_requests sr
    JOIN service_offers o ON o.id = sr.service_offer_id
    JOIN users ou ON ou.id = o.user_id
    JOIN users pu ON pu.id = sr.user_id
    JOIN users cu ON cu.id = sr.created_by_id
    LEFT JOIN service_categories c ON c.id = o.category_id
";

const CLIENT_SCOPE: &str = "WHERE o.user_id = $1 OR sr.created_by_id = $1";

const MISSIONS_FILTER: &str = r"
    WHERE ($1::TEXT IS NULL OR o.title ILIKE $1 OR pu.name ILIKE $1 OR ou.name ILIKE $1)
      AND ($2::TEXT IS NULL OR sr.status = $2)
";

/// Service request repository for database operations.
pub struct ServiceRequestRepository;

impl ServiceRequestRepository {
    pub async fn find_listing(pool: &PgPool, id: i64) -> AppResult<Option<RequestListing>> {
        let request = sqlx::query_as::<_, RequestListing>(&format!(
            "SELECT {REQUEST_COLUMNS}, {LISTING_SELECT} WHERE sr.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    pub async fn exists(pool: &PgPool, offer_id: i64, provider_id: i64) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM service_requests WHERE service_offer_id = $1 AND user_id = $2
            )
            ",
        )
        .bind(offer_id)
        .bind(provider_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }

    /// Inserts the request. `None` when the provider is already linked to the offer.
    pub async fn create(
        pool: &PgPool,
        offer_id: i64,
        provider_id: i64,
        created_by_id: i64,
        message: Option<&str>,
    ) -> AppResult<Option<ServiceRequest>> {
        let request = sqlx::query_as::<_, ServiceRequest>(&format!(
            r"
            INSERT INTO service_requests AS sr (service_offer_id, user_id, created_by_id, message)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (service_offer_id, user_id) DO NOTHING
            RETURNING {REQUEST_COLUMNS}
            "
        ))
        .bind(offer_id)
        .bind(provider_id)
        .bind(created_by_id)
        .bind(message)
        .fetch_optional(pool)
        .await?;

        Ok(request)
    }

    /// Moves the request to `status` if it is still in one of the states
    /// `status` can be reached from. Returns `false` when nothing changed.
    pub async fn transition<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        status: RequestStatus,
    ) -> AppResult<bool> {
        let from: Vec<&str> = status
            .allowed_from()
            .iter()
            .map(|s| s.as_str())
            .collect();

        let result = sqlx::query(
            r"
            UPDATE service_requests SET status = $2, updated_at = NOW()
            WHERE id = $1 AND status = ANY($3)
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(&from)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Applications to the client's offers plus the invitations they sent.
    pub async fn for_client(
        pool: &PgPool,
        user_id: i64,
        page: PageParams,
    ) -> AppResult<(Vec<RequestListing>, i64)> {
        let (limit, offset) = page.limit_offset(15);

        let requests = sqlx::query_as::<_, RequestListing>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}, {LISTING_SELECT}
            {CLIENT_SCOPE}
            ORDER BY sr.created_at DESC, sr.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            r"
            SELECT COUNT(*) FROM service_requests sr
            JOIN service_offers o ON o.id = sr.service_offer_id
            {CLIENT_SCOPE}
            "
        ))
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok((requests, total))
    }

    /// Requests addressed to or created by the provider.
    pub async fn for_provider(
        pool: &PgPool,
        user_id: i64,
        page: PageParams,
    ) -> AppResult<(Vec<RequestListing>, i64)> {
        let (limit, offset) = page.limit_offset(15);

        let requests = sqlx::query_as::<_, RequestListing>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}, {LISTING_SELECT}
            WHERE sr.user_id = $1
            ORDER BY sr.created_at DESC, sr.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM service_requests WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        Ok((requests, total))
    }

    /// Marks applications received on the client's offers as read.
    pub async fn mark_applications_read(pool: &PgPool, owner_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE service_requests sr SET is_read = TRUE
            FROM service_offers o
            WHERE o.id = sr.service_offer_id
              AND o.user_id = $1
              AND sr.created_by_id <> $1
              AND NOT sr.is_read
            ",
        )
        .bind(owner_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marks invitations received by the provider as read.
    pub async fn mark_invitations_read(pool: &PgPool, provider_id: i64) -> AppResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE service_requests SET is_read = TRUE
            WHERE user_id = $1 AND created_by_id <> $1 AND NOT is_read
            ",
        )
        .bind(provider_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Unread `(applications, invitations)` for the user.
    pub async fn unread_counts(pool: &PgPool, user_id: i64) -> AppResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r"
            SELECT
                (SELECT COUNT(*) FROM service_requests sr
                 JOIN service_offers o ON o.id = sr.service_offer_id
                 WHERE o.user_id = $1 AND sr.created_by_id <> $1 AND NOT sr.is_read),
                (SELECT COUNT(*) FROM service_requests
                 WHERE user_id = $1 AND created_by_id <> $1 AND NOT is_read)
            ",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await?;

        Ok(counts)
    }

    /// Every request, for moderators.
    pub async fn list_all(
        pool: &PgPool,
        search: Option<&str>,
        status: Option<&str>,
        page: PageParams,
    ) -> AppResult<(Vec<RequestListing>, i64)> {
        let (limit, offset) = page.limit_offset(20);
        let pattern = search.map(|s| format!("%{s}%"));

        let requests = sqlx::query_as::<_, RequestListing>(&format!(
            r"
            SELECT {REQUEST_COLUMNS}, {LISTING_SELECT}
            {MISSIONS_FILTER}
            ORDER BY sr.created_at DESC, sr.id DESC
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
            SELECT COUNT(*)
            FROM service_requests sr
            JOIN service_offers o ON o.id = sr.service_offer_id
            JOIN users ou ON ou.id = o.user_id
            JOIN users pu ON pu.id = sr.user_id
            {MISSIONS_FILTER}
            "
        ))
        .bind(&pattern)
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((requests, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i64 = 10;
    const PROVIDER: i64 = 20;
    const STRANGER: i64 = 30;

    fn request(created_by_id: i64, status: RequestStatus) -> ServiceRequest {
        ServiceRequest {
            id: 1,
            service_offer_id: 5,
            user_id: PROVIDER,
            created_by_id,
            message: None,
            status: status.as_str().to_string(),
            is_read: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_application_accepted_by_offer_owner_only() {
        let application = request(PROVIDER, RequestStatus::Pending);
        assert!(application.is_application());
        assert!(application.can_transition(OWNER, OWNER, RequestStatus::Accepted));
        assert!(application.can_transition(OWNER, OWNER, RequestStatus::Rejected));
        assert!(!application.can_transition(PROVIDER, OWNER, RequestStatus::Accepted));
        assert!(!application.can_transition(STRANGER, OWNER, RequestStatus::Rejected));
    }

    #[test]
    fn test_invitation_accepted_by_invited_provider_only() {
        let invitation = request(OWNER, RequestStatus::Pending);
        assert!(!invitation.is_application());
        assert!(invitation.can_transition(PROVIDER, OWNER, RequestStatus::Accepted));
        assert!(!invitation.can_transition(OWNER, OWNER, RequestStatus::Accepted));
        assert!(!invitation.can_transition(STRANGER, OWNER, RequestStatus::Rejected));
    }

    #[test]
    fn test_cancel_by_creator_or_provider() {
        let invitation = request(OWNER, RequestStatus::Pending);
        assert!(invitation.can_transition(OWNER, OWNER, RequestStatus::Cancelled));
        assert!(invitation.can_transition(PROVIDER, OWNER, RequestStatus::Cancelled));
        assert!(!invitation.can_transition(STRANGER, OWNER, RequestStatus::Cancelled));

        // The offer owner did not create an application and is not its provider.
        let application = request(PROVIDER, RequestStatus::Pending);
        assert!(!application.can_transition(OWNER, OWNER, RequestStatus::Cancelled));
    }

    #[test]
    fn test_complete_requires_accepted() {
        let pending = request(PROVIDER, RequestStatus::Pending);
        assert!(!pending.can_transition(OWNER, OWNER, RequestStatus::Completed));

        let accepted = request(PROVIDER, RequestStatus::Accepted);
        assert!(accepted.can_transition(OWNER, OWNER, RequestStatus::Completed));
        assert!(accepted.can_transition(PROVIDER, OWNER, RequestStatus::Completed));
        assert!(!accepted.can_transition(STRANGER, OWNER, RequestStatus::Completed));
    }

    #[test]
    fn test_pending_is_never_a_target() {
        let application = request(PROVIDER, RequestStatus::Accepted);
        assert!(!application.can_transition(OWNER, OWNER, RequestStatus::Pending));
    }

    #[test]
    fn test_allowed_from_states() {
        assert_eq!(RequestStatus::Accepted.allowed_from(), &[RequestStatus::Pending]);
        assert_eq!(RequestStatus::Rejected.allowed_from(), &[RequestStatus::Pending]);
        assert_eq!(
            RequestStatus::Cancelled.allowed_from(),
            &[RequestStatus::Pending, RequestStatus::Accepted]
        );
        assert_eq!(RequestStatus::Completed.allowed_from(), &[RequestStatus::Accepted]);
        assert!(RequestStatus::Pending.allowed_from().is_empty());
    }

    #[test]
    fn test_closed_states_are_never_a_source() {
        let targets = [
            RequestStatus::Pending,
            RequestStatus::Accepted,
            RequestStatus::Rejected,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ];
        let closed_states = [
            RequestStatus::Rejected,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ];
        for closed in closed_states {
            assert!(targets.iter().all(|t| !t.allowed_from().contains(&closed)));
        }
    }

    #[test]
    fn test_counterpart() {
        let application = request(PROVIDER, RequestStatus::Pending);
        assert_eq!(application.counterpart(PROVIDER, OWNER), OWNER);
        assert_eq!(application.counterpart(OWNER, OWNER), PROVIDER);
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        assert_eq!(
            "completed".parse::<RequestStatus>().unwrap(),
            RequestStatus::Completed
        );
        assert!("done".parse::<RequestStatus>().is_err());
    }
}
