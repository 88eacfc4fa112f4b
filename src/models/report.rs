//! Abuse reports and user blocks.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};

use crate::error::{AppError, AppResult};
use crate::utils::PageParams;

/// Moderator decision on a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportAction {
    Ignore,
    Warn,
    Suspend,
    Delete,
}

impl ReportAction {
    /// Value stored in `reports.admin_action`.
    pub const fn recorded_as(self) -> &'static str {
        match self {
            Self::Ignore => "ignored",
            Self::Warn => "warned",
            Self::Suspend => "suspended",
            Self::Delete => "deleted",
        }
    }

    /// Report status once the action is applied.
    pub const fn resulting_status(self) -> &'static str {
        match self {
            Self::Ignore => "dismissed",
            Self::Warn | Self::Suspend | Self::Delete => "resolved",
        }
    }
}

impl FromStr for ReportAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(Self::Ignore),
            "warn" => Ok(Self::Warn),
            "suspend" => Ok(Self::Suspend),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::BadRequest("Invalid action".to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: i64,
    pub reporter_id: Option<i64>,
    pub reported_id: Option<i64>,
    pub reason: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub admin_action: String,
    pub admin_action_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report with both parties' names.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ReportListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub report: Report,
    pub reporter_name: Option<String>,
    pub reported_name: Option<String>,
    pub reported_email: Option<String>,
}

/// Moderation queue filters. `all` is treated as no filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportFilter {
    pub priority: Option<String>,
    pub status: Option<String>,
    pub admin_action: Option<String>,
    pub search: Option<String>,
}

fn filter_value(value: Option<&String>) -> Option<&str> {
    value
        .map(String::as_str)
        .filter(|v| !v.is_empty() && *v != "all")
}

const REPORT_COLUMNS: &str = "r.id, r.reporter_id, r.reported_id, r.reason, r.description, \
     r.priority, r.status, r.admin_action, r.admin_action_at, r.admin_notes, r.created_at, \
     r.updated_at";

const LISTING_FROM: &str = r"
    FROM reports r
    LEFT JOIN users rp ON rp.id = r.reporter_id
    LEFT JOIN users rd ON rd.id = r.reported_id
";

const QUEUE_FILTER: &str = r"
    WHERE ($1::TEXT IS NULL OR r.priority = $1)
      AND ($2::TEXT IS NULL OR r.status = $2)
      AND ($3::TEXT IS NULL OR r.admin_action = $3)
      AND ($4::TEXT IS NULL OR r.reason ILIKE $4 OR r.description ILIKE $4 OR rd.name ILIKE $4)
";

/// Report repository for database operations.
pub struct ReportRepository;

impl ReportRepository {
    pub async fn create(
        pool: &PgPool,
        reporter_id: i64,
        reported_id: i64,
        reason: &str,
        description: Option<&str>,
    ) -> AppResult<Report> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r"
            INSERT INTO reports AS r
                (reporter_id, reported_id, reason, description, priority, status)
            VALUES ($1, $2, $3, $4, 'medium', 'pending')
            RETURNING {REPORT_COLUMNS}
            "
        ))
        .bind(reporter_id)
        .bind(reported_id)
        .bind(reason)
        .bind(description)
        .fetch_one(pool)
        .await?;

        Ok(report)
    }

    pub async fn find_listing(pool: &PgPool, id: i64) -> AppResult<Option<ReportListing>> {
        let report = sqlx::query_as::<_, ReportListing>(&format!(
            r"
            SELECT {REPORT_COLUMNS}, rp.name AS reporter_name, rd.name AS reported_name,
                   rd.email AS reported_email
            {LISTING_FROM}
            WHERE r.id = $1
            "
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(report)
    }

    /// Moderation queue, newest first.
    pub async fn list(
        pool: &PgPool,
        filter: &ReportFilter,
        page: PageParams,
    ) -> AppResult<(Vec<ReportListing>, i64)> {
        let (limit, offset) = page.limit_offset(10);
        let priority = filter_value(filter.priority.as_ref());
        let status = filter_value(filter.status.as_ref());
        let admin_action = filter_value(filter.admin_action.as_ref());
        let search = filter_value(filter.search.as_ref()).map(|s| format!("%{s}%"));

        let reports = sqlx::query_as::<_, ReportListing>(&format!(
            r"
            SELECT {REPORT_COLUMNS}, rp.name AS reporter_name, rd.name AS reported_name,
                   rd.email AS reported_email
            {LISTING_FROM}
            {QUEUE_FILTER}
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $5 OFFSET $6
            "
        ))
        .bind(priority)
        .bind(status)
        .bind(admin_action)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) {LISTING_FROM} {QUEUE_FILTER}"
        ))
        .bind(priority)
        .bind(status)
        .bind(admin_action)
        .bind(&search)
        .fetch_one(pool)
        .await?;

        Ok((reports, total))
    }

    /// Records a moderator decision.
    pub async fn apply_action(
        pool: &PgPool,
        id: i64,
        action: ReportAction,
        notes: Option<&str>,
    ) -> AppResult<Option<Report>> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r"
            UPDATE reports AS r SET
                admin_action = $2,
                status = $3,
                admin_notes = COALESCE($4, r.admin_notes),
                admin_action_at = NOW(),
                updated_at = NOW()
            WHERE r.id = $1
            RETURNING {REPORT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(action.recorded_as())
        .bind(action.resulting_status())
        .bind(notes)
        .fetch_optional(pool)
        .await?;

        Ok(report)
    }

    pub async fn count_pending(pool: &PgPool) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE status = 'pending'")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

/// A user hidden by another.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BlockedUser {
    pub blocked_id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// User block repository for database operations.
pub struct BlockRepository;

impl BlockRepository {
    /// Idempotent; returns whether a new block was recorded.
    pub async fn block(pool: &PgPool, blocker_id: i64, blocked_id: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r"
            INSERT INTO user_blocks (blocker_id, blocked_id) VALUES ($1, $2)
            ON CONFLICT (blocker_id, blocked_id) DO NOTHING
            ",
        )
        .bind(blocker_id)
        .bind(blocked_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn unblock(pool: &PgPool, blocker_id: i64, blocked_id: i64) -> AppResult<bool> {
        let result =
            sqlx::query("DELETE FROM user_blocks WHERE blocker_id = $1 AND blocked_id = $2")
                .bind(blocker_id)
                .bind(blocked_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Whether either user has blocked the other.
    pub async fn either_blocked(pool: &PgPool, user_a: i64, user_b: i64) -> AppResult<bool> {
        let blocked: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS(
                SELECT 1 FROM user_blocks
                WHERE (blocker_id = $1 AND blocked_id = $2) OR (blocker_id = $2 AND blocked_id = $1)
            )
            ",
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_one(pool)
        .await?;

        Ok(blocked)
    }

    pub async fn blocked_by(pool: &PgPool, blocker_id: i64) -> AppResult<Vec<BlockedUser>> {
        let blocked = sqlx::query_as::<_, BlockedUser>(
            r"
            SELECT b.blocked_id, u.name, u.email, b.created_at
            FROM user_blocks b
            JOIN users u ON u.id = b.blocked_id
            WHERE b.blocker_id = $1
            ORDER BY b.created_at DESC
            ",
        )
        .bind(blocker_id)
        .fetch_all(pool)
        .await?;

        Ok(blocked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_action_outcomes() {
        assert_eq!(ReportAction::Ignore.recorded_as(), "ignored");
        assert_eq!(ReportAction::Ignore.resulting_status(), "dismissed");
        assert_eq!(ReportAction::Warn.recorded_as(), "warned");
        assert_eq!(ReportAction::Suspend.resulting_status(), "resolved");
        assert_eq!(ReportAction::Delete.recorded_as(), "deleted");
    }

    #[test]
    fn test_report_action_parse() {
        assert_eq!("suspend".parse::<ReportAction>().unwrap(), ReportAction::Suspend);
        assert!(matches!(
            "ban".parse::<ReportAction>(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_filter_value_ignores_all_and_empty() {
        let all = "all".to_string();
        let empty = String::new();
        let high = "high".to_string();
        assert_eq!(filter_value(Some(&all)), None);
        assert_eq!(filter_value(Some(&empty)), None);
        assert_eq!(filter_value(Some(&high)), Some("high"));
        assert_eq!(filter_value(None), None);
    }
}
