//! Date-bucketed platform activity for the admin dashboard.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::error::AppResult;

pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const MAX_WINDOW_DAYS: i64 = 365;

/// Clamps a requested window to `1..=365` days.
pub fn clamp_window(days: Option<i64>) -> i64 {
    days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, MAX_WINDOW_DAYS)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub users: i64,
    pub offers: i64,
    pub completed_missions: i64,
    pub reports: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Totals {
    pub users: i64,
    pub offers: i64,
    pub completed_missions: i64,
    pub reports: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Analytics {
    pub days: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub totals: Totals,
    pub series: Vec<DailyActivity>,
}

#[derive(Debug, FromRow)]
struct DayCount {
    day: NaiveDate,
    count: i64,
}

/// Series over `days` days ending at `today`, with a zero bucket for every
/// day that has no activity.
fn zero_filled(
    today: NaiveDate,
    days: i64,
    users: &[DayCount],
    offers: &[DayCount],
    missions: &[DayCount],
    reports: &[DayCount],
) -> Vec<DailyActivity> {
    let index = |rows: &[DayCount]| -> HashMap<NaiveDate, i64> {
        rows.iter().map(|r| (r.day, r.count)).collect()
    };
    let users = index(users);
    let offers = index(offers);
    let missions = index(missions);
    let reports = index(reports);

    let start = today - Duration::days(days - 1);
    start
        .iter_days()
        .take_while(|day| *day <= today)
        .map(|date| DailyActivity {
            date,
            users: users.get(&date).copied().unwrap_or(0),
            offers: offers.get(&date).copied().unwrap_or(0),
            completed_missions: missions.get(&date).copied().unwrap_or(0),
            reports: reports.get(&date).copied().unwrap_or(0),
        })
        .collect()
}

async fn daily_counts(pool: &PgPool, sql: &str, since: NaiveDate) -> AppResult<Vec<DayCount>> {
    let rows = sqlx::query_as::<_, DayCount>(sql)
        .bind(since)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Builds the activity report for the last `days` days, today included.
pub async fn activity(pool: &PgPool, days: i64) -> AppResult<Analytics> {
    let today = Utc::now().date_naive();
    let since = today - Duration::days(days - 1);

    let users = daily_counts(
        pool,
        r"SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count
          FROM users WHERE (created_at AT TIME ZONE 'UTC')::DATE >= $1 GROUP BY day",
        since,
    )
    .await?;
    let offers = daily_counts(
        pool,
        r"SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count
          FROM service_offers WHERE (created_at AT TIME ZONE 'UTC')::DATE >= $1 GROUP BY day",
        since,
    )
    .await?;
    let missions = daily_counts(
        pool,
        r"SELECT (updated_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count
          FROM service_requests
          WHERE status = 'completed' AND (updated_at AT TIME ZONE 'UTC')::DATE >= $1 GROUP BY day",
        since,
    )
    .await?;
    let reports = daily_counts(
        pool,
        r"SELECT (created_at AT TIME ZONE 'UTC')::DATE AS day, COUNT(*) AS count
          FROM reports WHERE (created_at AT TIME ZONE 'UTC')::DATE >= $1 GROUP BY day",
        since,
    )
    .await?;

    let series = zero_filled(today, days, &users, &offers, &missions, &reports);
    let totals = Totals {
        users: series.iter().map(|d| d.users).sum(),
        offers: series.iter().map(|d| d.offers).sum(),
        completed_missions: series.iter().map(|d| d.completed_missions).sum(),
        reports: series.iter().map(|d| d.reports).sum(),
    };

    Ok(Analytics {
        days,
        from: since,
        to: today,
        totals,
        series,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn test_clamp_window() {
        assert_eq!(clamp_window(None), 30);
        assert_eq!(clamp_window(Some(0)), 1);
        assert_eq!(clamp_window(Some(-5)), 1);
        assert_eq!(clamp_window(Some(90)), 90);
        assert_eq!(clamp_window(Some(1000)), 365);
    }

    #[test]
    fn test_zero_filled_covers_every_day() {
        let users = vec![DayCount { day: day(3, 1), count: 4 }];
        let reports = vec![DayCount { day: day(3, 3), count: 1 }];

        let series = zero_filled(day(3, 3), 3, &users, &[], &[], &reports);

        assert_eq!(series.len(), 3);
        assert_eq!(series[0].date, day(3, 1));
        assert_eq!(series[0].users, 4);
        assert_eq!(series[1].users, 0);
        assert_eq!(series[1].reports, 0);
        assert_eq!(series[2].date, day(3, 3));
        assert_eq!(series[2].reports, 1);
    }

    #[test]
    fn test_zero_filled_ignores_rows_outside_window() {
        let offers = vec![DayCount { day: day(2, 1), count: 9 }];
        let series = zero_filled(day(3, 2), 2, &[], &offers, &[], &[]);
        assert!(series.iter().all(|d| d.offers == 0));
    }

    #[test]
    fn test_zero_filled_crosses_month_boundary() {
        let series = zero_filled(day(3, 1), 2, &[], &[], &[], &[]);
        assert_eq!(series[0].date, day(2, 28));
        assert_eq!(series[1].date, day(3, 1));
    }
}
