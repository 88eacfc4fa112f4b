//! Back-office dashboard: counters, activity charts and the audit trail.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};

use crate::api::middlewares::{ensure_permission, AuthUser};
use crate::api::schemas::{AnalyticsQuery, StatsResponse};
use crate::api::state::AppState;
use crate::error::AppResult;
use crate::models::{
    roles, ActivityLog, ActivityLogRepository, FailedLoginAlert, OfferRepository, ReportRepository,
    UserRepository,
};
use crate::services::analytics::{self, Analytics};
use crate::utils::{Page, PageParams};

const DASHBOARD_VIEW: &str = "dashboard.view";
const LOGS_PER_PAGE: i64 = 20;
const ALERT_WINDOW_HOURS: i64 = 24;

/// # Route
///
/// `GET /api/admin/stats`
pub async fn stats(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<StatsResponse>> {
    ensure_permission(&state, &user, DASHBOARD_VIEW).await?;

    Ok(Json(StatsResponse {
        users_count: UserRepository::count(&state.db, None).await?,
        providers_count: UserRepository::count(&state.db, Some(roles::PROVIDER)).await?,
        clients_count: UserRepository::count(&state.db, Some(roles::CLIENT)).await?,
        offers_count: OfferRepository::count(&state.db).await?,
        pending_reports_count: ReportRepository::count_pending(&state.db).await?,
    }))
}

/// Daily activity over the last `days` days (30 by default, at most 365).
///
/// # Route
///
/// `GET /api/admin/analytics`
pub async fn activity(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<Analytics>> {
    ensure_permission(&state, &user, DASHBOARD_VIEW).await?;

    let days = analytics::clamp_window(query.days);
    Ok(Json(analytics::activity(&state.db, days).await?))
}

/// # Route
///
/// `GET /api/admin/logs`
pub async fn logs(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<ActivityLog>>> {
    ensure_permission(&state, &user, DASHBOARD_VIEW).await?;

    let (entries, total) = ActivityLogRepository::latest(&state.db, page).await?;
    Ok(Json(Page::new(entries, page, LOGS_PER_PAGE, total)))
}

/// Addresses with failed logins in the last day.
///
/// # Route
///
/// `GET /api/admin/alerts`
pub async fn alerts(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<Vec<FailedLoginAlert>>> {
    ensure_permission(&state, &user, DASHBOARD_VIEW).await?;

    let since = Utc::now() - Duration::hours(ALERT_WINDOW_HOURS);
    Ok(Json(ActivityLogRepository::failed_logins_since(&state.db, since).await?))
}
