//! Report queue and conversation oversight.

use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use validator::Validate;

use crate::api::handlers::audit;
use crate::api::middlewares::{ensure_permission, request_origin, AuthUser};
use crate::api::schemas::{
    non_blank, AdminListQuery, ConversationPair, DataResponse, ReportActionRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    actions, ConversationOverview, ConversationRepository, MessageRepository, MessageWithSender,
    Report, ReportAction, ReportFilter, ReportListing, ReportRepository, User, UserRepository,
};
use crate::services::notifier;
use crate::utils::{Page, PageParams};

const REPORTS_PER_PAGE: i64 = 10;
const CONVERSATIONS_PER_PAGE: i64 = 15;
const MESSAGES_PER_PAGE: i64 = 50;

/// # Route
///
/// `GET /api/admin/reports`
pub async fn list_reports(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ReportFilter>,
) -> AppResult<Json<Page<ReportListing>>> {
    ensure_permission(&state, &admin, "reports.view").await?;

    let (reports, total) = ReportRepository::list(&state.db, &filter, page).await?;
    Ok(Json(Page::new(reports, page, REPORTS_PER_PAGE, total)))
}

/// # Route
///
/// `GET /api/admin/reports/{id}`
pub async fn show_report(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ReportListing>> {
    ensure_permission(&state, &admin, "reports.view").await?;

    let report = ReportRepository::find_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Report"))?;
    Ok(Json(report))
}

/// Applies the consequence of an action to the reported account.
async fn enforce(
    state: &AppState,
    admin: &User,
    reported: &User,
    action: ReportAction,
    reason: &str,
    headers: &HeaderMap,
) -> AppResult<()> {
    match action {
        ReportAction::Ignore => {}
        ReportAction::Warn => {
            audit(
                &state.db,
                Some(reported.id),
                actions::WARN,
                &format!("Warned by {} after a report: {reason}", admin.name),
                &request_origin(headers),
            )
            .await;
            notifier::account_warning(&state.db, reported.id, reason).await;
        }
        ReportAction::Suspend => {
            UserRepository::set_active(&state.db, reported.id, false).await?;
        }
        ReportAction::Delete => {
            UserRepository::delete(&state.db, reported.id).await?;
        }
    }
    Ok(())
}

/// Records a moderator decision: `ignore`, `warn`, `suspend` or `delete`.
///
/// # Route
///
/// `POST /api/admin/reports/{id}/action`
pub async fn report_action(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<ReportActionRequest>,
) -> AppResult<Json<DataResponse<Report>>> {
    ensure_permission(&state, &admin, "reports.manage").await?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let action = ReportAction::from_str(req.action.trim())?;
    let listing = ReportRepository::find_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Report"))?;

    let reported = match listing.report.reported_id {
        Some(reported_id) => UserRepository::find_by_id(&state.db, reported_id).await?,
        None => None,
    };

    match reported {
        Some(reported) => {
            if reported.id == admin.id && action != ReportAction::Ignore {
                return Err(AppError::Forbidden("You cannot act on your own account".to_string()));
            }
            enforce(&state, &admin, &reported, action, &listing.report.reason, &headers).await?;
        }
        // The account is already gone; only dismissing or recording a deletion still makes sense.
        None if matches!(action, ReportAction::Warn | ReportAction::Suspend) => {
            return Err(AppError::BadRequest("The reported account no longer exists".to_string()));
        }
        None => {}
    }

    let notes = non_blank(req.notes);
    let report = ReportRepository::apply_action(&state.db, id, action, notes.as_deref())
        .await?
        .ok_or_else(|| AppError::not_found("Report"))?;
    tracing::info!(
        report_id = id,
        action = action.recorded_as(),
        admin_id = admin.id,
        "Report handled"
    );

    Ok(Json(DataResponse::new("Action applied", report)))
}

/// # Route
///
/// `GET /api/admin/conversations`
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<Page<ConversationOverview>>> {
    ensure_permission(&state, &admin, "reports.view").await?;

    let (conversations, total) =
        ConversationRepository::overview(&state.db, query.search(), page).await?;
    Ok(Json(Page::new(
        conversations,
        page,
        CONVERSATIONS_PER_PAGE,
        total,
    )))
}

/// Everything two users said to each other, newest first.
///
/// # Route
///
/// `GET /api/admin/messages?user1=..&user2=..`
pub async fn messages_between(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(pair): Query<ConversationPair>,
) -> AppResult<Json<Page<MessageWithSender>>> {
    ensure_permission(&state, &admin, "reports.view").await?;

    if pair.user1 == pair.user2 {
        return Err(AppError::Validation(
            "Two different users are required".to_string(),
        ));
    }

    let (messages, total) =
        MessageRepository::between_users(&state.db, pair.user1, pair.user2, page).await?;
    Ok(Json(Page::new(messages, page, MESSAGES_PER_PAGE, total)))
}
