//! Reports and user blocks.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::api::middlewares::AuthUser;
use crate::api::schemas::{non_blank, BlockRequest, DataResponse, MessageResponse, ReportRequest};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    BlockRepository, BlockedUser, ConversationRepository, Report, ReportRepository, User,
    UserRepository,
};

async fn find_target(
    state: &AppState,
    user: &User,
    target_id: i64,
    verb: &str,
) -> AppResult<User> {
    if target_id == user.id {
        return Err(AppError::Validation(format!("You cannot {verb} yourself")));
    }

    UserRepository::find_by_id(&state.db, target_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

/// Blocks `blocked_id` for `blocker_id` and freezes their conversations.
async fn apply_block(state: &AppState, blocker_id: i64, blocked_id: i64) -> AppResult<bool> {
    let created = BlockRepository::block(&state.db, blocker_id, blocked_id).await?;
    ConversationRepository::set_blocked_between(&state.db, blocker_id, blocked_id, true).await?;
    Ok(created)
}

/// Files a report and blocks the reported user.
///
/// # Route
///
/// `POST /api/reports`
pub async fn report_user(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ReportRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Report>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let target = find_target(&state, &user, req.reported_id, "report").await?;
    if target.is_admin() {
        return Err(AppError::Forbidden("Administrators cannot be reported".to_string()));
    }

    let description = non_blank(req.description);
    let report = ReportRepository::create(
        &state.db,
        user.id,
        target.id,
        req.reason.trim(),
        description.as_deref(),
    )
    .await?;
    apply_block(&state, user.id, target.id).await?;

    tracing::warn!(
        report_id = report.id,
        reporter_id = user.id,
        reported_id = target.id,
        "User reported"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Report submitted, the user has been blocked", report)),
    ))
}

/// Idempotent: blocking twice succeeds.
///
/// # Route
///
/// `POST /api/blocks`
pub async fn block_user(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<MessageResponse>> {
    let target = find_target(&state, &user, req.blocked_id, "block").await?;

    if apply_block(&state, user.id, target.id).await? {
        tracing::info!(blocker_id = user.id, blocked_id = target.id, "User blocked");
    }

    Ok(Json(MessageResponse::new("User blocked")))
}

/// Conversations reopen only when neither side still blocks the other.
///
/// # Route
///
/// `DELETE /api/blocks/{id}`
pub async fn unblock_user(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(blocked_id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    if !BlockRepository::unblock(&state.db, user.id, blocked_id).await? {
        return Err(AppError::NotFound("This user is not blocked".to_string()));
    }

    if !BlockRepository::either_blocked(&state.db, user.id, blocked_id).await? {
        ConversationRepository::set_blocked_between(&state.db, user.id, blocked_id, false).await?;
    }
    tracing::info!(blocker_id = user.id, blocked_id, "User unblocked");

    Ok(Json(MessageResponse::new("User unblocked")))
}

/// # Route
///
/// `GET /api/blocks`
pub async fn blocked_list(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<Vec<BlockedUser>>> {
    Ok(Json(BlockRepository::blocked_by(&state.db, user.id).await?))
}
