//! In-app notification handlers.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::api::middlewares::AuthUser;
use crate::api::schemas::MessageResponse;
use crate::api::state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{Notification, NotificationRepository};

const LATEST_LIMIT: i64 = 20;

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: i64,
}

/// # Route
///
/// `GET /api/notifications`
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<NotificationsResponse>> {
    let notifications = NotificationRepository::latest(&state.db, user.id, LATEST_LIMIT).await?;
    let unread_count = NotificationRepository::unread_count(&state.db, user.id).await?;

    Ok(Json(NotificationsResponse {
        notifications,
        unread_count,
    }))
}

/// # Route
///
/// `POST /api/notifications/{id}/read`
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !NotificationRepository::mark_read(&state.db, user.id, id).await? {
        return Err(AppError::not_found("Notification"));
    }
    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// # Route
///
/// `POST /api/notifications/read-all`
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<MessageResponse>> {
    let updated = NotificationRepository::mark_all_read(&state.db, user.id).await?;
    Ok(Json(MessageResponse::new(format!("{updated} notification(s) marked as read"))))
}

/// # Route
///
/// `DELETE /api/notifications/{id}`
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    if !NotificationRepository::delete(&state.db, user.id, id).await? {
        return Err(AppError::not_found("Notification"));
    }
    Ok(Json(MessageResponse::new("Notification deleted")))
}
