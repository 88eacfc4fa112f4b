//! Conversation handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    non_blank, ConversationDetail, CountResponse, DataResponse, MessageResponse, SendMessageRequest,
    StartConversationRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    BlockRepository, Conversation, ConversationRepository, InboxEntry, Message, MessageRepository,
    User, UserRepository, UserSummary,
};

/// Loads a conversation the caller takes part in.
async fn participant_conversation(
    state: &AppState,
    user: &User,
    id: i64,
) -> AppResult<Conversation> {
    let conversation = ConversationRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Conversation"))?;

    if !conversation.has_participant(user.id) {
        return Err(AppError::Forbidden("You are not part of this conversation".to_string()));
    }
    Ok(conversation)
}

/// Context scoping applies only when both fields are present.
fn related_context(req: &StartConversationRequest) -> (Option<String>, Option<i64>) {
    match (non_blank(req.related_type.clone()), req.related_id) {
        (Some(related_type), Some(related_id)) => (Some(related_type), Some(related_id)),
        _ => (None, None),
    }
}

/// The caller's inbox, most recent activity first.
///
/// # Route
///
/// `GET /api/conversations`
pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<Vec<InboxEntry>>> {
    Ok(Json(ConversationRepository::inbox(&state.db, user.id).await?))
}

/// Returns the existing thread with `receiver_id`, or opens one.
///
/// # Route
///
/// `POST /api/conversations`
pub async fn start_conversation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<StartConversationRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Conversation>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    if req.receiver_id == user.id {
        return Err(AppError::Validation(
            "You cannot start a conversation with yourself".to_string(),
        ));
    }

    let receiver = UserRepository::find_by_id(&state.db, req.receiver_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if BlockRepository::either_blocked(&state.db, user.id, receiver.id).await? {
        return Err(AppError::Forbidden("You cannot message this user".to_string()));
    }

    let (related_type, related_id) = related_context(&req);

    if let Some(existing) = ConversationRepository::find_between(
        &state.db,
        user.id,
        receiver.id,
        related_type.as_deref(),
        related_id,
    )
    .await?
    {
        return Ok((
            StatusCode::OK,
            Json(DataResponse::new("Conversation already exists", existing)),
        ));
    }

    let created = ConversationRepository::create(
        &state.db,
        user.id,
        receiver.id,
        related_type.as_deref(),
        related_id,
        false,
    )
    .await?;

    // A concurrent request may have opened the same thread first.
    let conversation = match created {
        Some(conversation) => conversation,
        None => ConversationRepository::find_between(
            &state.db,
            user.id,
            receiver.id,
            related_type.as_deref(),
            related_id,
        )
        .await?
        .ok_or_else(|| AppError::Internal("Conversation vanished after conflict".to_string()))?,
    };

    tracing::info!(
        conversation_id = conversation.id,
        sender_id = user.id,
        receiver_id = receiver.id,
        "Conversation started"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Conversation started", conversation)),
    ))
}

/// Opens a thread and marks the caller's incoming messages read.
///
/// # Route
///
/// `GET /api/conversations/{id}`
pub async fn show_conversation(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<ConversationDetail>> {
    let conversation = participant_conversation(&state, &user, id).await?;

    MessageRepository::mark_read(&state.db, id, user.id).await?;
    let messages = MessageRepository::for_conversation(&state.db, id).await?;

    let other = UserRepository::find_by_id(&state.db, conversation.other_participant(user.id))
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(Json(ConversationDetail {
        conversation,
        other_user: UserSummary {
            id: other.id,
            name: other.name,
            email: other.email,
            role: other.role,
        },
        messages,
    }))
}

/// # Route
///
/// `POST /api/conversations/{id}/messages`
pub async fn send_message(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Message>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let conversation = participant_conversation(&state, &user, id).await?;
    if conversation.is_blocked {
        return Err(AppError::Forbidden("This conversation is blocked".to_string()));
    }

    let content = req.content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Message cannot be empty".to_string()));
    }

    let receiver_id = conversation.other_participant(user.id);
    let message = MessageRepository::create(&state.db, id, user.id, receiver_id, content).await?;
    ConversationRepository::touch(&state.db, id).await?;

    tracing::debug!(conversation_id = id, message_id = message.id, "Message sent");

    Ok((StatusCode::CREATED, Json(DataResponse::new("Message sent", message))))
}

/// # Route
///
/// `POST /api/conversations/{id}/read`
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    participant_conversation(&state, &user, id).await?;
    let updated = MessageRepository::mark_read(&state.db, id, user.id).await?;

    Ok(Json(MessageResponse::new(format!("{updated} message(s) marked as read"))))
}

/// Unread messages across all conversations.
///
/// # Route
///
/// `GET /api/messages/unread-count`
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<CountResponse>> {
    let count = MessageRepository::unread_count(&state.db, user.id).await?;
    Ok(Json(CountResponse { count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(related_type: Option<&str>, related_id: Option<i64>) -> StartConversationRequest {
        StartConversationRequest {
            receiver_id: 2,
            related_type: related_type.map(ToString::to_string),
            related_id,
        }
    }

    #[test]
    fn test_related_context_needs_both_fields() {
        assert_eq!(
            related_context(&start(Some("offer"), Some(4))),
            (Some("offer".to_string()), Some(4))
        );
        assert_eq!(related_context(&start(Some("offer"), None)), (None, None));
        assert_eq!(related_context(&start(None, Some(4))), (None, None));
        assert_eq!(related_context(&start(Some("  "), Some(4))), (None, None));
    }
}
