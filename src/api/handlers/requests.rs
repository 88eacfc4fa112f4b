//! Applications, invitations and their lifecycle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Datelike;
use validator::Validate;

use super::{own_provider_profile, refresh_standing};
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    non_blank, ApplyRequest, DataResponse, InviteRequest, UnreadCountsResponse,
    UpdateStatusRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    roles, BlockRepository, OfferRepository, OfferStatus, ProviderRepository, RequestListing,
    RequestStatus, ServiceRequest, ServiceRequestRepository, UserRepository,
};
use crate::services::{availability, notifier};
use crate::utils::{Page, PageParams};

const REQUESTS_PER_PAGE: i64 = 15;

async fn ensure_not_blocked(state: &AppState, user_a: i64, user_b: i64) -> AppResult<()> {
    if BlockRepository::either_blocked(&state.db, user_a, user_b).await? {
        return Err(AppError::Forbidden(
            "Interaction is not possible: one of you has blocked the other".to_string(),
        ));
    }
    Ok(())
}

fn already_applied() -> AppError {
    AppError::BadRequest("You have already applied to this offer".to_string())
}

fn already_invited() -> AppError {
    AppError::BadRequest("This provider is already linked to the offer".to_string())
}

/// Provider applies to an offer.
///
/// # Route
///
/// `POST /api/provider/requests`
pub async fn apply(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ApplyRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ServiceRequest>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let offer = OfferRepository::find_by_id(&state.db, req.service_offer_id)
        .await?
        .ok_or_else(|| AppError::not_found("Offer"))?;

    ensure_not_blocked(&state, user.id, offer.user_id).await?;

    if offer.status != OfferStatus::Active.as_str() {
        return Err(AppError::Validation("This offer is no longer open".to_string()));
    }

    if ServiceRequestRepository::exists(&state.db, offer.id, user.id).await? {
        return Err(already_applied());
    }

    if let Some(date) = offer.desired_date {
        let provider = own_provider_profile(&state.db, user.id).await?;
        if !availability::is_available_on(&provider.availabilities, date) {
            return Err(AppError::Validation(format!(
                "You are not available on {} ({date})",
                availability::weekday_key(date.weekday())
            )));
        }
    }

    let message = non_blank(req.message);
    let request = ServiceRequestRepository::create(
        &state.db,
        offer.id,
        user.id,
        user.id,
        message.as_deref(),
    )
    .await?
    .ok_or_else(already_applied)?;
    tracing::info!(
        request_id = request.id,
        offer_id = offer.id,
        provider_id = user.id,
        "Application sent"
    );

    notifier::new_application(&state.db, offer.user_id, &offer, request.id, &user.name).await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Application sent", request)),
    ))
}

/// Client invites a provider to one of their offers.
///
/// # Route
///
/// `POST /api/client/requests`
pub async fn invite(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<InviteRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<ServiceRequest>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    ensure_not_blocked(&state, user.id, req.provider_id).await?;

    let offer = OfferRepository::find_by_id(&state.db, req.service_offer_id)
        .await?
        .filter(|offer| offer.user_id == user.id)
        .ok_or_else(|| AppError::not_found("Offer"))?;

    let provider = UserRepository::find_by_id(&state.db, req.provider_id)
        .await?
        .filter(|u| u.role == roles::PROVIDER && u.is_active)
        .ok_or_else(|| AppError::not_found("Provider"))?;

    if ServiceRequestRepository::exists(&state.db, offer.id, provider.id).await? {
        return Err(already_invited());
    }

    let message = non_blank(req.message);
    let request = ServiceRequestRepository::create(
        &state.db,
        offer.id,
        provider.id,
        user.id,
        message.as_deref(),
    )
    .await?
    .ok_or_else(already_invited)?;
    tracing::info!(
        request_id = request.id,
        offer_id = offer.id,
        provider_id = provider.id,
        "Invitation sent"
    );

    notifier::new_invitation(&state.db, provider.id, &offer, request.id, &user.name).await;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Invitation sent", request)),
    ))
}

/// Applications to the caller's offers and invitations they sent.
///
/// Incoming applications are marked read.
///
/// # Route
///
/// `GET /api/client/requests`
pub async fn client_index(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<RequestListing>>> {
    let (requests, total) = ServiceRequestRepository::for_client(&state.db, user.id, page).await?;
    ServiceRequestRepository::mark_applications_read(&state.db, user.id).await?;

    Ok(Json(Page::new(requests, page, REQUESTS_PER_PAGE, total)))
}

/// Requests concerning the calling provider.
///
/// Incoming invitations are marked read.
///
/// # Route
///
/// `GET /api/provider/requests`
pub async fn provider_index(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
) -> AppResult<Json<Page<RequestListing>>> {
    let (requests, total) = ServiceRequestRepository::for_provider(&state.db, user.id, page).await?;
    ServiceRequestRepository::mark_invitations_read(&state.db, user.id).await?;

    Ok(Json(Page::new(requests, page, REQUESTS_PER_PAGE, total)))
}

/// # Route
///
/// `GET /api/requests/unread-counts`
pub async fn unread_counts(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<UnreadCountsResponse>> {
    let (candidatures_count, invitations_count) =
        ServiceRequestRepository::unread_counts(&state.db, user.id).await?;

    Ok(Json(UnreadCountsResponse {
        candidatures_count,
        invitations_count,
    }))
}

/// Closed requests never move again.
fn ensure_open(request: &ServiceRequest, target: RequestStatus) -> AppResult<()> {
    let current = request.status.as_str();
    if target.allowed_from().iter().any(|from| from.as_str() == current) {
        Ok(())
    } else {
        Err(stale_transition(current, target))
    }
}

fn stale_transition(current: &str, target: RequestStatus) -> AppError {
    AppError::Validation(format!(
        "A {current} request cannot become {}",
        target.as_str()
    ))
}

/// Moves a request through its lifecycle.
///
/// Accepting starts the offer; completing closes it and credits the
/// provider with a mission. The status change and its effects on the offer
/// and the provider commit together. The other party is notified.
///
/// # Route
///
/// `PUT /api/requests/{id}/status`
pub async fn update_status(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<Json<DataResponse<RequestListing>>> {
    let listing = ServiceRequestRepository::find_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Request"))?;
    let request = &listing.request;
    let owner_id = listing.offer_owner_id;

    if user.id != request.user_id && user.id != owner_id {
        return Err(AppError::Forbidden(
            "You are not part of this request".to_string(),
        ));
    }

    let target = req.status;
    if !request.can_transition(user.id, owner_id, target) {
        return Err(AppError::Forbidden(format!(
            "You are not allowed to mark this request as {}",
            target.as_str()
        )));
    }
    ensure_open(request, target)?;

    let mut tx = state.db.begin().await?;
    // A concurrent update may have moved the row since it was read.
    if !ServiceRequestRepository::transition(&mut *tx, id, target).await? {
        return Err(stale_transition(&request.status, target));
    }

    let credited = match target {
        RequestStatus::Accepted => {
            OfferRepository::set_status(&mut *tx, request.service_offer_id, OfferStatus::InProgress)
                .await?;
            None
        }
        RequestStatus::Completed => {
            OfferRepository::set_status(&mut *tx, request.service_offer_id, OfferStatus::Completed)
                .await?;
            ProviderRepository::increment_missions(&mut *tx, request.user_id).await?
        }
        _ => None,
    };
    tx.commit().await?;
    tracing::info!(request_id = id, actor_id = user.id, status = %target, "Request status changed");

    if let Some(provider) = credited {
        refresh_standing(&state, &provider).await?;
    }

    let recipient = request.counterpart(user.id, owner_id);
    notifier::request_status_changed(&state.db, recipient, id, &listing.offer_title, target).await;

    let updated = ServiceRequestRepository::find_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Request"))?;

    Ok(Json(DataResponse::new("Request updated", updated)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn request(status: RequestStatus) -> ServiceRequest {
        let now = Utc::now();
        ServiceRequest {
            id: 1,
            service_offer_id: 2,
            user_id: 3,
            created_by_id: 3,
            message: None,
            status: status.as_str().to_string(),
            is_read: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pending_can_be_answered() {
        let pending = request(RequestStatus::Pending);
        assert!(ensure_open(&pending, RequestStatus::Accepted).is_ok());
        assert!(ensure_open(&pending, RequestStatus::Rejected).is_ok());
        assert!(ensure_open(&pending, RequestStatus::Cancelled).is_ok());
        assert!(ensure_open(&pending, RequestStatus::Completed).is_err());
    }

    #[test]
    fn test_accepted_can_complete_or_cancel() {
        let accepted = request(RequestStatus::Accepted);
        assert!(ensure_open(&accepted, RequestStatus::Completed).is_ok());
        assert!(ensure_open(&accepted, RequestStatus::Cancelled).is_ok());
        assert!(ensure_open(&accepted, RequestStatus::Rejected).is_err());
    }

    #[test]
    fn test_closed_requests_are_frozen() {
        let closed_states = [
            RequestStatus::Rejected,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ];
        for status in closed_states {
            let closed = request(status);
            assert!(matches!(
                ensure_open(&closed, RequestStatus::Accepted),
                Err(AppError::Validation(_))
            ));
            assert!(ensure_open(&closed, RequestStatus::Cancelled).is_err());
        }
    }

    #[test]
    fn test_stale_transition_is_unprocessable() {
        match stale_transition("completed", RequestStatus::Completed) {
            AppError::Validation(msg) => {
                assert_eq!(msg, "A completed request cannot become completed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_back_to_pending_is_refused() {
        assert!(ensure_open(&request(RequestStatus::Pending), RequestStatus::Pending).is_err());
    }
}
