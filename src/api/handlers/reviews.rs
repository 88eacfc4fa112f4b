//! Review handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use validator::Validate;

use super::refresh_standing;
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    non_blank, CreateReviewRequest, DataResponse, MessageResponse, ProviderReviewsResponse,
    UpdateReviewRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    roles, OfferRepository, ProviderRepository, Review, ReviewListing, ReviewRepository, User,
    UserRepository,
};

/// Rounds a rating to one decimal.
fn one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

async fn own_review(state: &AppState, user: &User, id: i64) -> AppResult<Review> {
    let review = ReviewRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Review"))?;

    if review.reviewer_id != user.id {
        return Err(AppError::Forbidden("You can only manage your own reviews".to_string()));
    }
    Ok(review)
}

/// Recomputes the reviewed provider's rating and what depends on it.
async fn rerate(state: &AppState, provider_user_id: i64) -> AppResult<()> {
    if let Some(provider) = ProviderRepository::refresh_rating(&state.db, provider_user_id).await? {
        tracing::debug!(
            provider_id = provider.id,
            rating = provider.rating,
            "Provider rating refreshed"
        );
        refresh_standing(state, &provider).await?;
    }
    Ok(())
}

/// Reviews received by the calling provider.
///
/// # Route
///
/// `GET /api/provider/reviews`
pub async fn provider_reviews(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<ProviderReviewsResponse>> {
    let reviews = ReviewRepository::received_by(&state.db, user.id).await?;
    let average = ReviewRepository::average_for(&state.db, user.id).await?;

    Ok(Json(ProviderReviewsResponse {
        total_reviews: reviews.len(),
        average_rating: one_decimal(average),
        reviews,
    }))
}

/// Reviews written by the caller.
///
/// # Route
///
/// `GET /api/client/reviews`
pub async fn client_reviews(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<Vec<ReviewListing>>> {
    Ok(Json(ReviewRepository::written_by(&state.db, user.id).await?))
}

/// One review per reviewer and offer.
///
/// # Route
///
/// `POST /api/reviews`
pub async fn create_review(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Review>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    if req.user_id == user.id {
        return Err(AppError::Validation("You cannot review yourself".to_string()));
    }

    UserRepository::find_by_id(&state.db, req.user_id)
        .await?
        .filter(|u| u.role == roles::PROVIDER)
        .ok_or_else(|| AppError::not_found("Provider"))?;

    OfferRepository::find_by_id(&state.db, req.service_offer_id)
        .await?
        .ok_or_else(|| AppError::not_found("Offer"))?;

    if ReviewRepository::exists_for_offer(&state.db, user.id, req.service_offer_id).await? {
        return Err(AppError::Validation(
            "You have already reviewed this offer".to_string(),
        ));
    }

    let comment = non_blank(req.comment);
    let review = ReviewRepository::create(
        &state.db,
        req.user_id,
        user.id,
        req.service_offer_id,
        req.rating,
        comment.as_deref(),
    )
    .await?;
    tracing::info!(
        review_id = review.id,
        provider_id = req.user_id,
        rating = req.rating,
        "Review created"
    );

    rerate(&state, review.user_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Review created", review)),
    ))
}

/// Reviewer-only edit, open for a limited time after creation.
///
/// # Route
///
/// `PUT /api/reviews/{id}`
pub async fn update_review(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateReviewRequest>,
) -> AppResult<Json<DataResponse<Review>>> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let review = own_review(&state, &user, id).await?;
    if !review.is_editable_at(Utc::now()) {
        return Err(AppError::Validation(
            "Reviews can only be edited within 24 hours".to_string(),
        ));
    }

    let comment = req.comment_change();
    let updated = ReviewRepository::update(
        &state.db,
        id,
        req.rating,
        comment.as_ref().map(Option::as_deref),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Review"))?;

    if req.rating.is_some() {
        rerate(&state, updated.user_id).await?;
    }

    Ok(Json(DataResponse::new("Review updated", updated)))
}

/// # Route
///
/// `DELETE /api/reviews/{id}`
pub async fn delete_review(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    let review = own_review(&state, &user, id).await?;

    ReviewRepository::delete(&state.db, id).await?;
    tracing::info!(review_id = id, reviewer_id = user.id, "Review deleted");

    rerate(&state, review.user_id).await?;

    Ok(Json(MessageResponse::new("Review deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_decimal() {
        assert!((one_decimal(4.666_666) - 4.7).abs() < f64::EPSILON);
        assert!((one_decimal(4.04) - 4.0).abs() < f64::EPSILON);
        assert!(one_decimal(0.0).abs() < f64::EPSILON);
    }
}
