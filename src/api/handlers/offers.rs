//! Service offer handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use super::ensure_category;
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    CreateOfferRequest, DataResponse, MessageResponse, UpdateOfferRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    Category, CategoryRepository, Offer, OfferFields, OfferFilter, OfferListing, OfferRepository,
    User,
};
use crate::utils::{Page, PageParams};

const OFFERS_PER_PAGE: i64 = 10;

/// Loads an offer and checks that `user` owns it.
async fn owned_offer(state: &AppState, user: &User, id: i64) -> AppResult<Offer> {
    let offer = OfferRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Offer"))?;

    if offer.user_id != user.id {
        return Err(AppError::Forbidden("You do not own this offer".to_string()));
    }
    Ok(offer)
}

/// Public catalogue of active offers.
///
/// # Route
///
/// `GET /api/offers`
pub async fn list_offers(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<OfferFilter>,
) -> AppResult<Json<Page<OfferListing>>> {
    let (offers, total) = OfferRepository::list_active(&state.db, &filter, page).await?;
    Ok(Json(Page::new(offers, page, OFFERS_PER_PAGE, total)))
}

/// # Route
///
/// `GET /api/offers/{id}`
pub async fn show_offer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OfferListing>> {
    let offer = OfferRepository::find_listing(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Offer"))?;

    Ok(Json(offer))
}

/// Categories in alphabetical order.
///
/// # Route
///
/// `GET /api/categories`
pub async fn list_categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(CategoryRepository::all(&state.db).await?))
}

/// Offers posted by the caller, all statuses.
///
/// # Route
///
/// `GET /api/client/offers`
pub async fn my_offers(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<Vec<OfferListing>>> {
    Ok(Json(OfferRepository::list_by_owner(&state.db, user.id).await?))
}

/// # Route
///
/// `POST /api/client/offers`
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<CreateOfferRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Offer>>)> {
    req.validate().map_err(|e| e.to_validation_error())?;
    ensure_category(&state.db, req.category_id).await?;

    let offer = OfferRepository::create(&state.db, user.id, &OfferFields::from(req)).await?;
    tracing::info!(offer_id = offer.id, user_id = user.id, "Offer created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Offer created", offer)),
    ))
}

/// Owner-only partial update.
///
/// # Route
///
/// `PUT /api/client/offers/{id}`
pub async fn update_offer(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOfferRequest>,
) -> AppResult<Json<DataResponse<Offer>>> {
    req.validate().map_err(|e| e.to_validation_error())?;
    owned_offer(&state, &user, id).await?;
    ensure_category(&state.db, req.category_id).await?;

    let offer = OfferRepository::update(&state.db, id, &OfferFields::from(req))
        .await?
        .ok_or_else(|| AppError::not_found("Offer"))?;
    tracing::info!(offer_id = id, status = %offer.status, "Offer updated");

    Ok(Json(DataResponse::new("Offer updated", offer)))
}

/// # Route
///
/// `DELETE /api/client/offers/{id}`
pub async fn delete_offer(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    owned_offer(&state, &user, id).await?;
    OfferRepository::delete(&state.db, id).await?;
    tracing::info!(offer_id = id, user_id = user.id, "Offer deleted");

    Ok(Json(MessageResponse::new("Offer deleted")))
}
