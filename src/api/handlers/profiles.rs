//! Provider directory and profile handlers.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde_json::Value;
use validator::Validate;

use super::{ensure_category, own_provider_profile};
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    certificate_id, AvailabilityRequest, CertificateResponse, ClientProfileRequest, DataResponse,
    MeResponse, ProviderProfileRequest, ProviderProfileResponse, VisibilityResponse,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    BadgeRepository, ClientRepository, GradeRepository, Provider, ProviderFilter, ProviderListing,
    ProviderRepository, ReviewRepository, UserRepository, CERTIFIED_BADGE,
};
use crate::services::scoring::ScoreWeights;
use crate::utils::{Page, PageParams};

const PROVIDERS_PER_PAGE: i64 = 12;

async fn find_listing(state: &AppState, user_id: i64) -> AppResult<ProviderListing> {
    ProviderRepository::find_listing(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Provider"))
}

/// Full profile: grade, badges, score and received reviews.
async fn profile_response(
    state: &AppState,
    listing: ProviderListing,
) -> AppResult<ProviderProfileResponse> {
    let provider = &listing.provider;

    let grade = match provider.grade_id {
        Some(id) => GradeRepository::find_by_id(&state.db, id).await?,
        None => None,
    };
    let badges = BadgeRepository::held_by(&state.db, provider.id).await?;
    let is_certified = badges.iter().any(|badge| badge.slug == CERTIFIED_BADGE);
    let pro_score = ScoreWeights::load(&state.db, &state.cache)
        .await?
        .score(provider.missions_count, provider.rating);
    let reviews = ReviewRepository::received_by(&state.db, provider.user_id).await?;

    Ok(ProviderProfileResponse {
        provider: listing,
        grade,
        badges,
        is_certified,
        pro_score,
        reviews,
    })
}

/// Public directory of visible providers, best rated first.
///
/// # Route
///
/// `GET /api/providers`
pub async fn list_providers(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Query(filter): Query<ProviderFilter>,
) -> AppResult<Json<Page<ProviderListing>>> {
    let (providers, total) = ProviderRepository::list(&state.db, &filter, page).await?;
    Ok(Json(Page::new(providers, page, PROVIDERS_PER_PAGE, total)))
}

/// Public profile by account id. Hidden providers are not found.
///
/// # Route
///
/// `GET /api/providers/{id}`
pub async fn show_provider(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<ProviderProfileResponse>> {
    let listing = find_listing(&state, user_id).await?;
    if !listing.provider.is_visible {
        return Err(AppError::not_found("Provider"));
    }

    Ok(Json(profile_response(&state, listing).await?))
}

/// # Route
///
/// `GET /api/provider/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<ProviderProfileResponse>> {
    let listing = find_listing(&state, user.id).await?;
    Ok(Json(profile_response(&state, listing).await?))
}

/// Updates the account contact fields and the provider profile together.
///
/// # Route
///
/// `PUT /api/provider/profile`
pub async fn update_provider_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ProviderProfileRequest>,
) -> AppResult<Json<DataResponse<ProviderListing>>> {
    req.validate().map_err(|e| e.to_validation_error())?;

    ensure_category(&state.db, req.category_id).await?;

    UserRepository::update(&state.db, user.id, &req.user_changes()).await?;
    ProviderRepository::update_profile(&state.db, user.id, &req.provider_changes())
        .await?
        .ok_or_else(|| AppError::not_found("Provider profile"))?;
    tracing::info!(user_id = user.id, "Provider profile updated");

    let listing = find_listing(&state, user.id).await?;
    Ok(Json(DataResponse::new("Profile updated", listing)))
}

/// Replaces the weekly calendar.
///
/// # Route
///
/// `PUT /api/provider/availability`
pub async fn update_availability(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<AvailabilityRequest>,
) -> AppResult<Json<DataResponse<Provider>>> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let calendar = Value::Object(req.availabilities);
    let provider = ProviderRepository::set_availabilities(&state.db, user.id, &calendar)
        .await?
        .ok_or_else(|| AppError::not_found("Provider profile"))?;

    Ok(Json(DataResponse::new("Availability updated", provider)))
}

/// # Route
///
/// `POST /api/provider/visibility`
pub async fn toggle_visibility(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<VisibilityResponse>> {
    let is_visible = ProviderRepository::toggle_visibility(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Provider profile"))?;
    tracing::info!(user_id = user.id, is_visible, "Provider visibility toggled");

    let message = if is_visible {
        "Your profile is now visible"
    } else {
        "Your profile is now hidden"
    };

    Ok(Json(VisibilityResponse {
        message: message.to_string(),
        is_visible,
    }))
}

/// Certificate data, for certified providers only.
///
/// # Route
///
/// `GET /api/provider/certificate`
pub async fn certificate(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<CertificateResponse>> {
    let provider = own_provider_profile(&state.db, user.id).await?;

    if !BadgeRepository::holds(&state.db, provider.id, CERTIFIED_BADGE).await? {
        return Err(AppError::Forbidden(
            "The certificate is only available to certified providers".to_string(),
        ));
    }

    let listing = find_listing(&state, user.id).await?;
    Ok(Json(CertificateResponse {
        certificate_id: certificate_id(provider.id),
        issued_at: Utc::now(),
        provider: listing,
    }))
}

/// # Route
///
/// `PUT /api/client/profile`
pub async fn update_client_profile(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    Json(req): Json<ClientProfileRequest>,
) -> AppResult<Json<DataResponse<MeResponse>>> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let user = UserRepository::update(&state.db, user.id, &req.user_changes())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let client = match req.client_type.as_deref() {
        Some(client_type) => {
            Some(ClientRepository::upsert_type(&state.db, user.id, Some(client_type)).await?)
        }
        None => ClientRepository::find_by_user_id(&state.db, user.id).await?,
    };
    tracing::info!(user_id = user.id, "Client profile updated");

    Ok(Json(DataResponse::new(
        "Profile updated",
        MeResponse {
            user,
            provider: None,
            client,
        },
    )))
}
