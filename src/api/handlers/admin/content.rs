//! Read-only oversight of offers and missions.

use axum::{
    extract::{Query, State},
    Extension, Json,
};

use crate::api::middlewares::{ensure_permission, AuthUser};
use crate::api::schemas::AdminListQuery;
use crate::api::state::AppState;
use crate::error::AppResult;
use crate::models::{OfferListing, OfferRepository, RequestListing, ServiceRequestRepository};
use crate::utils::{Page, PageParams};

const PER_PAGE: i64 = 20;

/// # Route
///
/// `GET /api/admin/offers`
pub async fn list_offers(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<Page<OfferListing>>> {
    ensure_permission(&state, &admin, "requests.view").await?;

    let (offers, total) =
        OfferRepository::list_all(&state.db, query.search(), query.status(), page).await?;
    Ok(Json(Page::new(offers, page, PER_PAGE, total)))
}

/// Every service request, whatever its status.
///
/// # Route
///
/// `GET /api/admin/missions`
pub async fn list_missions(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<Page<RequestListing>>> {
    ensure_permission(&state, &admin, "requests.view").await?;

    let (missions, total) =
        ServiceRequestRepository::list_all(&state.db, query.search(), query.status(), page).await?;
    Ok(Json(Page::new(missions, page, PER_PAGE, total)))
}
