//! Platform settings, badges and service categories.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use super::ensure_admin;
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    non_blank, BadgeUpdateRequest, CategoryQuery, CategoryRequest, DataResponse, MessageResponse,
    UpdateSettingsRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    Badge, BadgeRepository, Category, CategoryRepository, CategoryWithCount, SettingRepository,
    SystemSetting,
};
use crate::services::settings;
use crate::utils::slugify;

/// # Route
///
/// `GET /api/admin/settings`
pub async fn list_settings(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<Vec<SystemSetting>>> {
    ensure_admin(&admin)?;
    Ok(Json(SettingRepository::all(&state.db).await?))
}

/// Updates known keys and drops their cached values. Unknown keys are ignored.
///
/// # Route
///
/// `PUT /api/admin/settings`
pub async fn update_settings(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<UpdateSettingsRequest>,
) -> AppResult<Json<DataResponse<Vec<SystemSetting>>>> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let mut updated = Vec::with_capacity(req.settings.len());
    for (key, value) in &req.settings {
        if SettingRepository::set_value(&state.db, key, value.trim()).await? {
            updated.push(key.clone());
        } else {
            tracing::debug!(key = %key, "Ignoring unknown setting");
        }
    }

    settings::invalidate(&state.cache, &updated).await;
    tracing::info!(count = updated.len(), admin_id = admin.id, "Settings updated");

    let all = SettingRepository::all(&state.db).await?;
    Ok(Json(DataResponse::new("Settings updated", all)))
}

/// # Route
///
/// `GET /api/admin/badges`
pub async fn list_badges(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<Vec<Badge>>> {
    ensure_admin(&admin)?;
    Ok(Json(BadgeRepository::all(&state.db).await?))
}

/// Badges are a fixed set; only their presentation and threshold change.
///
/// # Route
///
/// `PUT /api/admin/badges/{id}`
pub async fn update_badge(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<BadgeUpdateRequest>,
) -> AppResult<Json<DataResponse<Badge>>> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let badge = BadgeRepository::update(
        &state.db,
        id,
        req.name.as_deref().map(str::trim),
        req.threshold,
        req.icon.as_deref(),
        req.description.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Badge"))?;
    tracing::info!(
        badge_id = id,
        threshold = badge.threshold,
        admin_id = admin.id,
        "Badge updated"
    );

    Ok(Json(DataResponse::new("Badge updated", badge)))
}

/// # Route
///
/// `GET /api/admin/categories`
pub async fn list_categories(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Json<Vec<CategoryWithCount>>> {
    ensure_admin(&admin)?;

    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    Ok(Json(CategoryRepository::with_counts(&state.db, search, query.popular).await?))
}

async fn checked_name(
    state: &AppState,
    name: &str,
    except_id: Option<i64>,
) -> AppResult<(String, String)> {
    let name = name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "The category name must contain letters or digits".to_string(),
        ));
    }
    if CategoryRepository::name_taken(&state.db, name, except_id).await? {
        return Err(AppError::Validation(
            "A category with this name already exists".to_string(),
        ));
    }
    Ok((name.to_string(), slug))
}

/// # Route
///
/// `POST /api/admin/categories`
pub async fn create_category(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Category>>)> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let (name, slug) = checked_name(&state, &req.name, None).await?;
    let icon = non_blank(req.icon);
    let description = non_blank(req.description);

    let category = CategoryRepository::create(
        &state.db,
        &name,
        &slug,
        icon.as_deref(),
        description.as_deref(),
    )
    .await?;
    tracing::info!(category_id = category.id, slug = %category.slug, "Category created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("Category created", category)),
    ))
}

/// # Route
///
/// `PUT /api/admin/categories/{id}`
pub async fn update_category(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<CategoryRequest>,
) -> AppResult<Json<DataResponse<Category>>> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let (name, slug) = checked_name(&state, &req.name, Some(id)).await?;
    let icon = non_blank(req.icon);
    let description = non_blank(req.description);

    let category = CategoryRepository::update(
        &state.db,
        id,
        &name,
        &slug,
        icon.as_deref(),
        description.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Category"))?;

    Ok(Json(DataResponse::new("Category updated", category)))
}

/// Categories still used by offers cannot be deleted.
///
/// # Route
///
/// `DELETE /api/admin/categories/{id}`
pub async fn delete_category(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    ensure_admin(&admin)?;

    let in_use = CategoryRepository::offers_count(&state.db, id).await?;
    if in_use > 0 {
        return Err(AppError::Validation(format!(
            "This category is used by {in_use} offer(s) and cannot be deleted"
        )));
    }

    if !CategoryRepository::delete(&state.db, id).await? {
        return Err(AppError::not_found("Category"));
    }
    tracing::info!(category_id = id, admin_id = admin.id, "Category deleted");

    Ok(Json(MessageResponse::new("Category deleted")))
}
