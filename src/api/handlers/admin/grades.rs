//! Grade tiers and their attribution to providers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use super::ensure_admin;
use crate::api::handlers::own_provider_profile;
use crate::api::middlewares::AuthUser;
use crate::api::schemas::{
    AssignGradeRequest, DataResponse, GradeRequest, MessageResponse, RevokeAttributionRequest,
    SyncResponse,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    AttributionKind, AttributionListing, AttributionRepository, Grade, GradeAttribution,
    GradeFields, GradeRepository, ProviderRepository,
};
use crate::services::grades;

const RECENT_ATTRIBUTIONS: i64 = 20;

async fn find_grade(state: &AppState, id: i64) -> AppResult<Grade> {
    GradeRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Grade"))
}

async fn ensure_slug_free(
    state: &AppState,
    slug: Option<&str>,
    except_id: Option<i64>,
) -> AppResult<()> {
    if let Some(slug) = slug {
        if GradeRepository::slug_taken(&state.db, slug, except_id).await? {
            return Err(AppError::Validation(
                "A grade with this slug already exists".to_string(),
            ));
        }
    }
    Ok(())
}

/// Grades from the lowest tier up.
///
/// # Route
///
/// `GET /api/admin/grades`
pub async fn list_grades(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<Vec<Grade>>> {
    ensure_admin(&admin)?;
    Ok(Json(GradeRepository::all(&state.db).await?))
}

/// # Route
///
/// `POST /api/admin/grades`
pub async fn create_grade(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<GradeRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Grade>>)> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;
    if !req.is_complete() {
        return Err(AppError::Validation(
            "Name, slug and all three thresholds are required".to_string(),
        ));
    }

    let fields = GradeFields::from(req);
    ensure_slug_free(&state, fields.slug.as_deref(), None).await?;

    let grade = GradeRepository::create(&state.db, &fields).await?;
    tracing::info!(grade_id = grade.id, slug = %grade.slug, admin_id = admin.id, "Grade created");

    Ok((StatusCode::CREATED, Json(DataResponse::new("Grade created", grade))))
}

/// # Route
///
/// `PUT /api/admin/grades/{id}`
pub async fn update_grade(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<GradeRequest>,
) -> AppResult<Json<DataResponse<Grade>>> {
    ensure_admin(&admin)?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let fields = GradeFields::from(req);
    ensure_slug_free(&state, fields.slug.as_deref(), Some(id)).await?;

    let grade = GradeRepository::update(&state.db, id, &fields)
        .await?
        .ok_or_else(|| AppError::not_found("Grade"))?;

    Ok(Json(DataResponse::new("Grade updated", grade)))
}

/// # Route
///
/// `DELETE /api/admin/grades/{id}`
pub async fn delete_grade(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    ensure_admin(&admin)?;

    if !GradeRepository::delete(&state.db, id).await? {
        return Err(AppError::not_found("Grade"));
    }
    tracing::info!(grade_id = id, admin_id = admin.id, "Grade deleted");

    Ok(Json(MessageResponse::new("Grade deleted")))
}

/// Forces a grade on a provider, bypassing the thresholds.
///
/// # Route
///
/// `POST /api/admin/grades/assign`
pub async fn assign_grade(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<AssignGradeRequest>,
) -> AppResult<Json<DataResponse<GradeAttribution>>> {
    ensure_admin(&admin)?;

    let grade = find_grade(&state, req.grade_id).await?;
    let provider = own_provider_profile(&state.db, req.user_id).await?;

    ProviderRepository::set_grade(&state.db, provider.id, Some(grade.id)).await?;
    let attribution = AttributionRepository::record(
        &state.db,
        provider.id,
        grade.id,
        Some(admin.id),
        AttributionKind::Manual,
    )
    .await?;
    tracing::info!(
        provider_id = provider.id,
        grade = %grade.slug,
        admin_id = admin.id,
        "Grade assigned manually"
    );

    Ok(Json(DataResponse::new(
        format!("Grade {} assigned", grade.name),
        attribution,
    )))
}

/// Re-evaluates every provider against the thresholds.
///
/// # Route
///
/// `POST /api/admin/grades/sync`
pub async fn sync_grades(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<SyncResponse>> {
    ensure_admin(&admin)?;

    let changes = grades::sync_all(&state.db).await?;
    Ok(Json(SyncResponse {
        message: format!("{changes} provider grade(s) updated"),
        changes,
    }))
}

/// Deletes an attribution. The provider loses the grade only if it is still the current one.
///
/// # Route
///
/// `POST /api/admin/grades/revoke`
pub async fn revoke_attribution(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<RevokeAttributionRequest>,
) -> AppResult<Json<MessageResponse>> {
    ensure_admin(&admin)?;

    let attribution = AttributionRepository::find_by_id(&state.db, req.attribution_id)
        .await?
        .ok_or_else(|| AppError::not_found("Attribution"))?;

    let cleared = ProviderRepository::clear_grade_if(
        &state.db,
        attribution.provider_id,
        attribution.grade_id,
    )
    .await?;
    AttributionRepository::delete(&state.db, attribution.id).await?;
    tracing::info!(
        attribution_id = attribution.id,
        provider_id = attribution.provider_id,
        cleared,
        admin_id = admin.id,
        "Grade attribution revoked"
    );

    Ok(Json(MessageResponse::new("Attribution revoked")))
}

/// Latest attributions, after bringing every provider up to date.
///
/// # Route
///
/// `GET /api/admin/grades/attributions`
pub async fn recent_attributions(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<Vec<AttributionListing>>> {
    ensure_admin(&admin)?;

    grades::sync_all(&state.db).await?;
    Ok(Json(AttributionRepository::recent(&state.db, RECENT_ATTRIBUTIONS).await?))
}
