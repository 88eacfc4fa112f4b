//! Roles and their permissions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use validator::Validate;

use crate::api::middlewares::{ensure_permission, AuthUser};
use crate::api::schemas::{
    DataResponse, MessageResponse, PermissionsResponse, RoleRequest, UpdateRoleRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{group_by_module, Role, RoleRepository, RoleWithPermissions};
use crate::utils::slugify;

async fn find_role(state: &AppState, id: i64) -> AppResult<Role> {
    RoleRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Role"))
}

/// # Route
///
/// `GET /api/admin/roles`
pub async fn list_roles(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<Vec<RoleWithPermissions>>> {
    ensure_permission(&state, &admin, "roles.view").await?;
    Ok(Json(RoleRepository::all_with_permissions(&state.db).await?))
}

/// Every permission, flat and grouped by module prefix.
///
/// # Route
///
/// `GET /api/admin/permissions`
pub async fn list_permissions(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
) -> AppResult<Json<PermissionsResponse>> {
    ensure_permission(&state, &admin, "roles.view").await?;

    let permissions = RoleRepository::permissions(&state.db).await?;
    let grouped = group_by_module(&permissions);

    Ok(Json(PermissionsResponse {
        permissions,
        grouped,
    }))
}

/// # Route
///
/// `POST /api/admin/roles`
pub async fn create_role(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<RoleRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RoleWithPermissions>>)> {
    ensure_permission(&state, &admin, "roles.create").await?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let name = req.name.trim();
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(AppError::Validation(
            "The role name must contain letters or digits".to_string(),
        ));
    }
    if RoleRepository::slug_taken(&state.db, &slug).await? {
        return Err(AppError::Validation("A role with this name already exists".to_string()));
    }

    let role = RoleRepository::create(&state.db, name, &slug).await?;
    if !req.permissions.is_empty() {
        RoleRepository::sync_permissions(&state.db, role.id, &req.permissions).await?;
    }
    tracing::info!(role_id = role.id, slug = %role.slug, admin_id = admin.id, "Role created");

    let role = RoleRepository::with_permissions(&state.db, role).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new("Role created", role))))
}

/// Renames a role and optionally replaces its permissions. The slug never changes.
///
/// # Route
///
/// `PUT /api/admin/roles/{id}`
pub async fn update_role(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateRoleRequest>,
) -> AppResult<Json<DataResponse<RoleWithPermissions>>> {
    ensure_permission(&state, &admin, "roles.edit").await?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let mut role = find_role(&state, id).await?;

    if let Some(name) = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        role = RoleRepository::rename(&state.db, id, name)
            .await?
            .ok_or_else(|| AppError::not_found("Role"))?;
    }
    if let Some(permissions) = req.permissions.as_deref() {
        RoleRepository::sync_permissions(&state.db, id, permissions).await?;
    }
    tracing::info!(role_id = id, admin_id = admin.id, "Role updated");

    let role = RoleRepository::with_permissions(&state.db, role).await?;
    Ok(Json(DataResponse::new("Role updated", role)))
}

/// System roles and roles still held by accounts cannot be deleted.
///
/// # Route
///
/// `DELETE /api/admin/roles/{id}`
pub async fn delete_role(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    ensure_permission(&state, &admin, "roles.delete").await?;

    let role = find_role(&state, id).await?;
    if role.is_protected() {
        return Err(AppError::Forbidden("System roles cannot be deleted".to_string()));
    }

    let holders = RoleRepository::users_count(&state.db, &role).await?;
    if holders > 0 {
        return Err(AppError::BadRequest(format!(
            "This role is assigned to {holders} user(s) and cannot be deleted"
        )));
    }

    RoleRepository::delete(&state.db, id).await?;
    tracing::info!(role_id = id, slug = %role.slug, admin_id = admin.id, "Role deleted");

    Ok(Json(MessageResponse::new("Role deleted")))
}
