//! Account management.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use validator::Validate;

use crate::api::handlers::audit;
use crate::api::middlewares::{ensure_permission, request_origin, AuthUser};
use crate::api::schemas::{
    non_blank, AdminListQuery, CreateUserRequest, DataResponse, MeResponse, MessageResponse,
    UpdateUserRequest, WarnUserRequest,
};
use crate::api::state::AppState;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    actions, roles, ClientRepository, NewUser, ProviderChanges, ProviderRepository, Role,
    RoleRepository, User, UserRepository,
};
use crate::services::notifier;
use crate::utils::{hash_password, Page, PageParams};

const USERS_PER_PAGE: i64 = 20;

async fn find_user(state: &AppState, id: i64) -> AppResult<User> {
    UserRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}

async fn find_role(state: &AppState, role_id: i64) -> AppResult<Role> {
    RoleRepository::find_by_id(&state.db, role_id)
        .await?
        .ok_or_else(|| AppError::Validation("The selected role is invalid".to_string()))
}

fn ensure_not_self(admin: &User, target_id: i64, action: &str) -> AppResult<()> {
    if admin.id == target_id {
        return Err(AppError::Forbidden(format!("You cannot {action} your own account")));
    }
    Ok(())
}

/// Creates the provider or client profile a role needs, when missing.
async fn ensure_profile(state: &AppState, user: &User) -> AppResult<()> {
    if user.role == roles::PROVIDER
        && ProviderRepository::find_by_user_id(&state.db, user.id).await?.is_none()
    {
        ProviderRepository::create(&state.db, user.id, &ProviderChanges::default()).await?;
    } else if user.role == roles::CLIENT
        && ClientRepository::find_by_user_id(&state.db, user.id).await?.is_none()
    {
        ClientRepository::create(&state.db, user.id, None).await?;
    }
    Ok(())
}

/// # Route
///
/// `GET /api/admin/users`
pub async fn list_users(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Query(page): Query<PageParams>,
    Query(query): Query<AdminListQuery>,
) -> AppResult<Json<Page<User>>> {
    ensure_permission(&state, &admin, "users.view").await?;

    let (users, total) =
        UserRepository::search(&state.db, query.search(), query.role(), page).await?;
    Ok(Json(Page::new(users, page, USERS_PER_PAGE, total)))
}

/// # Route
///
/// `GET /api/admin/users/{id}`
pub async fn show_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MeResponse>> {
    ensure_permission(&state, &admin, "users.view").await?;

    let user = find_user(&state, id).await?;
    let provider = ProviderRepository::find_by_user_id(&state.db, id).await?;
    let client = ClientRepository::find_by_user_id(&state.db, id).await?;

    Ok(Json(MeResponse {
        user,
        provider,
        client,
    }))
}

/// # Route
///
/// `POST /api/admin/users`
pub async fn create_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<User>>)> {
    ensure_permission(&state, &admin, "users.create").await?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let role = find_role(&state, req.role_id).await?;
    let email = req.email.trim().to_lowercase();
    if UserRepository::email_taken(&state.db, &email, None).await? {
        return Err(AppError::Validation("The email has already been taken".to_string()));
    }

    let new_user = NewUser {
        name: req.name.trim().to_string(),
        first_name: None,
        last_name: None,
        email,
        phone: non_blank(req.phone),
        address: non_blank(req.address),
        password_hash: hash_password(&req.password)?,
        role: role.slug,
        role_id: Some(role.id),
    };

    let user = UserRepository::create(&state.db, &new_user).await?;
    ensure_profile(&state, &user).await?;
    tracing::info!(
        user_id = user.id,
        role = %user.role,
        admin_id = admin.id,
        "Account created by admin"
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse::new("User created", user)),
    ))
}

/// # Route
///
/// `PUT /api/admin/users/{id}`
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<User>>> {
    ensure_permission(&state, &admin, "users.edit").await?;
    req.validate().map_err(|e| e.to_validation_error())?;
    find_user(&state, id).await?;

    if let Some(email) = req.email.as_deref() {
        if UserRepository::email_taken(&state.db, email.trim(), Some(id)).await? {
            return Err(AppError::Validation("The email has already been taken".to_string()));
        }
    }

    let role = match req.role_id {
        Some(role_id) => Some(find_role(&state, role_id).await?.slug),
        None => None,
    };

    let mut changes = req.changes(role);
    changes.email = changes.email.map(|e| e.to_lowercase());
    let user = UserRepository::update(&state.db, id, &changes)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    if let Some(password) = req.password.as_deref() {
        UserRepository::set_password_hash(&state.db, id, &hash_password(password)?).await?;
    }
    ensure_profile(&state, &user).await?;
    tracing::info!(user_id = id, admin_id = admin.id, "Account updated by admin");

    Ok(Json(DataResponse::new("User updated", user)))
}

/// Activates or suspends an account.
///
/// # Route
///
/// `POST /api/admin/users/{id}/toggle-status`
pub async fn toggle_user_status(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<DataResponse<User>>> {
    ensure_permission(&state, &admin, "users.block").await?;
    ensure_not_self(&admin, id, "suspend")?;

    let user = find_user(&state, id).await?;
    UserRepository::set_active(&state.db, id, !user.is_active).await?;
    tracing::info!(
        user_id = id,
        is_active = !user.is_active,
        admin_id = admin.id,
        "Account status toggled"
    );

    let user = find_user(&state, id).await?;
    let message = if user.is_active {
        "User activated"
    } else {
        "User suspended"
    };
    Ok(Json(DataResponse::new(message, user)))
}

/// # Route
///
/// `DELETE /api/admin/users/{id}`
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> AppResult<Json<MessageResponse>> {
    ensure_permission(&state, &admin, "users.delete").await?;
    ensure_not_self(&admin, id, "delete")?;

    if !UserRepository::delete(&state.db, id).await? {
        return Err(AppError::not_found("User"));
    }
    tracing::info!(user_id = id, admin_id = admin.id, "Account deleted by admin");

    Ok(Json(MessageResponse::new("User deleted")))
}

/// Records a warning in the audit trail and notifies the user.
///
/// # Route
///
/// `POST /api/admin/users/{id}/warn`
pub async fn warn_user(
    State(state): State<AppState>,
    Extension(AuthUser(admin)): Extension<AuthUser>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(req): Json<WarnUserRequest>,
) -> AppResult<Json<MessageResponse>> {
    ensure_permission(&state, &admin, "users.block").await?;
    req.validate().map_err(|e| e.to_validation_error())?;

    let user = find_user(&state, id).await?;
    let reason = req.reason.trim();

    audit(
        &state.db,
        Some(user.id),
        actions::WARN,
        &format!("Warned by {}: {reason}", admin.name),
        &request_origin(&headers),
    )
    .await;
    notifier::account_warning(&state.db, user.id, reason).await;
    tracing::info!(user_id = user.id, admin_id = admin.id, "User warned");

    Ok(Json(MessageResponse::new(format!("{} has been warned", user.name))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn admin() -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Admin".to_string(),
            first_name: None,
            last_name: None,
            email: "admin@example.com".to_string(),
            phone: None,
            address: None,
            password_hash: String::new(),
            role: roles::ADMIN.to_string(),
            role_id: Some(1),
            is_active: true,
            token_version: 0,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_admin_cannot_target_self() {
        assert!(matches!(
            ensure_not_self(&admin(), 1, "delete"),
            Err(AppError::Forbidden(_))
        ));
        assert!(ensure_not_self(&admin(), 2, "delete").is_ok());
    }
}
