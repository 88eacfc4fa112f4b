//! Account and session handlers.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use cookie::{Cookie, SameSite};
use validator::Validate;

use super::{audit, ensure_category};
use crate::api::middlewares::{request_origin, AuthUser};
use crate::api::schemas::{
    non_blank, AuthResponse, BasicInfoResponse, ForgotPasswordRequest, LoginRequest,
    MeResponse, MessageResponse, RegisterRequest, ResetPasswordRequest, UpdatePasswordRequest,
};
use crate::api::state::AppState;
use crate::config::APP_CONFIG;
use crate::error::{AppError, AppResult, ValidationErrorExt};
use crate::models::{
    actions, roles, ClientRepository, NewUser, PasswordResetRepository, ProviderChanges,
    ProviderRepository, User, UserRepository,
};
use crate::utils::{gen_rand_str, gen_token, hash_password, verify_password, RESET_TOKEN_LEN};

const TOKEN_COOKIE: &str = "token";

/// Builds the http-only session cookie. `Secure` is set in production.
fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie_builder = Cookie::build((TOKEN_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    if APP_CONFIG.is_production {
        cookie_builder = cookie_builder.secure(true);
    }

    cookie_builder.build()
}

/// Issues a token for `user` and stores it in the cookie jar.
fn sign_in(jar: CookieJar, user: User) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let token = gen_token(user.id, &user.role, user.token_version)?;
    let jar = jar.add(session_cookie(token.clone()));
    Ok((jar, Json(AuthResponse::bearer(token, user))))
}

fn sign_out(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(TOKEN_COOKIE).path("/"))
}

/// Account sign-up.
///
/// Creates the account and its provider or client profile in one
/// transaction.
///
/// # Route
///
/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    req.validate().map_err(|e| e.to_validation_error())?;

    let email = req.email.trim().to_lowercase();
    if UserRepository::email_taken(&state.db, &email, None).await? {
        return Err(AppError::Validation(
            "The email has already been taken".to_string(),
        ));
    }
    if req.role == roles::PROVIDER {
        ensure_category(&state.db, req.category_id).await?;
    }

    let new_user = NewUser {
        name: req.name.trim().to_string(),
        first_name: non_blank(req.first_name.clone()),
        last_name: non_blank(req.last_name.clone()),
        email,
        phone: non_blank(req.phone.clone()),
        address: non_blank(req.address.clone()),
        password_hash: hash_password(&req.password)?,
        role: req.role.clone(),
        role_id: None,
    };

    let mut tx = state.db.begin().await?;
    let user = UserRepository::create(&mut *tx, &new_user).await?;

    if user.role == roles::PROVIDER {
        let profile = ProviderChanges {
            category_id: req.category_id,
            city: non_blank(req.city),
            hourly_rate: req.hourly_rate,
            skills: req.skills,
            description: req.description,
            experience: req.experience,
            diplomas: req.diplomas,
            birth_date: req.birth_date,
            is_available: Some(true),
        };
        ProviderRepository::create(&mut *tx, user.id, &profile).await?;
    } else {
        ClientRepository::create(&mut *tx, user.id, req.client_type.as_deref()).await?;
    }
    tx.commit().await?;

    tracing::info!(user_id = user.id, role = %user.role, "Account registered");
    audit(
        &state.db,
        Some(user.id),
        actions::REGISTER,
        &format!("New {} account", user.role),
        &request_origin(&headers),
    )
    .await;

    let (jar, body) = sign_in(jar, user)?;
    Ok((StatusCode::CREATED, jar, body))
}

/// Credential login.
///
/// Failed attempts are written to the audit trail so that repeated
/// failures surface as security alerts.
///
/// # Route
///
/// `POST /api/login`
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    req.validate().map_err(|e| e.to_validation_error())?;
    let origin = request_origin(&headers);

    let user = match UserRepository::find_by_email(&state.db, req.email.trim()).await? {
        Some(user) if verify_password(&req.password, &user.password_hash) => user,
        found => {
            let user_id = found.map(|u| u.id);
            tracing::warn!(?user_id, ip = ?origin.ip_address, "Failed login attempt");
            audit(
                &state.db,
                user_id,
                actions::LOGIN_FAILED,
                &format!("Failed login for {}", req.email.trim()),
                &origin,
            )
            .await;
            return Err(AppError::Validation("Invalid credentials".to_string()));
        }
    };

    if !user.is_active {
        audit(
            &state.db,
            Some(user.id),
            actions::LOGIN_FAILED,
            "Login attempt on a deactivated account",
            &origin,
        )
        .await;
        return Err(AppError::Validation("This account has been deactivated".to_string()));
    }

    audit(&state.db, Some(user.id), actions::LOGIN, "Logged in", &origin).await;
    sign_in(jar, user)
}

/// Revokes every token issued to the caller.
///
/// # Route
///
/// `POST /api/logout`
pub async fn logout(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    headers: HeaderMap,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    UserRepository::bump_token_version(&state.db, user.id).await?;
    audit(&state.db, Some(user.id), actions::LOGOUT, "Logged out", &request_origin(&headers)).await;

    Ok((sign_out(jar), Json(MessageResponse::new("Logged out successfully"))))
}

/// # Route
///
/// `GET /api/me`
pub async fn me(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
) -> AppResult<Json<MeResponse>> {
    let provider = ProviderRepository::find_by_user_id(&state.db, user.id).await?;
    let client = ClientRepository::find_by_user_id(&state.db, user.id).await?;

    Ok(Json(MeResponse {
        user,
        provider,
        client,
    }))
}

/// Public card of any account.
///
/// # Route
///
/// `GET /api/users/{id}/basic-info`
pub async fn basic_info(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<BasicInfoResponse>> {
    let user = UserRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    let provider = ProviderRepository::find_by_user_id(&state.db, user.id).await?;
    let client = ClientRepository::find_by_user_id(&state.db, user.id).await?;

    Ok(Json(BasicInfoResponse {
        id: user.id,
        name: user.name,
        role: user.role,
        provider,
        client,
    }))
}

/// Changes the caller's password.
///
/// Every previous token is revoked, so a fresh one is returned.
///
/// # Route
///
/// `PUT /api/password`
pub async fn update_password(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    headers: HeaderMap,
    jar: CookieJar,
    Json(req): Json<UpdatePasswordRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    req.validate().map_err(|e| e.to_validation_error())?;

    if !verify_password(&req.current_password, &user.password_hash) {
        return Err(AppError::Validation("The current password is incorrect".to_string()));
    }

    let password_hash = hash_password(&req.password)?;
    UserRepository::set_password_hash(&state.db, user.id, &password_hash).await?;

    audit(
        &state.db,
        Some(user.id),
        actions::UPDATE_PASSWORD,
        "Password changed",
        &request_origin(&headers),
    )
    .await;

    let user = UserRepository::find_by_id(&state.db, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    sign_in(jar, user)
}

/// Deletes the caller's account and everything attached to it.
///
/// # Route
///
/// `DELETE /api/account`
pub async fn delete_account(
    State(state): State<AppState>,
    Extension(AuthUser(user)): Extension<AuthUser>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    UserRepository::delete(&state.db, user.id).await?;
    tracing::info!(user_id = user.id, "Account deleted by its owner");

    Ok((sign_out(jar), Json(MessageResponse::new("Account deleted"))))
}

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for this email, a password reset link has been sent";

/// Issues a password reset token.
///
/// The answer is the same whether or not the address is known.
///
/// # Route
///
/// `POST /api/forgot-password`
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    req.validate().map_err(|e| e.to_validation_error())?;

    if let Some(user) = UserRepository::find_by_email(&state.db, req.email.trim()).await? {
        let token = gen_rand_str(RESET_TOKEN_LEN);
        let token_hash = hash_password(&token)?;
        PasswordResetRepository::upsert(&state.db, &user.email, &token_hash).await?;

        tracing::info!(user_id = user.id, "Password reset token issued");
        if !APP_CONFIG.is_production {
            tracing::debug!(email = %user.email, %token, "Password reset token (development only)");
        }
    }

    Ok(Json(MessageResponse::new(FORGOT_PASSWORD_MESSAGE)))
}

/// Sets a new password from a reset token.
///
/// # Route
///
/// `POST /api/reset-password`
pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    req.validate().map_err(|e| e.to_validation_error())?;
    let invalid =
        || AppError::Validation("This password reset token is invalid or expired".to_string());

    let user = UserRepository::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    let reset = PasswordResetRepository::find(&state.db, &user.email)
        .await?
        .ok_or_else(invalid)?;

    if reset.is_expired_at(Utc::now(), APP_CONFIG.password_reset_ttl_minutes) {
        PasswordResetRepository::delete(&state.db, &user.email).await?;
        return Err(invalid());
    }

    if !verify_password(&req.token, &reset.token_hash) {
        return Err(invalid());
    }

    let password_hash = hash_password(&req.password)?;
    UserRepository::set_password_hash(&state.db, user.id, &password_hash).await?;
    PasswordResetRepository::delete(&state.db, &user.email).await?;

    audit(
        &state.db,
        Some(user.id),
        actions::RESET_PASSWORD,
        "Password reset through token",
        &request_origin(&headers),
    )
    .await;

    Ok(Json(MessageResponse::new("Your password has been reset")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_flags() {
        let cookie = session_cookie("abc".to_string());

        assert_eq!(cookie.name(), TOKEN_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn test_sign_out_clears_token_cookie() {
        let jar = CookieJar::new().add(session_cookie("abc".to_string()));
        assert!(jar.get(TOKEN_COOKIE).is_some());

        let jar = sign_out(jar);
        assert!(jar.get(TOKEN_COOKIE).is_none());
    }
}
