//! Middleware module.
//!
//! Provides authentication, role guards and request metadata helpers.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::api::state::AppState;
use crate::config::APP_CONFIG;
use crate::error::{AppError, AppResult};
use crate::models::{roles, RequestOrigin, RoleRepository, User, UserRepository};
use crate::utils::parse_token;

/// Permission that opens the admin area to non-admin roles.
pub const ADMIN_ACCESS: &str = "admin.access";

/// Authenticated account, stored in request extensions by [`jwt_auth`].
/// Can be extracted in handlers via axum's Extension extractor.
#[derive(Clone)]
pub struct AuthUser(pub User);

/// JWT Authentication Middleware.
///
/// Validates the Authorization header or cookie token, then loads the
/// account it names.
///
/// # Authentication Header Format
///
/// `Authorization: Bearer <token>`
///
/// # Process
///
/// 1. Read the token from the Bearer header, falling back to the `token` cookie
/// 2. Parse and validate the JWT
/// 3. Load the user and compare the token version
/// 4. Refresh `last_seen_at` (throttled)
/// 5. Store the user in request extensions
///
/// # Error Responses
///
/// - 401 Unauthorized: no token, invalid token, unknown user or revoked token
/// - 403 Forbidden: deactivated account
pub async fn jwt_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = extract_token(&request, &jar) else {
        return Err(AppError::Unauthorized("No token provided".to_string()));
    };

    let claims = parse_token(&token).map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = UserRepository::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

    if claims.ver != user.token_version {
        return Err(AppError::Unauthorized("Token has been revoked".to_string()));
    }

    if !user.is_active {
        return Err(AppError::Forbidden("Account is deactivated".to_string()));
    }

    let throttle_secs = APP_CONFIG.last_seen_throttle_secs;
    if let Err(e) = UserRepository::touch_last_seen(&state.db, user.id, throttle_secs).await {
        tracing::warn!(user_id = user.id, error = %e, "Failed to update last_seen_at");
    }

    request.extensions_mut().insert(AuthUser(user));
    Ok(next.run(request).await)
}

/// Extracts the JWT token from the request.
///
/// First checks the Authorization header for a Bearer token,
/// then falls back to checking cookies.
fn extract_token(request: &Request<Body>, jar: &CookieJar) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    jar.get("token").map(|c| c.value().to_string())
}

fn current_user(request: &Request<Body>) -> AppResult<&User> {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|AuthUser(user)| user)
        .ok_or_else(|| AppError::Unauthorized("Not authenticated".to_string()))
}

fn ensure_role(user: &User, role: &str) -> AppResult<()> {
    if user.role == role {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!("This area is reserved for the {role} role")))
    }
}

/// Only provider accounts pass. Must run after [`jwt_auth`].
pub async fn require_provider(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_role(current_user(&request)?, roles::PROVIDER)?;
    Ok(next.run(request).await)
}

/// Only client accounts pass. Must run after [`jwt_auth`].
pub async fn require_client(request: Request<Body>, next: Next) -> Result<Response, AppError> {
    ensure_role(current_user(&request)?, roles::CLIENT)?;
    Ok(next.run(request).await)
}

/// Admins, and roles granted `admin.access`, pass. Must run after [`jwt_auth`].
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    ensure_permission(&state, current_user(&request)?, ADMIN_ACCESS).await?;
    Ok(next.run(request).await)
}

/// Fails with 403 unless the user's role grants `permission`.
/// Admin accounts are always granted.
pub async fn ensure_permission(state: &AppState, user: &User, permission: &str) -> AppResult<()> {
    if user.is_admin() || RoleRepository::has_permission(&state.db, user.id, permission).await? {
        return Ok(());
    }

    Err(AppError::Forbidden(format!(
        "You do not have the required permission: {permission}"
    )))
}

/// Client address and agent for audit entries.
///
/// The address comes from `X-Forwarded-For` (first hop) or `X-Real-IP`.
pub fn request_origin(headers: &HeaderMap) -> RequestOrigin {
    fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    let ip_address = header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string);

    let user_agent = header_str(headers, header::USER_AGENT.as_str()).map(ToString::to_string);

    RequestOrigin {
        ip_address,
        user_agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, HeaderValue, Request};
    use axum_extra::extract::cookie::Cookie;
    use chrono::Utc;

    fn user(role: &str) -> User {
        let now = Utc::now();
        User {
            id: 1,
            name: "Test".to_string(),
            first_name: None,
            last_name: None,
            email: "test@example.com".to_string(),
            phone: None,
            address: None,
            password_hash: String::new(),
            role: role.to_string(),
            role_id: None,
            is_active: true,
            token_version: 0,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer test_token_123")
            .body(Body::empty())
            .unwrap();

        let jar = CookieJar::new();
        assert_eq!(extract_token(&request, &jar), Some("test_token_123".to_string()));
    }

    #[test]
    fn test_extract_token_no_bearer_prefix() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Basic abc123")
            .body(Body::empty())
            .unwrap();

        assert!(extract_token(&request, &CookieJar::new()).is_none());
    }

    #[test]
    fn test_extract_token_empty_bearer() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer ")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_token(&request, &CookieJar::new()), Some(String::new()));
    }

    #[test]
    fn test_extract_token_from_cookie() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let jar = CookieJar::new().add(Cookie::new("token", "cookie_token_456"));
        assert_eq!(extract_token(&request, &jar), Some("cookie_token_456".to_string()));
    }

    #[test]
    fn test_extract_token_header_takes_precedence() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer header_token")
            .body(Body::empty())
            .unwrap();

        let jar = CookieJar::new().add(Cookie::new("token", "cookie_token"));
        assert_eq!(extract_token(&request, &jar), Some("header_token".to_string()));
    }

    #[test]
    fn test_extract_token_wrong_cookie_name() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let jar = CookieJar::new().add(Cookie::new("auth_token", "wrong_cookie_name"));
        assert!(extract_token(&request, &jar).is_none());
    }

    #[test]
    fn test_extract_token_case_sensitive_bearer() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "bearer lowercase_token")
            .body(Body::empty())
            .unwrap();

        assert!(extract_token(&request, &CookieJar::new()).is_none());
    }

    #[test]
    fn test_ensure_role() {
        assert!(ensure_role(&user("provider"), roles::PROVIDER).is_ok());
        assert!(matches!(
            ensure_role(&user("client"), roles::PROVIDER),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_current_user_missing_is_unauthorized() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(matches!(current_user(&request), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_current_user_from_extensions() {
        let mut request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        request.extensions_mut().insert(AuthUser(user("client")));

        assert_eq!(current_user(&request).unwrap().role, "client");
    }

    #[test]
    fn test_request_origin_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8.0"));

        let origin = request_origin(&headers);

        assert_eq!(origin.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(origin.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[test]
    fn test_request_origin_real_ip_and_missing() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(request_origin(&headers).ip_address.as_deref(), Some("198.51.100.2"));

        let empty = request_origin(&HeaderMap::new());
        assert!(empty.ip_address.is_none());
        assert!(empty.user_agent.is_none());
    }
}
