//! Centralized error handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type.
///
/// All errors in the application should be converted to this type
/// for consistent error handling and reporting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Bad request error (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Unauthorized error (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden error (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found error (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict error (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (422)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis cache error
    #[error("Cache error: {0}")]
    Redis(#[from] deadpool_redis::redis::RedisError),

    /// Redis pool error
    #[error("Cache pool error: {0}")]
    RedisPool(#[from] deadpool_redis::PoolError),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Password hashing error
    #[error("Password hash error: {0}")]
    PasswordHash(String),
}

impl AppError {
    /// Shorthand for a 404 on a named resource.
    pub fn not_found(resource: &str) -> Self {
        Self::NotFound(format!("{resource} not found"))
    }
}

impl From<argon2::password_hash::Error> for AppError {
    fn from(e: argon2::password_hash::Error) -> Self {
        Self::PasswordHash(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            Self::Database(sqlx::Error::RowNotFound) => {
                (StatusCode::NOT_FOUND, "Resource not found".to_string())
            }
            // Constraint races the handlers' own checks lost.
            Self::Database(sqlx::Error::Database(e)) if e.is_unique_violation() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "This record already exists".to_string(),
            ),
            Self::Database(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "A referenced record does not exist".to_string(),
            ),
            Self::Database(e) => {
                tracing::error!("Database error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            Self::Redis(e) => {
                tracing::error!("Redis error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cache error occurred".to_string(),
                )
            }
            Self::RedisPool(e) => {
                tracing::error!("Redis pool error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Cache connection error occurred".to_string(),
                )
            }
            Self::Jwt(e) => {
                tracing::warn!("JWT error: {e:?}");
                (StatusCode::UNAUTHORIZED, format!("JWT error: {e}"))
            }
            Self::Json(e) => {
                tracing::error!("JSON error: {e:?}");
                (StatusCode::BAD_REQUEST, format!("JSON error: {e}"))
            }
            Self::PasswordHash(e) => {
                tracing::error!("Password hash error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Credential processing error".to_string(),
                )
            }
        };

        // Report error to Sentry for server errors
        if status.is_server_error() {
            sentry::capture_error(&self);
        }

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Helper trait for converting validation errors.
pub trait ValidationErrorExt {
    fn to_validation_error(&self) -> AppError;
}

impl ValidationErrorExt for validator::ValidationErrors {
    fn to_validation_error(&self) -> AppError {
        // Get the first field error for a clean message
        if let Some((field, errors)) = self.field_errors().iter().next() {
            if let Some(error) = errors.first() {
                let message = error.message.as_ref().map_or_else(
                    || {
                        format!(
                            "Validation failed on field '{field}' with tag '{}'",
                            error.code
                        )
                    },
                    std::string::ToString::to_string,
                );
                return AppError::Validation(message);
            }
        }
        AppError::Validation(self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn test_app_error_display_messages() {
        assert_eq!(
            AppError::BadRequest("bad input".to_string()).to_string(),
            "Bad request: bad input"
        );
        assert_eq!(
            AppError::Forbidden("not yours".to_string()).to_string(),
            "Forbidden: not yours"
        );
        assert_eq!(
            AppError::Conflict("already applied".to_string()).to_string(),
            "Conflict: already applied"
        );
        assert_eq!(
            AppError::Validation("rating too high".to_string()).to_string(),
            "Validation error: rating too high"
        );
    }

    #[test]
    fn test_not_found_helper() {
        let error = AppError::not_found("Offer");
        assert!(matches!(&error, AppError::NotFound(msg) if msg == "Offer not found"));
    }

    #[tokio::test]
    async fn test_status_codes() {
        let cases = vec![
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_row_not_found_maps_to_404() {
        let error: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[derive(Debug)]
    struct ConstraintError(sqlx::error::ErrorKind);

    impl std::fmt::Display for ConstraintError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("constraint violated")
        }
    }

    impl std::error::Error for ConstraintError {}

    impl sqlx::error::DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.0 {
                sqlx::error::ErrorKind::UniqueViolation => sqlx::error::ErrorKind::UniqueViolation,
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    sqlx::error::ErrorKind::ForeignKeyViolation
                }
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    fn constraint_error(kind: sqlx::error::ErrorKind) -> AppError {
        sqlx::Error::Database(Box::new(ConstraintError(kind))).into()
    }

    #[tokio::test]
    async fn test_duplicate_row_is_unprocessable() {
        let error = constraint_error(sqlx::error::ErrorKind::UniqueViolation);
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_unknown_reference_is_unprocessable() {
        let error = constraint_error(sqlx::error::ErrorKind::ForeignKeyViolation);
        assert_eq!(
            error.into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[tokio::test]
    async fn test_other_database_errors_stay_internal() {
        let error = constraint_error(sqlx::error::ErrorKind::Other);
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_password_hash_error_is_server_error() {
        let error = AppError::PasswordHash("salt".to_string());
        assert_eq!(
            error.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_json_error_into_response() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
        assert_eq!(app_err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_error_response_body_is_json() {
        use axum::body::to_bytes;

        let error = AppError::NotFound("conversation not found".to_string());
        let response = error.into_response();

        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(parsed["error"], "conversation not found");
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        use axum::body::to_bytes;

        let error: AppError = sqlx::Error::PoolTimedOut.into();
        let response = error.into_response();
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let body_str = String::from_utf8_lossy(&body);

        assert!(body_str.contains("Database error occurred"));
        assert!(!body_str.contains("PoolTimedOut"));
    }

    #[test]
    fn test_validation_error_ext_empty_errors() {
        let errors = validator::ValidationErrors::new();
        assert!(matches!(
            errors.to_validation_error(),
            AppError::Validation(_)
        ));
    }

    #[test]
    fn test_validation_error_ext_uses_field_message() {
        use validator::Validate;

        #[derive(Validate)]
        struct Rated {
            #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
            rating: i32,
        }

        let errors = Rated { rating: 9 }.validate().unwrap_err();
        let app_error = errors.to_validation_error();
        match app_error {
            AppError::Validation(msg) => assert_eq!(msg, "Rating must be between 1 and 5"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
