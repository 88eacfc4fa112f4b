//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::api::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// Liveness probe handler.
///
/// Returns OK if the server is running.
///
/// # Route
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,
    pub database: &'static str,
    pub cache: &'static str,
}

impl ReadinessResponse {
    fn from_checks(db_ok: bool, cache_ok: bool) -> Self {
        let label = |ok: bool| if ok { "connected" } else { "disconnected" };
        Self {
            status: if db_ok && cache_ok { "ok" } else { "degraded" },
            database: label(db_ok),
            cache: label(cache_ok),
        }
    }
}

/// Readiness probe handler.
///
/// Checks database and cache connectivity.
///
/// # Route
///
/// `GET /ready`
pub async fn readiness_handler(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let db_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();
    let cache_ok = state.cache.get().await.is_ok();

    let response = ReadinessResponse::from_checks(db_ok, cache_ok);
    if db_ok && cache_ok {
        Ok(Json(response))
    } else {
        tracing::warn!(db_ok, cache_ok, "Readiness check failed");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_handler_reports_version() {
        let Json(body) = health_handler().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_readiness_labels() {
        let ok = ReadinessResponse::from_checks(true, true);
        assert_eq!(ok.status, "ok");
        assert_eq!(ok.cache, "connected");

        let degraded = ReadinessResponse::from_checks(true, false);
        assert_eq!(degraded.status, "degraded");
        assert_eq!(degraded.database, "connected");
        assert_eq!(degraded.cache, "disconnected");
    }
}
