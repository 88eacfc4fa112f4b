//! Redis cache configuration module.

use crate::config::env::{get_env, APP_CONFIG};
use crate::error::{AppError, AppResult};
use deadpool_redis::{Config, Pool, PoolConfig, Runtime};
use once_cell::sync::OnceCell;

static CACHE_POOL: OnceCell<Pool> = OnceCell::new();

/// Builds the Redis connection URL from environment variables.
pub fn redis_url() -> String {
    let host = get_env("REDIS_HOST", Some("localhost"));
    let port = get_env("REDIS_PORT", Some("6379"));
    let password = get_env("REDIS_PASSWORD", None);

    if password.is_empty() {
        format!("redis://{host}:{port}")
    } else {
        format!("redis://:{password}@{host}:{port}")
    }
}

/// Creates a Redis pool without opening a connection.
pub fn build_cache_pool() -> AppResult<Pool> {
    let mut cfg = Config::from_url(redis_url());
    cfg.pool = Some(PoolConfig {
        max_size: APP_CONFIG.redis_max_connections,
        ..PoolConfig::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1))
        .map_err(|e| AppError::Internal(format!("Redis pool error: {e}")))
}

/// Initializes the Redis connection pool.
///
/// The pool is stored in a global `OnceCell`; subsequent calls return a clone
/// of the same pool. A connection is checked out once to fail fast.
pub async fn init_cache() -> AppResult<Pool> {
    if let Some(pool) = CACHE_POOL.get() {
        return Ok(pool.clone());
    }

    let pool = build_cache_pool()?;

    let conn = pool
        .get()
        .await
        .map_err(|e| AppError::Internal(format!("Redis connection test failed: {e}")))?;
    drop(conn);

    CACHE_POOL.set(pool.clone()).ok();
    tracing::info!(
        max_connections = APP_CONFIG.redis_max_connections,
        "Redis connection pool established"
    );

    Ok(pool)
}

/// Closes the Redis connection pool.
///
/// Note: The pool handles cleanup automatically when dropped.
pub fn close_cache() {
    if let Some(pool) = CACHE_POOL.get() {
        pool.close();
    }
    tracing::info!("Redis connection pool closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_url_scheme() {
        assert!(redis_url().starts_with("redis://"));
    }

    #[tokio::test]
    async fn test_build_cache_pool_is_lazy() {
        // Creating the pool must not require a running Redis server
        let pool = build_cache_pool();
        assert!(pool.is_ok());
    }
}
