//! Cached access to platform settings.
//!
//! Values are read through Redis (MessagePack encoded) and fall back to the
//! database. Cache failures are logged and never surface to the caller.

use deadpool_redis::redis::AsyncCommands;
use deadpool_redis::Pool as RedisPool;
use sqlx::PgPool;

use crate::config::APP_CONFIG;
use crate::error::AppResult;
use crate::models::SettingRepository;

fn cache_key(key: &str) -> String {
    format!("setting:{key}")
}

/// Raw value of a setting, `None` when unknown or unset.
pub async fn get_value(db: &PgPool, cache: &RedisPool, key: &str) -> AppResult<Option<String>> {
    let cache_key = cache_key(key);

    let mut conn = match cache.get().await {
        Ok(conn) => Some(conn),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, reading setting from database");
            None
        }
    };

    if let Some(conn) = conn.as_mut() {
        if let Ok(cached) = conn.get::<_, Vec<u8>>(&cache_key).await {
            if let Ok(value) = rmp_serde::from_slice::<Option<String>>(&cached) {
                return Ok(value);
            }
        }
    }

    let value = SettingRepository::value_of(db, key).await?;

    if let Some(conn) = conn.as_mut() {
        match rmp_serde::to_vec(&value) {
            Ok(data) => {
                let result: Result<(), deadpool_redis::redis::RedisError> = conn
                    .set_ex(&cache_key, data, APP_CONFIG.settings_cache_ttl_secs)
                    .await;

                if let Err(e) = result {
                    tracing::error!(cache_key = %cache_key, error = %e, "Failed to cache setting");
                }
            }
            Err(e) => {
                tracing::error!(cache_key = %cache_key, error = %e, "Failed to serialize setting");
            }
        }
    }

    Ok(value)
}

/// Setting parsed as a number, `default` when missing or malformed.
pub async fn get_f64(db: &PgPool, cache: &RedisPool, key: &str, default: f64) -> AppResult<f64> {
    let value = get_value(db, cache, key).await?;
    Ok(parse_or(value.as_deref(), default))
}

fn parse_or(value: Option<&str>, default: f64) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Drops cached values so the next read hits the database.
pub async fn invalidate(cache: &RedisPool, keys: &[String]) {
    if keys.is_empty() {
        return;
    }

    let cache_keys: Vec<String> = keys.iter().map(|k| cache_key(k)).collect();

    match cache.get().await {
        Ok(mut conn) => {
            let result: Result<(), deadpool_redis::redis::RedisError> = conn.del(&cache_keys).await;
            if let Err(e) = result {
                tracing::error!(
                    error = %e,
                    count = cache_keys.len(),
                    "Failed to invalidate settings cache"
                );
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "Redis unavailable, settings cache not invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_prefix() {
        assert_eq!(cache_key("score_weight_mission"), "setting:score_weight_mission");
    }

    #[test]
    fn test_parse_or() {
        assert!((parse_or(Some("12.5"), 1.0) - 12.5).abs() < f64::EPSILON);
        assert!((parse_or(Some(" 7 "), 1.0) - 7.0).abs() < f64::EPSILON);
        assert!((parse_or(Some("abc"), 3.0) - 3.0).abs() < f64::EPSILON);
        assert!((parse_or(Some("NaN"), 3.0) - 3.0).abs() < f64::EPSILON);
        assert!((parse_or(None, 4.0) - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_cached_value_roundtrip_keeps_unset() {
        let encoded = rmp_serde::to_vec(&None::<String>).unwrap();
        let decoded: Option<String> = rmp_serde::from_slice(&encoded).unwrap();
        assert!(decoded.is_none());
    }
}
