//! Environment variable configuration module.
//!
//! Provides environment variable loading and the global `APP_CONFIG` instance.

use std::env;
use std::sync::Once;

use once_cell::sync::Lazy;

static INIT: Once = Once::new();

/// Initializes the environment by loading the .env file.
/// This is called automatically when `get_env` is first used.
fn init_env() {
    INIT.call_once(|| {
        if let Err(e) = dotenvy::dotenv() {
            tracing::warn!("Warning: .env file not found or error loading: {}", e);
        }
    });
}

/// Retrieves an environment variable by key.
///
/// If the variable is not set, returns the provided default value.
/// If no default is provided and the variable is not set, returns an empty string.
pub fn get_env(key: &str, default: Option<&str>) -> String {
    init_env();
    env::var(key).unwrap_or_else(|_| default.unwrap_or("").to_string())
}

/// Retrieves an environment variable as a parsed type.
pub fn get_env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    init_env();
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Server settings
    pub server_port: String,

    // Environment
    pub is_production: bool,

    // Sentry settings
    pub sentry_dsn: String,
    pub sentry_traces_sample_rate: f32,

    // Database settings
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_idle_timeout_secs: u64,
    pub db_max_lifetime_secs: u64,

    // Cache settings
    pub settings_cache_ttl_secs: u64,
    pub redis_max_connections: usize,

    // CORS settings
    pub cors_origins: String,

    // Rate limiting
    pub rate_limit_per_second: u64,
    pub rate_limit_burst_size: u32,

    // Accounts
    pub password_reset_ttl_minutes: i64,
    pub last_seen_throttle_secs: i64,

    // Migration
    pub run_migrations: bool,
}

impl AppConfig {
    /// Creates a new `AppConfig` from environment variables.
    pub fn from_env() -> Self {
        let rust_env = get_env("RUST_ENV", Some("development"));
        let is_production = rust_env == "production" || rust_env == "prod";

        Self {
            server_port: get_env("SERVER_PORT", Some("3000")),

            is_production,

            sentry_dsn: get_env("SENTRY_DSN", None),
            sentry_traces_sample_rate: get_env_parsed("SENTRY_TRACES_SAMPLE_RATE", 0.1),

            db_max_connections: get_env_parsed("DB_MAX_CONNECTIONS", 20),
            db_min_connections: get_env_parsed("DB_MIN_CONNECTIONS", 2),
            db_acquire_timeout_secs: get_env_parsed("DB_ACQUIRE_TIMEOUT_SECS", 5),
            db_idle_timeout_secs: get_env_parsed("DB_IDLE_TIMEOUT_SECS", 600),
            db_max_lifetime_secs: get_env_parsed("DB_MAX_LIFETIME_SECS", 1800),

            settings_cache_ttl_secs: get_env_parsed("SETTINGS_CACHE_TTL_SECS", 3600),
            redis_max_connections: get_env_parsed("REDIS_MAX_CONNECTIONS", 20),

            cors_origins: get_env("CORS_ORIGINS", Some("*")),

            rate_limit_per_second: get_env_parsed("RATE_LIMIT_PER_SECOND", 10),
            rate_limit_burst_size: get_env_parsed("RATE_LIMIT_BURST_SIZE", 50),

            password_reset_ttl_minutes: get_env_parsed("PASSWORD_RESET_TTL_MINUTES", 60),
            last_seen_throttle_secs: get_env_parsed("LAST_SEEN_THROTTLE_SECS", 60),

            run_migrations: get_env("RUN_MIGRATIONS", Some("true")) == "true",
        }
    }
}

/// Global application configuration instance.
pub static APP_CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_with_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_12345", Some("default_value"));
        assert_eq!(result, "default_value");
    }

    #[test]
    fn test_get_env_no_default() {
        let result = get_env("NON_EXISTENT_VAR_FOR_TEST_67890", None);
        assert_eq!(result, "");
    }

    #[test]
    fn test_get_env_parsed_defaults() {
        let as_u32: u32 = get_env_parsed("NON_EXISTENT_U32_VAR", 42);
        let as_i64: i64 = get_env_parsed("NON_EXISTENT_I64_VAR", -7);
        let as_f32: f32 = get_env_parsed("NON_EXISTENT_F32_VAR", 0.5);
        assert_eq!(as_u32, 42);
        assert_eq!(as_i64, -7);
        assert!((as_f32 - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_app_config_from_env() {
        let config = AppConfig::from_env();

        assert!(!config.server_port.is_empty());
        assert!(config.db_max_connections >= config.db_min_connections);
        assert!(config.settings_cache_ttl_secs > 0);
        assert!(config.rate_limit_per_second > 0);
        assert!(config.rate_limit_burst_size > 0);
        assert!(config.redis_max_connections > 0);
    }

    #[test]
    fn test_app_config_account_windows_positive() {
        let config = AppConfig::from_env();
        assert!(config.password_reset_ttl_minutes > 0);
        assert!(config.last_seen_throttle_secs > 0);
    }

    #[test]
    fn test_app_config_sentry_traces_sample_rate_range() {
        let config = AppConfig::from_env();
        assert!(config.sentry_traces_sample_rate >= 0.0);
        assert!(config.sentry_traces_sample_rate <= 1.0);
    }

    #[test]
    fn test_app_config_debug_lists_fields() {
        let debug_str = format!("{:?}", AppConfig::from_env());
        assert!(debug_str.contains("AppConfig"));
        assert!(debug_str.contains("settings_cache_ttl_secs"));
        assert!(debug_str.contains("is_production"));
    }

    #[test]
    fn test_app_config_global_instance() {
        let port1 = APP_CONFIG.server_port.clone();
        let port2 = APP_CONFIG.server_port.clone();
        assert!(!port1.is_empty());
        assert_eq!(port1, port2);
    }
}
