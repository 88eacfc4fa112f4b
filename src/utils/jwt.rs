//! JWT utility module.
//!
//! Provides access token generation and parsing. The subject is the user id;
//! `ver` carries the user's token version so that logout and password resets
//! invalidate every previously issued token.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::config::get_env;
use crate::error::AppResult;

/// Minimum recommended length for JWT secrets.
const MIN_SECRET_LENGTH: usize = 32;

static JWT_SECRET: Lazy<String> = Lazy::new(|| {
    let secret = get_env("JWT_SECRET", None);
    let env_mode = get_env("RUST_ENV", Some("development"));
    let is_production = env_mode == "production" || env_mode == "prod";

    if secret.is_empty() {
        assert!(
            !is_production,
            "JWT_SECRET must be set in production environment"
        );
        tracing::warn!(
            "JWT_SECRET not set - using insecure default. \
             Set RUST_ENV=production to enforce security requirements."
        );
        "default-secret-change-me-in-production".to_string()
    } else {
        if secret.len() < MIN_SECRET_LENGTH {
            tracing::warn!(
                "JWT_SECRET is shorter than {} characters. \
                 Consider using a longer secret for better security.",
                MIN_SECRET_LENGTH
            );
        }
        secret
    }
});

static JWT_EXPIRATION: Lazy<i64> = Lazy::new(|| {
    get_env("JWT_EXPIRATION_HOURS", Some("24"))
        .parse()
        .unwrap_or(24)
});

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: i64,
    /// Role slug at issue time
    pub role: String,
    /// Token version of the user at issue time
    pub ver: i32,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// Generates an access token for the given user.
#[must_use = "the generated token should be used"]
pub fn gen_token(user_id: i64, role: &str, token_version: i32) -> AppResult<String> {
    let now = chrono::Utc::now().timestamp();
    let exp = now + (*JWT_EXPIRATION * 3600);

    let claims = Claims {
        sub: user_id,
        role: role.to_string(),
        ver: token_version,
        exp,
        iat: now,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )?;

    Ok(token)
}

/// Parses and validates an access token.
#[must_use = "the parsed claims should be used"]
pub fn parse_token(token: &str) -> AppResult<Claims> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gen_and_parse_token() {
        let token = gen_token(42, "client", 0).expect("Failed to generate token");
        let claims = parse_token(&token).expect("Failed to parse token");
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "client");
        assert_eq!(claims.ver, 0);
    }

    #[test]
    fn test_token_carries_version() {
        let token = gen_token(7, "provider", 3).expect("Failed to generate token");
        let claims = parse_token(&token).expect("Failed to parse token");
        assert_eq!(claims.ver, 3);
    }

    #[test]
    fn test_claims_expiry_window() {
        let token = gen_token(1, "admin", 0).expect("Failed to generate token");
        let claims = parse_token(&token).expect("Failed to parse token");
        let now = chrono::Utc::now().timestamp();
        assert!(claims.exp > now);
        assert!(claims.iat <= now);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for token in ["", "nodotshere", "one.dot", "invalid.token.here"] {
            assert!(parse_token(token).is_err(), "accepted {token:?}");
        }
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let token = gen_token(1, "client", 0).expect("Failed to generate token");
        let (unsigned, _) = token.rsplit_once('.').unwrap();
        assert!(parse_token(&format!("{unsigned}.AAAA")).is_err());
    }
}
