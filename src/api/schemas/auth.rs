//! Account and session schemas.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{roles, Client, Provider, User};

fn validate_signup_role(role: &str) -> Result<(), ValidationError> {
    if role == roles::PROVIDER || role == roles::CLIENT {
        Ok(())
    } else {
        Err(ValidationError::new("role").with_message("Role must be provider or client".into()))
    }
}

pub(crate) fn validate_client_type(client_type: &str) -> Result<(), ValidationError> {
    if client_type == "individual" || client_type == "company" {
        Ok(())
    } else {
        Err(ValidationError::new("type").with_message("Type must be individual or company".into()))
    }
}

/// Sign-up request. Provider fields are read only for provider accounts.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub first_name: Option<String>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub last_name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    pub password_confirmation: String,

    #[validate(custom(function = "validate_signup_role"))]
    pub role: String,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[validate(custom(function = "validate_client_type"))]
    #[serde(default, rename = "type")]
    pub client_type: Option<String>,

    #[serde(default)]
    pub category_id: Option<i64>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub city: Option<String>,

    #[validate(range(min = 0.0, message = "Hourly rate cannot be negative"))]
    #[serde(default)]
    pub hourly_rate: Option<f64>,

    #[serde(default)]
    pub skills: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub experience: Option<String>,

    #[serde(default)]
    pub diplomas: Option<String>,

    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Token payload returned by sign-up and login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: User,
}

impl AuthResponse {
    pub const fn bearer(access_token: String, user: User) -> Self {
        Self {
            access_token,
            token_type: "Bearer",
            user,
        }
    }
}

/// Current account with its role profile.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub provider: Option<Provider>,
    pub client: Option<Client>,
}

/// Minimal public card of an account.
#[derive(Debug, Serialize)]
pub struct BasicInfoResponse {
    pub id: i64,
    pub name: String,
    pub role: String,
    pub provider: Option<Provider>,
    pub client: Option<Client>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Password confirmation does not match"))]
    pub password_confirmation: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn register_body() -> serde_json::Value {
        json!({
            "name": "Awa Diop",
            "email": "awa@example.com",
            "password": "secret-pass",
            "password_confirmation": "secret-pass",
            "role": "provider",
            "city": "Dakar"
        })
    }

    #[test]
    fn test_register_request_valid() {
        let req: RegisterRequest = serde_json::from_value(register_body()).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.city.as_deref(), Some("Dakar"));
    }

    #[test]
    fn test_register_rejects_admin_role() {
        let mut body = register_body();
        body["role"] = json!("admin");
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_rejects_mismatched_confirmation() {
        let mut body = register_body();
        body["password_confirmation"] = json!("other-pass");
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_rejects_short_password() {
        let mut body = register_body();
        body["password"] = json!("short");
        body["password_confirmation"] = json!("short");
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_register_client_type() {
        let mut body = register_body();
        body["role"] = json!("client");
        body["type"] = json!("company");
        let req: RegisterRequest = serde_json::from_value(body.clone()).unwrap();
        assert!(req.validate().is_ok());

        body["type"] = json!("association");
        let req: RegisterRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_login_request_requires_email() {
        let req: LoginRequest =
            serde_json::from_value(json!({"email": "not-an-email", "password": "x"})).unwrap();
        assert!(req.validate().is_err());
    }
}
