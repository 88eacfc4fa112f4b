//! Provider and client profile schemas.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

use super::auth::validate_client_type;
use super::non_blank;
use crate::models::{Badge, Grade, ProviderChanges, ProviderListing, ReviewListing, UserChanges};

const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

/// Profile update shared by the account and provider tables.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProviderProfileRequest {
    #[validate(length(max = 255))]
    #[serde(default)]
    pub first_name: Option<String>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub last_name: Option<String>,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

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

    #[serde(default)]
    pub is_available: Option<bool>,
}

impl ProviderProfileRequest {
    pub fn user_changes(&self) -> UserChanges {
        UserChanges {
            first_name: non_blank(self.first_name.clone()),
            last_name: non_blank(self.last_name.clone()),
            phone: non_blank(self.phone.clone()),
            address: non_blank(self.address.clone()),
            ..UserChanges::default()
        }
    }

    pub fn provider_changes(&self) -> ProviderChanges {
        ProviderChanges {
            category_id: self.category_id,
            city: non_blank(self.city.clone()),
            hourly_rate: self.hourly_rate,
            skills: self.skills.clone(),
            description: self.description.clone(),
            experience: self.experience.clone(),
            diplomas: self.diplomas.clone(),
            birth_date: self.birth_date,
            is_available: self.is_available,
        }
    }
}

fn validate_calendar(calendar: &Map<String, Value>) -> Result<(), ValidationError> {
    for (day, slot) in calendar {
        if !WEEKDAYS.contains(&day.as_str()) {
            return Err(ValidationError::new("availabilities")
                .with_message(format!("Unknown weekday '{day}'").into()));
        }
        if !slot.get("active").is_some_and(Value::is_boolean) {
            return Err(ValidationError::new("availabilities")
                .with_message(format!("'{day}' needs a boolean 'active' flag").into()));
        }
    }
    Ok(())
}

/// Weekly calendar keyed by lowercase weekday.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AvailabilityRequest {
    #[validate(custom(function = "validate_calendar"))]
    pub availabilities: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ClientProfileRequest {
    #[validate(length(max = 255))]
    #[serde(default)]
    pub first_name: Option<String>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub last_name: Option<String>,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,

    #[validate(custom(function = "validate_client_type"))]
    #[serde(default, rename = "type")]
    pub client_type: Option<String>,
}

impl ClientProfileRequest {
    pub fn user_changes(&self) -> UserChanges {
        UserChanges {
            first_name: non_blank(self.first_name.clone()),
            last_name: non_blank(self.last_name.clone()),
            phone: non_blank(self.phone.clone()),
            address: non_blank(self.address.clone()),
            ..UserChanges::default()
        }
    }
}

/// Provider as shown to everyone.
#[derive(Debug, Serialize)]
pub struct ProviderProfileResponse {
    #[serde(flatten)]
    pub provider: ProviderListing,
    pub grade: Option<Grade>,
    pub badges: Vec<Badge>,
    pub is_certified: bool,
    pub pro_score: f64,
    pub reviews: Vec<ReviewListing>,
}

#[derive(Debug, Serialize)]
pub struct VisibilityResponse {
    pub message: String,
    pub is_visible: bool,
}

#[derive(Debug, Serialize)]
pub struct CertificateResponse {
    pub certificate_id: String,
    pub issued_at: DateTime<Utc>,
    pub provider: ProviderListing,
}

/// Certificate number derived from the provider profile id.
pub fn certificate_id(provider_id: i64) -> String {
    format!("VAL-{provider_id:06}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_certificate_id_padding() {
        assert_eq!(certificate_id(7), "VAL-000007");
        assert_eq!(certificate_id(1_234_567), "VAL-1234567");
    }

    #[test]
    fn test_availability_accepts_weekdays() {
        let req: AvailabilityRequest = serde_json::from_value(json!({
            "availabilities": {
                "monday": {"active": true, "start": "08:00", "end": "12:00"},
                "sunday": {"active": false}
            }
        }))
        .unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_availability_rejects_unknown_day() {
        let req: AvailabilityRequest = serde_json::from_value(json!({
            "availabilities": {"funday": {"active": true}}
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_availability_requires_active_flag() {
        let req: AvailabilityRequest = serde_json::from_value(json!({
            "availabilities": {"monday": {"start": "08:00"}}
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_provider_profile_split() {
        let req: ProviderProfileRequest = serde_json::from_value(json!({
            "first_name": "Awa",
            "phone": " ",
            "city": "Thiès",
            "hourly_rate": 15.5
        }))
        .unwrap();

        let user = req.user_changes();
        let provider = req.provider_changes();

        assert_eq!(user.first_name.as_deref(), Some("Awa"));
        assert!(user.phone.is_none());
        assert!(user.email.is_none());
        assert_eq!(provider.city.as_deref(), Some("Thiès"));
        assert_eq!(provider.hourly_rate, Some(15.5));
    }

    #[test]
    fn test_client_profile_type() {
        let req: ClientProfileRequest = serde_json::from_value(json!({"type": "company"})).unwrap();
        assert!(req.validate().is_ok());

        let req: ClientProfileRequest = serde_json::from_value(json!({"type": "ngo"})).unwrap();
        assert!(req.validate().is_err());
    }
}
