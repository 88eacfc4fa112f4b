//! Service offer schemas.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use super::non_blank;
use crate::models::{OfferFields, OfferStatus};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOfferRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,

    #[serde(default)]
    pub category_id: Option<i64>,

    #[serde(default)]
    pub requirements: Option<String>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub estimated_duration: Option<String>,

    #[serde(default)]
    pub material_required: Option<String>,

    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    #[serde(default)]
    pub budget: Option<f64>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub desired_date: Option<NaiveDate>,
}

impl From<CreateOfferRequest> for OfferFields {
    fn from(req: CreateOfferRequest) -> Self {
        Self {
            category_id: req.category_id,
            title: Some(req.title.trim().to_string()),
            description: Some(req.description),
            requirements: non_blank(req.requirements),
            estimated_duration: non_blank(req.estimated_duration),
            material_required: non_blank(req.material_required),
            budget: req.budget,
            location: non_blank(req.location),
            desired_date: req.desired_date,
            status: None,
        }
    }
}

/// Partial offer update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateOfferRequest {
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(min = 1, message = "Description cannot be empty"))]
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category_id: Option<i64>,

    #[serde(default)]
    pub requirements: Option<String>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub estimated_duration: Option<String>,

    #[serde(default)]
    pub material_required: Option<String>,

    #[validate(range(min = 0.0, message = "Budget cannot be negative"))]
    #[serde(default)]
    pub budget: Option<f64>,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub desired_date: Option<NaiveDate>,

    #[serde(default)]
    pub status: Option<OfferStatus>,
}

impl From<UpdateOfferRequest> for OfferFields {
    fn from(req: UpdateOfferRequest) -> Self {
        Self {
            category_id: req.category_id,
            title: non_blank(req.title),
            description: req.description,
            requirements: req.requirements,
            estimated_duration: req.estimated_duration,
            material_required: req.material_required,
            budget: req.budget,
            location: req.location,
            desired_date: req.desired_date,
            status: req.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_offer_requires_title() {
        let req: CreateOfferRequest =
            serde_json::from_value(json!({"title": "", "description": "Fix a leak"})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_offer_into_fields() {
        let req: CreateOfferRequest = serde_json::from_value(json!({
            "title": "  Kitchen sink  ",
            "description": "Fix a leak",
            "budget": 80.0,
            "location": " ",
            "desired_date": "2026-03-02"
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let fields = OfferFields::from(req);
        assert_eq!(fields.title.as_deref(), Some("Kitchen sink"));
        assert!(fields.location.is_none());
        assert_eq!(fields.desired_date, NaiveDate::from_ymd_opt(2026, 3, 2));
        assert!(fields.status.is_none());
    }

    #[test]
    fn test_update_offer_negative_budget() {
        let req: UpdateOfferRequest = serde_json::from_value(json!({"budget": -1.0})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_update_offer_status() {
        let req: UpdateOfferRequest =
            serde_json::from_value(json!({"status": "cancelled"})).unwrap();
        assert_eq!(OfferFields::from(req).status, Some(OfferStatus::Cancelled));

        let archived = serde_json::from_value::<UpdateOfferRequest>(json!({"status": "archived"}));
        assert!(archived.is_err());
    }
}
