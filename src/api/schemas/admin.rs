//! Back-office schemas.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::non_blank;
use crate::models::{GradeFields, Permission, UserChanges};

/// `?search=&role=&status=` filters shared by admin lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminListQuery {
    pub search: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

impl AdminListQuery {
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// `all` and blank values mean no filter.
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref().filter(|v| !v.is_empty() && *v != "all")
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().filter(|v| !v.is_empty() && *v != "all")
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub days: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub popular: bool,
}

/// Back-office counters.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users_count: i64,
    pub providers_count: i64,
    pub clients_count: i64,
    pub offers_count: i64,
    pub pending_reports_count: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    pub role_id: i64,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    #[serde(default)]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default)]
    pub role_id: Option<i64>,

    #[validate(length(max = 20))]
    #[serde(default)]
    pub phone: Option<String>,

    #[serde(default)]
    pub address: Option<String>,
}

impl UpdateUserRequest {
    /// Contact changes; the role slug is resolved by the caller.
    pub fn changes(&self, role: Option<String>) -> UserChanges {
        UserChanges {
            name: non_blank(self.name.clone()),
            email: non_blank(self.email.clone()),
            phone: non_blank(self.phone.clone()),
            address: non_blank(self.address.clone()),
            role,
            role_id: self.role_id,
            ..UserChanges::default()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WarnUserRequest {
    #[validate(length(min = 1, max = 500, message = "A reason is required"))]
    pub reason: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RoleRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub permissions: Vec<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,

    /// Replaces the permission set when present.
    #[serde(default)]
    pub permissions: Option<Vec<i64>>,
}

/// Permission catalogue, flat and grouped by module.
#[derive(Debug, Serialize)]
pub struct PermissionsResponse {
    pub permissions: Vec<Permission>,
    pub grouped: std::collections::BTreeMap<String, Vec<Permission>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportActionRequest {
    #[validate(length(min = 1, message = "Action is required"))]
    pub action: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConversationPair {
    pub user1: i64,
    pub user2: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSettingsRequest {
    #[validate(length(min = 1, message = "No settings supplied"))]
    pub settings: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct GradeRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Slug cannot be empty"))]
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub color: Option<String>,

    #[serde(default)]
    pub bg_color: Option<String>,

    #[serde(default)]
    pub border_color: Option<String>,

    #[serde(default)]
    pub icon: Option<String>,

    #[validate(range(min = 0, message = "Missions threshold cannot be negative"))]
    #[serde(default)]
    pub missions_threshold: Option<i32>,

    #[validate(range(min = 0.0, max = 5.0, message = "Rating threshold must be between 0 and 5"))]
    #[serde(default)]
    pub rating_threshold: Option<f64>,

    #[validate(range(min = 0, message = "Seniority threshold cannot be negative"))]
    #[serde(default)]
    pub seniority_threshold_months: Option<i32>,
}

impl GradeRequest {
    /// Fields a new grade cannot do without.
    pub fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.slug.is_some()
            && self.missions_threshold.is_some()
            && self.rating_threshold.is_some()
            && self.seniority_threshold_months.is_some()
    }
}

impl From<GradeRequest> for GradeFields {
    fn from(req: GradeRequest) -> Self {
        Self {
            name: non_blank(req.name),
            slug: non_blank(req.slug),
            color: non_blank(req.color),
            bg_color: non_blank(req.bg_color),
            border_color: non_blank(req.border_color),
            icon: non_blank(req.icon),
            missions_threshold: req.missions_threshold,
            rating_threshold: req.rating_threshold,
            seniority_threshold_months: req.seniority_threshold_months,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignGradeRequest {
    /// Account id of the provider.
    pub user_id: i64,
    pub grade_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RevokeAttributionRequest {
    pub attribution_id: i64,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub changes: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BadgeUpdateRequest {
    #[validate(length(min = 1, max = 255, message = "Name cannot be empty"))]
    #[serde(default)]
    pub name: Option<String>,

    #[validate(range(min = 0, message = "Threshold cannot be negative"))]
    #[serde(default)]
    pub threshold: Option<i32>,

    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[validate(length(max = 255))]
    #[serde(default)]
    pub icon: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_admin_list_query_ignores_all() {
        let query = AdminListQuery {
            search: Some("  ".to_string()),
            role: Some("all".to_string()),
            status: Some("pending".to_string()),
        };
        assert!(query.search().is_none());
        assert!(query.role().is_none());
        assert_eq!(query.status(), Some("pending"));
    }

    #[test]
    fn test_grade_request_rating_bounds() {
        let req: GradeRequest = serde_json::from_value(json!({"rating_threshold": 5.5})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_grade_request_completeness() {
        let partial: GradeRequest = serde_json::from_value(json!({"name": "Platine"})).unwrap();
        assert!(!partial.is_complete());

        let full: GradeRequest = serde_json::from_value(json!({
            "name": "Platine",
            "slug": "platine",
            "missions_threshold": 50,
            "rating_threshold": 4.9,
            "seniority_threshold_months": 24
        }))
        .unwrap();
        assert!(full.is_complete());

        let fields = GradeFields::from(full);
        assert_eq!(fields.slug.as_deref(), Some("platine"));
        assert!(fields.color.is_none());
    }

    #[test]
    fn test_update_user_changes_trims() {
        let req: UpdateUserRequest =
            serde_json::from_value(json!({"name": " Awa ", "role_id": 3})).unwrap();
        let changes = req.changes(Some("client".to_string()));
        assert_eq!(changes.name.as_deref(), Some("Awa"));
        assert_eq!(changes.role.as_deref(), Some("client"));
        assert_eq!(changes.role_id, Some(3));
    }

    #[test]
    fn test_settings_request_requires_values() {
        let req: UpdateSettingsRequest = serde_json::from_value(json!({"settings": {}})).unwrap();
        assert!(req.validate().is_err());
    }
}
