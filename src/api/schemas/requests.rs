//! Application and invitation schemas.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::RequestStatus;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApplyRequest {
    pub service_offer_id: i64,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct InviteRequest {
    pub service_offer_id: i64,

    /// User id of the invited provider.
    pub provider_id: i64,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: RequestStatus,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountsResponse {
    pub candidatures_count: i64,
    pub invitations_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_status_parses_known_values() {
        let req: UpdateStatusRequest =
            serde_json::from_value(json!({"status": "accepted"})).unwrap();
        assert_eq!(req.status, RequestStatus::Accepted);

        let archived = serde_json::from_value::<UpdateStatusRequest>(json!({"status": "archived"}));
        assert!(archived.is_err());
    }

    #[test]
    fn test_apply_message_length() {
        let req: ApplyRequest = serde_json::from_value(json!({
            "service_offer_id": 1,
            "message": "x".repeat(2001)
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
