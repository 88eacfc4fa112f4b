//! Report and block schemas.

use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportRequest {
    pub reported_id: i64,

    #[validate(length(min = 1, max = 255, message = "A reason is required"))]
    pub reason: String,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub blocked_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_report_requires_reason() {
        let req: ReportRequest =
            serde_json::from_value(json!({"reported_id": 3, "reason": ""})).unwrap();
        assert!(req.validate().is_err());
    }
}
