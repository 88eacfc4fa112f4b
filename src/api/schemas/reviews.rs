//! Review schemas.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{explicit_null, non_blank};
use crate::models::ReviewListing;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    /// The reviewed provider.
    pub user_id: i64,

    pub service_offer_id: i64,

    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i16,

    #[validate(length(max = 2000))]
    #[serde(default)]
    pub comment: Option<String>,
}

#[allow(clippy::option_option)]
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    #[serde(default)]
    pub rating: Option<i16>,

    /// Absent keeps the comment, `null` or blank clears it.
    #[validate(length(max = 2000))]
    #[serde(default, deserialize_with = "explicit_null")]
    pub comment: Option<Option<String>>,
}

impl UpdateReviewRequest {
    /// `None` leaves the stored comment alone; `Some(None)` clears it.
    #[allow(clippy::option_option)]
    pub fn comment_change(&self) -> Option<Option<String>> {
        self.comment.clone().map(non_blank)
    }
}

#[derive(Debug, Serialize)]
pub struct ProviderReviewsResponse {
    pub reviews: Vec<ReviewListing>,
    pub average_rating: f64,
    pub total_reviews: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rating_bounds() {
        for (rating, ok) in [(0, false), (1, true), (5, true), (6, false)] {
            let req: CreateReviewRequest = serde_json::from_value(json!({
                "user_id": 2,
                "service_offer_id": 3,
                "rating": rating
            }))
            .unwrap();
            assert_eq!(req.validate().is_ok(), ok, "rating {rating}");
        }
    }

    #[test]
    fn test_update_review_partial() {
        let req: UpdateReviewRequest = serde_json::from_value(json!({"comment": "Great"})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.rating.is_none());
    }

    #[test]
    fn test_update_review_comment_changes() {
        let absent: UpdateReviewRequest = serde_json::from_value(json!({"rating": 4})).unwrap();
        assert_eq!(absent.comment_change(), None);

        let cleared: UpdateReviewRequest =
            serde_json::from_value(json!({"comment": null})).unwrap();
        assert_eq!(cleared.comment_change(), Some(None));

        let blank: UpdateReviewRequest = serde_json::from_value(json!({"comment": "  "})).unwrap();
        assert_eq!(blank.comment_change(), Some(None));

        let edited: UpdateReviewRequest =
            serde_json::from_value(json!({"comment": " On time "})).unwrap();
        assert_eq!(edited.comment_change(), Some(Some("On time".to_string())));
    }

    #[test]
    fn test_update_review_comment_length() {
        let req: UpdateReviewRequest =
            serde_json::from_value(json!({"comment": "x".repeat(2001)})).unwrap();
        assert!(req.validate().is_err());
    }
}
