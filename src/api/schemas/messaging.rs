//! Conversation schemas.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Conversation, MessageWithSender, UserSummary};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartConversationRequest {
    pub receiver_id: i64,

    #[validate(length(min = 1, max = 64))]
    #[serde(default)]
    pub related_type: Option<String>,

    #[serde(default)]
    pub related_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 5000, message = "Message cannot be empty"))]
    pub content: String,
}

/// A conversation opened by one participant.
#[derive(Debug, Serialize)]
pub struct ConversationDetail {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: UserSummary,
    pub messages: Vec<MessageWithSender>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_send_message_rejects_empty() {
        let req: SendMessageRequest = serde_json::from_value(json!({"content": ""})).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_start_conversation_optional_context() {
        let req: StartConversationRequest =
            serde_json::from_value(json!({"receiver_id": 5})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.related_type.is_none());
        assert!(req.related_id.is_none());
    }
}
