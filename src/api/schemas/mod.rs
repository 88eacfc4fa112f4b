//! Request/response schema module.
//!
//! Request bodies derive `Validate`; handlers call `validate()` before
//! touching the database.

pub mod admin;
pub mod auth;
pub mod messaging;
pub mod offers;
pub mod profiles;
pub mod requests;
pub mod reviews;
pub mod security;

pub use admin::*;
pub use auth::*;
pub use messaging::*;
pub use offers::*;
pub use profiles::*;
pub use requests::*;
pub use reviews::*;
pub use security::*;

use serde::{Deserialize, Deserializer, Serialize};

/// Plain acknowledgement body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement carrying the affected record.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

/// With `#[serde(default)]`, an absent field stays `None` while an explicit
/// `null` becomes `Some(None)`.
#[allow(clippy::option_option)]
pub(crate) fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trims a string and maps blank input to `None`.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  Paris ".to_string())), Some("Paris".to_string()));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_message_response_serializes() {
        let json = serde_json::to_value(MessageResponse::new("done")).unwrap();
        assert_eq!(json["message"], "done");
    }
}
