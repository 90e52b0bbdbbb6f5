//! The `{success, message, data}` wrapper every admin endpoint returns

use crate::error::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Application level success flag; absent counts as failure
    #[serde(default)]
    pub success: bool,

    /// Human readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Payload
    #[serde(default)]
    pub data: Value,

    /// Top level pagination block, used by a few list endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Value>,

    /// Any other top level fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Envelope {
    /// Successful envelope around `data`
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data,
            ..Self::default()
        }
    }

    /// Failed envelope carrying `message`
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Attach a top level pagination block
    #[must_use]
    pub fn with_pagination(mut self, pagination: Value) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Decode an envelope from a response body
    pub fn from_slice(body: &[u8]) -> ClientResult<Self> {
        serde_json::from_slice(body).map_err(|e| ClientError::decode(e.to_string()))
    }

    /// Decode an envelope from an already parsed JSON value
    pub fn from_value(value: Value) -> ClientResult<Self> {
        serde_json::from_value(value).map_err(|e| ClientError::decode(e.to_string()))
    }

    /// Turn `success: false` into [`ClientError::Api`]
    pub fn into_result(self) -> ClientResult<Self> {
        if self.success {
            Ok(self)
        } else {
            Err(ClientError::api(self.message.as_deref()))
        }
    }

    /// `data.<key>`, if `data` is an object holding it
    pub fn data_field(&self, key: &str) -> Option<&Value> {
        self.data.as_object().and_then(|data| data.get(key))
    }

    /// Pagination from the top level, falling back to `data.pagination`
    pub fn pagination_block(&self) -> Option<&Value> {
        self.pagination
            .as_ref()
            .filter(|p| p.is_object())
            .or_else(|| self.data_field("pagination").filter(|p| p.is_object()))
    }
}

/// Pull the best available error message out of a non-envelope body
pub(crate) fn message_from_body(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    value
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let envelope = Envelope::from_value(json!({
            "success": true,
            "message": "ok",
            "data": {"result": [], "pagination": {"total": 0}},
        }))
        .unwrap()
        .into_result()
        .unwrap();

        assert_eq!(envelope.data_field("result"), Some(&json!([])));
        assert_eq!(envelope.pagination_block(), Some(&json!({"total": 0})));
    }

    #[test]
    fn test_failure_envelope_uses_server_message() {
        let error = Envelope::from_value(json!({"success": false, "message": "User not found"}))
            .unwrap()
            .into_result()
            .unwrap_err();

        assert!(matches!(error, ClientError::Api { .. }));
        assert_eq!(error.to_string(), "User not found");
    }

    #[test]
    fn test_missing_success_is_failure() {
        let error = Envelope::from_value(json!({"data": {}}))
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(error.to_string(), "Something went wrong, Please try again!");
    }

    #[test]
    fn test_top_level_pagination_wins() {
        let envelope = Envelope::from_value(json!({
            "success": true,
            "data": [{"id": 1}],
            "pagination": {"total": 1, "page": 1},
            "count": 1,
        }))
        .unwrap();

        assert_eq!(
            envelope.pagination_block(),
            Some(&json!({"total": 1, "page": 1}))
        );
        assert_eq!(envelope.extra.get("count"), Some(&json!(1)));
        assert_eq!(envelope.data_field("pagination"), None);
    }

    #[test]
    fn test_decode_error() {
        let error = Envelope::from_slice(b"<html>").unwrap_err();
        assert!(matches!(error, ClientError::Decode { .. }));
    }

    #[test]
    fn test_message_from_body() {
        assert_eq!(
            message_from_body(br#"{"message":"Invalid token"}"#),
            Some("Invalid token".to_string())
        );
        assert_eq!(message_from_body(br#"{"message":""}"#), None);
        assert_eq!(message_from_body(b"oops"), None);
    }
}
