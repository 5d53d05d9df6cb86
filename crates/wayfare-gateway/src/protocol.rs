//! Gateway HTTP protocol — JSON bodies between chat clients and the gateway

use serde::{Deserialize, Serialize};

/// `POST /api/chat` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub content: String,
    /// Session to attach the conversation to; defaults to "main"
    #[serde(default)]
    pub session_id: Option<String>,
}

/// `POST /api/chat` response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    /// Which specialist answered, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    pub session_id: String,
}

/// `POST /api/sessions` request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Error body for non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_deserialize() {
        let req: ChatRequest =
            serde_json::from_str(r#"{"content":"weather in Oslo","session_id":"s-1"}"#).unwrap();
        assert_eq!(req.content, "weather in Oslo");
        assert_eq!(req.session_id.as_deref(), Some("s-1"));
    }

    #[test]
    fn test_chat_request_session_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"content":"hello"}"#).unwrap();
        assert!(req.session_id.is_none());
    }

    #[test]
    fn test_chat_response_omits_empty_agent() {
        let resp = ChatResponse {
            content: "hi".to_string(),
            agent: None,
            session_id: "main".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("agent"));
    }

    #[test]
    fn test_api_error_body() {
        let json = serde_json::to_string(&ApiError::new("unauthorized")).unwrap();
        assert_eq!(json, r#"{"error":"unauthorized"}"#);
    }
}
