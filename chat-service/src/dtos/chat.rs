use serde::{Deserialize, Serialize};
use validator::Validate;

/// Header carrying the caller's session token.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(
        min = 1,
        max = 1000,
        message = "Message must be between 1 and 1000 characters"
    ))]
    pub message: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub session_id: String,
}
