use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineTextMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub text: String,
}

impl LineTextMessage {
    pub fn new(text: &str) -> Self {
        Self {
            message_type: "text".to_string(),
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinePushRequest {
    pub to: String,
    pub messages: Vec<LineTextMessage>,
}

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("LINE messaging is not configured")]
    NotConfigured,

    #[error("LINE API error: {message}")]
    LineApiError { message: String },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}
