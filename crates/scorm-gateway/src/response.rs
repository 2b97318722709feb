//! JSON response bodies

use serde::{Deserialize, Serialize};

/// `{ "message": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
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

/// `{ "message": ..., "url": ... }` returned when a chunked upload completes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletedUploadResponse {
    pub message: String,
    pub url: String,
}
