//! Error types for parley-client

use thiserror::Error;

/// Result type alias using parley-client Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the agent service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service answered with a non-success status
    #[error("Request failed ({status}): {message}")]
    Status { status: u16, message: String },

    /// Stream endpoint answered with something other than an event stream
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The byte source of an event stream failed mid-way
    #[error("Stream error: {0}")]
    Stream(String),
}

impl Error {
    /// Create a status error from a code and message
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}

/// Pull a human-readable message out of an error response body.
///
/// The service reports failures as `{"detail": "..."}`; anything else is
/// returned trimmed, falling back to the status reason.
pub fn parse_error_message(status: u16, reason: Option<&str>, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) if !detail.trim().is_empty() => {
                return detail.trim().to_string();
            }
            Some(detail) if !detail.is_null() => return detail.to_string(),
            _ => {}
        }
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        format!("HTTP {}: {}", status, body)
    }
}
