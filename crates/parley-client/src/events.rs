//! Typed stream events

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::frame::EventFrame;

/// Events the agent service emits during one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Conversation identity established or confirmed
    Meta { conversation_id: String },
    /// Incremental response text
    Delta { text: String },
    /// Usage/history likely changed. Carries no data.
    Stats,
    /// Terminal failure
    Error { message: String },
    /// Terminal success
    Done { conversation_id: Option<String> },
}

impl StreamEvent {
    /// Type a decoded frame by its event name.
    ///
    /// Unknown names and payloads missing a required field yield `None`.
    pub fn from_frame(frame: &EventFrame) -> Option<Self> {
        let payload = &frame.payload;
        match frame.name.as_str() {
            "meta" => {
                let conversation_id = string_field(payload, "conversation_id")?;
                Some(StreamEvent::Meta { conversation_id })
            }
            "delta" => {
                let text = payload.get("delta")?.as_str()?.to_string();
                Some(StreamEvent::Delta { text })
            }
            "stats" => Some(StreamEvent::Stats),
            "error" => {
                let message = payload
                    .get("message")
                    .and_then(|m| m.as_str())
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Unknown stream error")
                    .to_string();
                Some(StreamEvent::Error { message })
            }
            "done" => Some(StreamEvent::Done {
                conversation_id: string_field(payload, "conversation_id"),
            }),
            other => {
                tracing::debug!("Ignoring unrecognized event '{}'", other);
                None
            }
        }
    }

    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done { .. } | StreamEvent::Error { .. })
    }
}

fn string_field(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}
