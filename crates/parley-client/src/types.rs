//! Core types exchanged with the agent service

use serde::{Deserialize, Serialize};

/// Body of a stream request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRequest {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

impl StreamRequest {
    /// Create a request, attaching the conversation id only when it is non-empty
    pub fn new(message: impl Into<String>, conversation_id: Option<&str>) -> Self {
        Self {
            message: message.into(),
            conversation_id: conversation_id
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(ToString::to_string),
        }
    }
}

/// Parameters of one page fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub page: u32,
    pub page_size: u32,
    /// Conversation scope, for collections that are parameterized by it
    pub conversation_id: Option<String>,
}

impl PageQuery {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            conversation_id: None,
        }
    }

    pub fn scoped(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }
}

/// One page of a server-side collection.
///
/// A fetched page is the sole source of truth for its range: it replaces
/// whatever was shown before, it is never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total: u64,
}

impl<T> Page<T> {
    /// Number of pages the collection spans (always at least 1)
    pub fn page_count(&self) -> u32 {
        page_count(self.total, self.page_size)
    }
}

/// `max(1, ceil(total / page_size))`, and 1 for an empty collection
pub fn page_count(total: u64, page_size: u32) -> u32 {
    if total == 0 {
        return 1;
    }
    let size = u64::from(page_size.max(1));
    let count = total.div_ceil(size).max(1);
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// A list endpoint that is not paginated server-side
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ItemList<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

/// Token usage for one completed agent turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub turn_index: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub created_at: String,
    #[serde(default)]
    pub model_name: Option<String>,
}

/// Summary of one known conversation thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub conversation_id: String,
    pub turns: u32,
    pub total_tokens: u64,
    #[serde(default)]
    pub last_created_at: Option<String>,
}

/// An indexed document upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub original_name: String,
    pub stored_name: String,
    pub size_bytes: u64,
    pub uploaded_at: String,
    #[serde(default)]
    pub chunks_indexed: u32,
    #[serde(default)]
    pub chunk_lengths: Vec<u32>,
}

/// Deployment information reported by the service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentInfo {
    pub deployment_name: Option<String>,
    pub embedding_deployment_name: Option<String>,
    pub api_version: Option<String>,
    pub endpoint: Option<String>,
    pub endpoint_host: Option<String>,
    pub auth_mode: String,
    pub tenant_id: Option<String>,
}

/// Size of the knowledge index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeStats {
    #[serde(default)]
    pub chunks: u64,
}

/// Body of a knowledge query
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeQuery {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_llm: Option<bool>,
}

/// A retrieved chunk backing a knowledge answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSource {
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub distance: Option<f64>,
}

/// Answer to a knowledge query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<KnowledgeSource>,
}

/// Format a server timestamp for display, keeping the raw text if it is not RFC 3339
pub fn format_timestamp(raw: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| {
            dt.with_timezone(&chrono::Utc)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_boundaries() {
        assert_eq!(page_count(0, 20), 1);
        assert_eq!(page_count(1, 20), 1);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(25, 20), 2);
        assert_eq!(page_count(5, 0), 5);
    }

    #[test]
    fn test_stream_request_omits_blank_conversation() {
        let req = StreamRequest::new("hi", Some("  "));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hi"}));

        let req = StreamRequest::new("hi", Some("c1"));
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({"message": "hi", "conversation_id": "c1"}));
    }

    #[test]
    fn test_usage_page_ignores_extra_fields() {
        let body = r#"{
            "conversation_id": "c1",
            "page": 2,
            "page_size": 20,
            "total": 25,
            "items": [{
                "turn_index": 21,
                "model_name": null,
                "input_tokens": 10,
                "output_tokens": 5,
                "total_tokens": 15,
                "created_at": "2025-01-02T03:04:05+00:00"
            }]
        }"#;
        let page: Page<UsageRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(page.page, 2);
        assert_eq!(page.page_count(), 2);
        assert_eq!(page.items[0].total_tokens, 15);
        assert!(page.items[0].model_name.is_none());
    }

    #[test]
    fn test_upload_record_defaults() {
        let body = r#"{"items":[{"original_name":"a.md","stored_name":"x_a.md","size_bytes":12,"uploaded_at":"2025-01-01T00:00:00+00:00"}]}"#;
        let list: ItemList<UploadRecord> = serde_json::from_str(body).unwrap();
        assert_eq!(list.items[0].chunks_indexed, 0);
        assert!(list.items[0].chunk_lengths.is_empty());
    }

    #[test]
    fn test_page_without_items_or_total() {
        let page: Page<HistoryEntry> =
            serde_json::from_str(r#"{"page":1,"page_size":20}"#).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);

        let list: ItemList<UploadRecord> = serde_json::from_str("{}").unwrap();
        assert!(list.items.is_empty());
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp("2025-01-02T03:04:05.123456+00:00"), "2025-01-02 03:04");
        assert_eq!(format_timestamp("yesterday"), "yesterday");
    }
}
