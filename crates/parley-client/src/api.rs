//! Agent service endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::{Error, Result, parse_error_message};
use crate::frame::{FrameStream, decode_frames};
use crate::types::{
    AgentInfo, HistoryEntry, ItemList, KnowledgeAnswer, KnowledgeQuery, KnowledgeStats, Page,
    PageQuery, StreamRequest, UploadRecord, UsageRecord,
};

/// Media type the stream endpoint must answer with
pub const EVENT_STREAM: &str = "text/event-stream";

/// Default service root
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Everything the session runtime needs from the agent service
#[async_trait]
pub trait AgentApi: Send + Sync {
    /// Open one event stream for a user message.
    ///
    /// Fails before any frame is decoded when the status is not a success or
    /// the response is not an event stream.
    async fn open_stream(&self, request: &StreamRequest) -> Result<FrameStream>;

    /// One page of the token-usage ledger of a conversation
    async fn fetch_usage(&self, query: &PageQuery) -> Result<Page<UsageRecord>>;

    /// One page of known conversations
    async fn fetch_history(&self, query: &PageQuery) -> Result<Page<HistoryEntry>>;

    /// Every indexed upload, newest first
    async fn list_uploads(&self) -> Result<Vec<UploadRecord>>;

    /// Deployment information
    async fn agent_info(&self) -> Result<AgentInfo>;

    /// Size of the knowledge index
    async fn knowledge_stats(&self) -> Result<KnowledgeStats>;

    /// Ask a question against the uploaded documents
    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer>;
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Service root, e.g. `http://127.0.0.1:8000/api`
    pub base_url: String,
    /// Connection timeout. Streams themselves are never timed out here.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }
}

/// `reqwest`-backed [`AgentApi`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                config.base_url
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AgentApi for HttpClient {
    async fn open_stream(&self, request: &StreamRequest) -> Result<FrameStream> {
        let response = self
            .http
            .post(self.url("agent/stream"))
            .header(ACCEPT, EVENT_STREAM)
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_event_stream(&content_type) {
            let shown = if content_type.is_empty() {
                "none".to_string()
            } else {
                content_type
            };
            return Err(Error::UnexpectedContentType(shown));
        }

        tracing::debug!("Event stream opened for conversation {:?}", request.conversation_id);
        Ok(decode_frames(response.bytes_stream()))
    }

    async fn fetch_usage(&self, query: &PageQuery) -> Result<Page<UsageRecord>> {
        let conversation_id = query
            .conversation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig("usage fetch requires a conversation id".into()))?;
        self.get_json(
            "agent/usage",
            &[
                ("conversation_id", conversation_id),
                ("page", query.page.to_string()),
                ("page_size", query.page_size.to_string()),
            ],
        )
        .await
    }

    async fn fetch_history(&self, query: &PageQuery) -> Result<Page<HistoryEntry>> {
        self.get_json(
            "agent/conversations",
            &[
                ("page", query.page.to_string()),
                ("page_size", query.page_size.to_string()),
            ],
        )
        .await
    }

    async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        let list: ItemList<UploadRecord> = self.get_json("knowledge/uploads", &[]).await?;
        Ok(list.items)
    }

    async fn agent_info(&self) -> Result<AgentInfo> {
        self.get_json("agent/info", &[]).await
    }

    async fn knowledge_stats(&self) -> Result<KnowledgeStats> {
        self.get_json("knowledge/stats", &[]).await
    }

    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer> {
        let response = self
            .http
            .post(self.url("knowledge/query"))
            .json(query)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = parse_error_message(status.as_u16(), status.canonical_reason(), &body);
    Err(Error::status(status.as_u16(), message))
}

/// Whether a `Content-Type` header value names the event-stream media type
pub fn is_event_stream(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|mime| mime.trim().eq_ignore_ascii_case(EVENT_STREAM))
        .unwrap_or(false)
}
