//! In-memory service double shared by the unit tests

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use parley_client::{
    AgentApi, AgentInfo, FrameStream, HistoryEntry, KnowledgeAnswer, KnowledgeQuery,
    KnowledgeStats, Page, PageQuery, Result, StreamRequest, UploadRecord, UsageRecord,
    decode_frames,
};

use crate::observer::SessionObserver;

/// One scripted response to `open_stream`
pub enum FakeStream {
    /// Serve these chunks, then end
    Chunks(Vec<String>),
    /// Serve these chunks, then hang until dropped
    Stalled(Vec<String>),
    /// Fail before any frame with this HTTP status
    Fail(u16),
}

impl FakeStream {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Chunks(chunks.iter().map(ToString::to_string).collect())
    }

    pub fn stalled(chunks: &[&str]) -> Self {
        Self::Stalled(chunks.iter().map(ToString::to_string).collect())
    }
}

fn byte_chunks(chunks: Vec<String>) -> impl futures::Stream<Item = std::io::Result<Vec<u8>>> {
    futures::stream::iter(chunks.into_iter().map(|c| Ok(c.into_bytes())))
}

#[derive(Default)]
pub struct FakeApi {
    streams: Mutex<VecDeque<FakeStream>>,
    uploads: Mutex<Vec<UploadRecord>>,
    stream_requests: Mutex<Vec<StreamRequest>>,
    usage_queries: Mutex<Vec<PageQuery>>,
    history_queries: Mutex<Vec<PageQuery>>,
}

impl FakeApi {
    pub fn push_stream(&self, stream: FakeStream) {
        self.streams.lock().push_back(stream);
    }

    pub fn set_uploads(&self, count: usize) {
        *self.uploads.lock() = (0..count)
            .map(|i| UploadRecord {
                original_name: format!("doc-{i}.pdf"),
                stored_name: format!("upload-{i}"),
                size_bytes: 1024,
                uploaded_at: "2026-01-01T00:00:00".to_string(),
                chunks_indexed: 1,
                chunk_lengths: vec![512],
            })
            .collect();
    }

    pub fn stream_requests(&self) -> Vec<StreamRequest> {
        self.stream_requests.lock().clone()
    }

    pub fn usage_queries(&self) -> Vec<PageQuery> {
        self.usage_queries.lock().clone()
    }

    pub fn history_queries(&self) -> Vec<PageQuery> {
        self.history_queries.lock().clone()
    }
}

#[async_trait]
impl AgentApi for FakeApi {
    async fn open_stream(&self, request: &StreamRequest) -> Result<FrameStream> {
        self.stream_requests.lock().push(request.clone());
        let scripted = self.streams.lock().pop_front();
        match scripted {
            Some(FakeStream::Chunks(chunks)) => Ok(decode_frames(byte_chunks(chunks))),
            Some(FakeStream::Stalled(chunks)) => Ok(decode_frames(
                byte_chunks(chunks).chain(futures::stream::pending()),
            )),
            Some(FakeStream::Fail(status)) => {
                Err(parley_client::Error::status(status, "scripted failure"))
            }
            None => Err(parley_client::Error::Stream("no scripted stream".into())),
        }
    }

    async fn fetch_usage(&self, query: &PageQuery) -> Result<Page<UsageRecord>> {
        self.usage_queries.lock().push(query.clone());
        Ok(Page {
            items: vec![UsageRecord {
                turn_index: 1,
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
                created_at: "2026-01-01T00:00:00".to_string(),
                model_name: None,
            }],
            page: query.page,
            page_size: query.page_size,
            total: 1,
        })
    }

    async fn fetch_history(&self, query: &PageQuery) -> Result<Page<HistoryEntry>> {
        self.history_queries.lock().push(query.clone());
        Ok(Page {
            items: vec![HistoryEntry {
                conversation_id: "c1".to_string(),
                turns: 1,
                total_tokens: 15,
                last_created_at: None,
            }],
            page: query.page,
            page_size: query.page_size,
            total: 1,
        })
    }

    async fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        Ok(self.uploads.lock().clone())
    }

    async fn agent_info(&self) -> Result<AgentInfo> {
        Ok(AgentInfo::default())
    }

    async fn knowledge_stats(&self) -> Result<KnowledgeStats> {
        Ok(KnowledgeStats { chunks: 0 })
    }

    async fn query_knowledge(&self, query: &KnowledgeQuery) -> Result<KnowledgeAnswer> {
        Ok(KnowledgeAnswer {
            answer: format!("echo: {}", query.question),
            sources: Vec::new(),
        })
    }
}

/// Observer that records each call as a short string
#[derive(Default)]
pub struct RecordingObserver {
    calls: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_delta(&self, text: &str) {
        self.calls.lock().push(format!("delta:{text}"));
    }

    fn on_conversation_established(&self, conversation_id: &str) {
        self.calls.lock().push(format!("established:{conversation_id}"));
    }

    fn on_error(&self, message: &str) {
        self.calls.lock().push(format!("error:{message}"));
    }

    fn on_done(&self, conversation_id: Option<&str>) {
        self.calls
            .lock()
            .push(format!("done:{}", conversation_id.unwrap_or("-")));
    }
}
