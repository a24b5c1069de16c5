//! Session orchestration: one user message in, one streamed turn out

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parley_client::{
    AgentApi, AgentInfo, KnowledgeAnswer, KnowledgeQuery, KnowledgeStats, StreamRequest,
};

use crate::{
    conversation::{ConversationState, ConversationStore, MemoryStore},
    dispatcher::{Dispatcher, StreamHandler, Termination},
    error::{Error, Result},
    handle::SessionHandle,
    observer::{NoopObserver, SessionObserver},
    pagination::{
        DEFAULT_PAGE_SIZE, HistorySource, PageController, UploadSource, UsageSource,
    },
};

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Page size of the usage and history views
    pub page_size: u32,
    /// Page size of the uploads view
    pub uploads_page_size: u32,
    /// Whether the usage/history view starts out visible
    pub show_usage: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            uploads_page_size: 10,
            show_usage: false,
        }
    }
}

/// What a completed turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReport {
    /// Conversation the turn belongs to
    pub conversation_id: Option<String>,
    /// Concatenated response text
    pub text: String,
}

/// Owns the conversation identity and the views derived from it
pub struct Session {
    api: Arc<dyn AgentApi>,
    conversation: ConversationState,
    usage: Arc<PageController<UsageSource>>,
    history: Arc<PageController<HistorySource>>,
    uploads: Arc<PageController<UploadSource>>,
    observer: Arc<dyn SessionObserver>,
    usage_visible: AtomicBool,
    handle: SessionHandle,
}

impl Session {
    /// Create a session with no saved conversation
    pub fn new(api: Arc<dyn AgentApi>, config: SessionConfig) -> Self {
        Self::with_store(api, config, Arc::new(MemoryStore::new()))
    }

    /// Create a session that restores and persists its conversation through `store`
    pub fn with_store(
        api: Arc<dyn AgentApi>,
        config: SessionConfig,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        let conversation = ConversationState::restore(store);
        let usage = PageController::with_page_size(UsageSource::new(api.clone()), config.page_size);
        usage.set_scope(conversation.get());

        Self {
            history: Arc::new(PageController::with_page_size(
                HistorySource::new(api.clone()),
                config.page_size,
            )),
            uploads: Arc::new(PageController::with_page_size(
                UploadSource::new(api.clone()),
                config.uploads_page_size,
            )),
            usage: Arc::new(usage),
            api,
            conversation,
            observer: Arc::new(NoopObserver),
            usage_visible: AtomicBool::new(config.show_usage),
            handle: SessionHandle::new(),
        }
    }

    /// Attach the UI observer
    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.conversation.get()
    }

    pub fn usage(&self) -> &Arc<PageController<UsageSource>> {
        &self.usage
    }

    pub fn history(&self) -> &Arc<PageController<HistorySource>> {
        &self.history
    }

    pub fn uploads(&self) -> &Arc<PageController<UploadSource>> {
        &self.uploads
    }

    /// Handle for aborting turns from another task
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn usage_view_visible(&self) -> bool {
        self.usage_visible.load(Ordering::Acquire)
    }

    pub fn set_usage_view_visible(&self, visible: bool) {
        self.usage_visible.store(visible, Ordering::Release);
    }

    /// Show the usage/history view and load its first pages
    pub async fn open_usage_view(&self) {
        self.set_usage_view_visible(true);
        self.refresh_views().await;
    }

    /// Send a message and stream the agent's response.
    ///
    /// Fails with the transport error when the stream cannot be opened, with
    /// [`Error::Stream`] when the service reports an error frame, with
    /// [`Error::Protocol`] when the stream ends early, and with
    /// [`Error::Aborted`] when the turn is aborted through the handle.
    pub async fn send(&self, message: &str) -> Result<TurnReport> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let turn = self.handle.begin_turn();
        let request = StreamRequest::new(message, self.conversation.get().as_deref());
        tracing::debug!(
            "Sending message ({} chars) to conversation {:?}",
            message.len(),
            request.conversation_id
        );

        let frames = tokio::select! {
            opened = self.api.open_stream(&request) => opened?,
            _ = turn.token.cancelled() => return Err(Error::Aborted),
        };

        let mut handler = TurnHandler {
            session: self,
            text: String::new(),
            last_refresh: None,
        };
        let outcome = tokio::select! {
            outcome = Dispatcher::new().run(frames, &mut handler) => outcome,
            _ = turn.token.cancelled() => Err(Error::Aborted),
        };
        let text = handler.text;

        match outcome {
            Ok(Termination::Done { conversation_id }) => Ok(TurnReport {
                conversation_id: conversation_id.or_else(|| self.conversation.get()),
                text,
            }),
            Ok(Termination::Failed { message }) => Err(Error::Stream(message)),
            Err(e) => {
                tracing::warn!("Turn failed: {}", e);
                Err(e)
            }
        }
    }

    /// Focus another conversation; scoped views go back to page 1
    pub async fn switch_conversation(&self, conversation_id: &str) {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            self.new_conversation();
            return;
        }

        if self.conversation.switch_to(conversation_id) {
            tracing::debug!("Switched to conversation {}", conversation_id);
        }
        self.usage.set_scope(Some(conversation_id.to_string()));
        self.observer.on_conversation_established(conversation_id);
        if self.usage_view_visible() {
            self.refresh_views().await;
        }
    }

    /// Drop the active conversation; the next message starts a new thread
    pub fn new_conversation(&self) {
        self.conversation.clear();
        self.usage.set_scope(None);
    }

    /// Reload page 1 of the usage and history views.
    ///
    /// Best effort: failures are logged and the last good pages stay shown.
    pub async fn refresh_views(&self) {
        let (usage, history) = futures::join!(self.usage.go_to_page(1), self.history.go_to_page(1));
        if let Err(e) = usage {
            tracing::warn!("Failed to refresh usage: {}", e);
        }
        if let Err(e) = history {
            tracing::warn!("Failed to refresh history: {}", e);
        }
    }

    pub async fn agent_info(&self) -> Result<AgentInfo> {
        Ok(self.api.agent_info().await?)
    }

    pub async fn knowledge_stats(&self) -> Result<KnowledgeStats> {
        Ok(self.api.knowledge_stats().await?)
    }

    /// Ask a question against the uploaded documents
    pub async fn query_knowledge(
        &self,
        question: &str,
        top_k: Option<u32>,
        use_llm: Option<bool>,
    ) -> Result<KnowledgeAnswer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyMessage);
        }
        let query = KnowledgeQuery {
            question: question.to_string(),
            top_k,
            use_llm,
        };
        Ok(self.api.query_knowledge(&query).await?)
    }
}

/// Wires one turn's stream events to the session
/// Which callback ran the most recent view refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshCause {
    Stats,
    Identity,
    Done,
}

struct TurnHandler<'a> {
    session: &'a Session,
    text: String,
    // Cleared by every callback that does not refresh
    last_refresh: Option<RefreshCause>,
}

impl TurnHandler<'_> {
    async fn refresh_if_visible(&mut self, cause: RefreshCause) {
        if self.session.usage_view_visible() {
            self.last_refresh = Some(cause);
            self.session.refresh_views().await;
        } else {
            self.last_refresh = None;
        }
    }

    /// A `done` skips its refresh only right behind a stats refresh, or behind
    /// the identity refresh triggered by its own conversation id.
    fn done_already_refreshed(&self, conversation_id: Option<&str>) -> bool {
        match self.last_refresh {
            Some(RefreshCause::Stats) => true,
            Some(RefreshCause::Identity) => conversation_id.is_some(),
            Some(RefreshCause::Done) | None => false,
        }
    }
}

#[async_trait]
impl StreamHandler for TurnHandler<'_> {
    async fn on_delta(&mut self, text: &str) {
        self.last_refresh = None;
        self.text.push_str(text);
        self.session.observer.on_delta(text);
    }

    async fn on_conversation_established(&mut self, conversation_id: &str) {
        let session = self.session;
        let changed = session.conversation.get().as_deref() != Some(conversation_id);
        session.conversation.set(conversation_id);
        session.usage.set_scope(Some(conversation_id.to_string()));
        session.observer.on_conversation_established(conversation_id);

        if changed {
            self.refresh_if_visible(RefreshCause::Identity).await;
        } else {
            self.last_refresh = None;
        }
    }

    async fn on_stats_hint(&mut self) {
        self.refresh_if_visible(RefreshCause::Stats).await;
    }

    async fn on_error(&mut self, message: &str) {
        self.last_refresh = None;
        self.session.observer.on_error(message);
    }

    async fn on_done(&mut self, conversation_id: Option<&str>) {
        if !self.done_already_refreshed(conversation_id) {
            self.refresh_if_visible(RefreshCause::Done).await;
        }
        self.session.observer.on_done(conversation_id);
    }
}
