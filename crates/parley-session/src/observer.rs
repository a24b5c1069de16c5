//! What the rendering layer gets told during a turn

/// Observer for the UI layer. Every slot defaults to doing nothing.
pub trait SessionObserver: Send + Sync {
    /// Response text arrived
    fn on_delta(&self, _text: &str) {}

    /// The active conversation is now `conversation_id`
    fn on_conversation_established(&self, _conversation_id: &str) {}

    /// The service ended the turn with an error frame. Text already
    /// delivered through `on_delta` stays valid.
    fn on_error(&self, _message: &str) {}

    /// The turn completed
    fn on_done(&self, _conversation_id: Option<&str>) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}
