//! Event dispatch: one stream of frames in, one callback per event out

use async_trait::async_trait;
use futures::StreamExt;
use parley_client::{FrameStream, StreamEvent};

use crate::error::{Error, Result};

/// Callback slots the dispatcher drives, one per event kind.
///
/// Every callback is awaited before the next frame is read, so callbacks
/// observe events strictly in arrival order.
#[async_trait]
pub trait StreamHandler: Send {
    /// A chunk of response text (possibly empty)
    async fn on_delta(&mut self, text: &str);

    /// The stream named its conversation. Repeats are delivered too.
    async fn on_conversation_established(&mut self, conversation_id: &str);

    /// Usage/history probably changed
    async fn on_stats_hint(&mut self);

    /// The service reported a failure; the stream is over
    async fn on_error(&mut self, message: &str);

    /// The response completed; the stream is over
    async fn on_done(&mut self, conversation_id: Option<&str>);
}

/// Whether to keep reading after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// How a well-formed stream ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// `done` arrived
    Done { conversation_id: Option<String> },
    /// `error` arrived
    Failed { message: String },
}

/// Applies stream events to a [`StreamHandler`] for a single stream
#[derive(Debug, Default)]
pub struct Dispatcher {
    termination: Option<Termination>,
    dispatched: usize,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// The terminal outcome, once one has been seen
    pub fn termination(&self) -> Option<&Termination> {
        self.termination.as_ref()
    }

    /// Number of events that reached a callback
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Apply one event. Anything after a terminal event is ignored.
    pub async fn dispatch<H>(&mut self, event: StreamEvent, handler: &mut H) -> Flow
    where
        H: StreamHandler + ?Sized,
    {
        if self.termination.is_some() {
            tracing::debug!("Ignoring {:?} after stream termination", event);
            return Flow::Stop;
        }
        self.dispatched += 1;

        match event {
            StreamEvent::Meta { conversation_id } => {
                if !conversation_id.trim().is_empty() {
                    handler.on_conversation_established(&conversation_id).await;
                }
                Flow::Continue
            }
            StreamEvent::Delta { text } => {
                handler.on_delta(&text).await;
                Flow::Continue
            }
            StreamEvent::Stats => {
                handler.on_stats_hint().await;
                Flow::Continue
            }
            StreamEvent::Error { message } => {
                handler.on_error(&message).await;
                self.termination = Some(Termination::Failed { message });
                Flow::Stop
            }
            StreamEvent::Done { conversation_id } => {
                let conversation_id = conversation_id.filter(|id| !id.trim().is_empty());
                if let Some(ref id) = conversation_id {
                    handler.on_conversation_established(id).await;
                }
                handler.on_done(conversation_id.as_deref()).await;
                self.termination = Some(Termination::Done { conversation_id });
                Flow::Stop
            }
        }
    }

    /// Drive a whole frame stream through `handler`.
    ///
    /// Returns [`Error::Protocol`] when the source ends without a terminal
    /// event, and the byte-source error when the transport fails mid-stream.
    pub async fn run<H>(mut self, mut frames: FrameStream, handler: &mut H) -> Result<Termination>
    where
        H: StreamHandler + ?Sized,
    {
        while let Some(frame) = frames.next().await {
            let frame = frame?;
            let Some(event) = StreamEvent::from_frame(&frame) else {
                continue;
            };
            if self.dispatch(event, handler).await == Flow::Stop {
                break;
            }
        }

        match self.termination.take() {
            Some(termination) => Ok(termination),
            None => {
                tracing::warn!(
                    "Stream ended after {} events without done/error",
                    self.dispatched
                );
                Err(Error::Protocol)
            }
        }
    }
}
