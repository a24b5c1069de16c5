//! parley-session: the client runtime behind a parley conversation
//!
//! A [`Session`] sends one user message at a time, drives the resulting
//! event stream through a [`Dispatcher`], keeps the active conversation in
//! [`ConversationState`], and keeps the usage, history and upload views in
//! [`PageController`]s consistent with it.

pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod observer;
pub mod pagination;
pub mod session;

#[cfg(test)]
mod testing;

pub use conversation::{ConversationState, ConversationStore, MemoryStore};
pub use dispatcher::{Dispatcher, Flow, StreamHandler, Termination};
pub use error::{Error, Result};
pub use handle::SessionHandle;
pub use observer::{NoopObserver, SessionObserver};
pub use pagination::{
    DEFAULT_PAGE_SIZE, HistorySource, PageController, PageOutcome, PageSource, PageView,
    UploadSource, UsageSource,
};
pub use session::{Session, SessionConfig, TurnReport};
