//! Conversation identity and its persistence hook

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Persistence for the active conversation id.
///
/// Failures are reported, never fatal: the caller logs them and carries on.
pub trait ConversationStore: Send + Sync {
    /// Load the last saved id, if any
    fn load(&self) -> Result<Option<String>>;
    /// Remember an id
    fn save(&self, conversation_id: &str) -> Result<()>;
    /// Forget the saved id
    fn clear(&self) -> Result<()>;
}

/// In-process store, used when nothing should outlive the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    saved: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_saved(conversation_id: impl Into<String>) -> Self {
        Self {
            saved: Mutex::new(Some(conversation_id.into())),
        }
    }
}

impl ConversationStore for MemoryStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.saved.lock().clone())
    }

    fn save(&self, conversation_id: &str) -> Result<()> {
        *self.saved.lock() = Some(conversation_id.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.saved.lock() = None;
        Ok(())
    }
}

/// The active conversation identity.
///
/// Cloning shares the same underlying state. Writes are last-write-wins.
#[derive(Clone)]
pub struct ConversationState {
    current: Arc<Mutex<Option<String>>>,
    store: Arc<dyn ConversationStore>,
}

impl ConversationState {
    /// Empty state backed by `store`
    pub fn new(store: Arc<dyn ConversationStore>) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            store,
        }
    }

    /// State initialised from whatever `store` has saved
    pub fn restore(store: Arc<dyn ConversationStore>) -> Self {
        let initial = match store.load() {
            Ok(id) => id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to load saved conversation id: {}", e);
                None
            }
        };
        if let Some(ref id) = initial {
            tracing::debug!("Restored conversation {}", id);
        }
        Self {
            current: Arc::new(Mutex::new(initial)),
            store,
        }
    }

    pub fn get(&self) -> Option<String> {
        self.current.lock().clone()
    }

    /// Store `id`; persist it when it is non-blank
    pub fn set(&self, id: impl Into<String>) {
        let id = id.into();
        let trimmed = id.trim().to_string();
        *self.current.lock() = Some(id);

        if trimmed.is_empty() {
            return;
        }
        if let Err(e) = self.store.save(&trimmed) {
            tracing::warn!("Failed to persist conversation id {}: {}", trimmed, e);
        }
    }

    /// Drop the identity; the next turn starts a new thread
    pub fn clear(&self) {
        *self.current.lock() = None;
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear saved conversation id: {}", e);
        }
    }

    /// `set`, reporting whether the identity actually changed.
    ///
    /// A change means every collection scoped by the conversation must go
    /// back to page 1.
    pub fn switch_to(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        let changed = self.current.lock().as_deref() != Some(id.as_str());
        self.set(id);
        changed
    }
}

impl std::fmt::Debug for ConversationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationState")
            .field("current", &self.get())
            .finish()
    }
}
