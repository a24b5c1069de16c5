//! A cloneable handle for aborting a turn from outside `send`.

use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for aborting the session's in-flight turns.
///
/// All fields are `Arc`-wrapped, so cloning is cheap.
#[derive(Clone, Default)]
pub struct SessionHandle {
    cancel: Arc<Mutex<CancellationToken>>,
    running: Arc<AtomicUsize>,
}

impl SessionHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Abort every turn currently streaming. They fail with `Error::Aborted`.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Whether a turn is currently streaming.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) > 0
    }

    /// Token for a turn that is starting. A token spent by an earlier abort
    /// is replaced so the new turn is not born cancelled.
    pub(crate) fn begin_turn(&self) -> TurnGuard {
        let token = {
            let mut cancel = self.cancel.lock();
            if cancel.is_cancelled() {
                *cancel = CancellationToken::new();
            }
            cancel.clone()
        };
        self.running.fetch_add(1, Ordering::AcqRel);
        TurnGuard {
            token,
            running: Arc::clone(&self.running),
        }
    }
}

/// Marks one turn as running until dropped
pub(crate) struct TurnGuard {
    pub(crate) token: CancellationToken,
    running: Arc<AtomicUsize>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::AcqRel);
    }
}
