//! Paginated views over server-side collections
//!
//! One [`PageController`] per collection owns the cursor (page, page size,
//! total) and the items currently shown. A successful fetch replaces all of
//! it at once; a failed fetch leaves it untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use parley_client::{
    AgentApi, HistoryEntry, Page, PageQuery, UploadRecord, UsageRecord, page_count,
};

use crate::error::Result;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Where a controller gets its pages from
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Clone + Send + Sync + 'static;

    /// Whether fetches need a conversation scope. Unscoped fetches of a
    /// scoped source are never attempted.
    fn scoped(&self) -> bool {
        false
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<Self::Item>>;
}

/// Token-usage ledger of the active conversation
pub struct UsageSource {
    api: Arc<dyn AgentApi>,
}

impl UsageSource {
    pub fn new(api: Arc<dyn AgentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for UsageSource {
    type Item = UsageRecord;

    fn scoped(&self) -> bool {
        true
    }

    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<UsageRecord>> {
        Ok(self.api.fetch_usage(query).await?)
    }
}

/// Known conversations, newest first
pub struct HistorySource {
    api: Arc<dyn AgentApi>,
}

impl HistorySource {
    pub fn new(api: Arc<dyn AgentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for HistorySource {
    type Item = HistoryEntry;

    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<HistoryEntry>> {
        Ok(self.api.fetch_history(query).await?)
    }
}

/// Uploaded documents.
///
/// The service returns the whole list, so paging happens here.
pub struct UploadSource {
    api: Arc<dyn AgentApi>,
}

impl UploadSource {
    pub fn new(api: Arc<dyn AgentApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl PageSource for UploadSource {
    type Item = UploadRecord;

    async fn fetch_page(&self, query: &PageQuery) -> Result<Page<UploadRecord>> {
        let all = self.api.list_uploads().await?;
        let page_size = query.page_size.max(1);
        let page = query.page.max(1);
        let start = (page as usize - 1) * page_size as usize;
        let total = all.len() as u64;
        let items = all.into_iter().skip(start).take(page_size as usize).collect();
        Ok(Page {
            items,
            page,
            page_size,
            total,
        })
    }
}

/// Result of a navigation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    /// The page was fetched and is now shown
    Fetched,
    /// Out of range or no context: nothing was requested
    Skipped,
    /// Fetched, but the controller was reset or rescoped meanwhile; dropped
    Stale,
}

/// Read-only view of a controller, for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct PageView<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub page_count: u32,
    pub has_prev: bool,
    pub has_next: bool,
    /// False for a scoped collection with no conversation: show "no data"
    pub has_context: bool,
    /// A fetch is outstanding; navigation should be held off
    pub is_loading: bool,
}

#[derive(Debug)]
struct PageState<T> {
    page: u32,
    page_size: u32,
    total: u64,
    items: Vec<T>,
    scope: Option<String>,
}

impl<T> PageState<T> {
    fn page_count(&self) -> u32 {
        page_count(self.total, self.page_size)
    }
}

/// Pagination state and fetch logic for one collection
pub struct PageController<S: PageSource> {
    source: S,
    state: Mutex<PageState<S::Item>>,
    epoch: AtomicU64,
    in_flight: AtomicUsize,
}

impl<S: PageSource> PageController<S> {
    pub fn new(source: S) -> Self {
        Self::with_page_size(source, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(source: S, page_size: u32) -> Self {
        Self {
            source,
            state: Mutex::new(PageState {
                page: 1,
                page_size: page_size.max(1),
                total: 0,
                items: Vec::new(),
                scope: None,
            }),
            epoch: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn page(&self) -> u32 {
        self.state.lock().page
    }

    pub fn page_count(&self) -> u32 {
        self.state.lock().page_count()
    }

    pub fn scope(&self) -> Option<String> {
        self.state.lock().scope.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    /// Fetch page `n` and show it.
    ///
    /// Skipped without a request when `n < 1`, when `n` is past the last
    /// known page, or when a scoped collection has no conversation. Also
    /// skipped, after the request, when the fetched page turns out to lie
    /// past the end of a non-empty collection.
    pub async fn go_to_page(&self, n: u32) -> Result<PageOutcome> {
        let (query, epoch) = {
            let state = self.state.lock();
            if n < 1 {
                tracing::debug!("Page {} out of range, skipping fetch", n);
                return Ok(PageOutcome::Skipped);
            }
            if state.total > 0 && n > state.page_count() {
                tracing::debug!(
                    "Page {} past last page {}, skipping fetch",
                    n,
                    state.page_count()
                );
                return Ok(PageOutcome::Skipped);
            }
            if self.source.scoped() && state.scope.is_none() {
                tracing::debug!("No conversation scope, skipping fetch");
                return Ok(PageOutcome::Skipped);
            }
            let query = PageQuery::new(n, state.page_size).scoped(state.scope.clone());
            (query, self.epoch.load(Ordering::Acquire))
        };

        let page = {
            let _guard = InFlight::enter(&self.in_flight);
            self.source.fetch_page(&query).await?
        };

        let mut state = self.state.lock();
        if self.epoch.load(Ordering::Acquire) != epoch {
            tracing::debug!("Dropping page {} fetched before a reset", query.page);
            return Ok(PageOutcome::Stale);
        }
        let last = page_count(page.total, page.page_size);
        if page.total > 0 && page.page > last {
            tracing::debug!("Page {} past last page {}, keeping current page", page.page, last);
            return Ok(PageOutcome::Skipped);
        }
        state.page = page.page.max(1);
        state.page_size = page.page_size.max(1);
        state.total = page.total;
        state.items = page.items;
        Ok(PageOutcome::Fetched)
    }

    /// Fetch the page after the current one, if there is one
    pub async fn next_page(&self) -> Result<PageOutcome> {
        let target = {
            let state = self.state.lock();
            if state.page >= state.page_count() {
                return Ok(PageOutcome::Skipped);
            }
            state.page + 1
        };
        self.go_to_page(target).await
    }

    /// Fetch the page before the current one, if there is one
    pub async fn prev_page(&self) -> Result<PageOutcome> {
        let target = {
            let state = self.state.lock();
            if state.page <= 1 {
                return Ok(PageOutcome::Skipped);
            }
            state.page - 1
        };
        self.go_to_page(target).await
    }

    /// Re-fetch the current page
    pub async fn refresh(&self) -> Result<PageOutcome> {
        let page = self.page();
        self.go_to_page(page).await
    }

    /// Back to an empty first page. Calling it again changes nothing.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        self.epoch.fetch_add(1, Ordering::AcqRel);
        state.page = 1;
        state.total = 0;
        state.items.clear();
    }

    /// Change the conversation this collection is scoped by.
    ///
    /// A different scope resets the controller; the same scope is a no-op.
    /// Returns whether anything changed.
    pub fn set_scope(&self, scope: Option<String>) -> bool {
        let scope = scope
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        {
            let mut state = self.state.lock();
            if state.scope == scope {
                return false;
            }
            state.scope = scope;
        }
        self.reset();
        true
    }

    /// Snapshot for rendering
    pub fn snapshot(&self) -> PageView<S::Item> {
        let state = self.state.lock();
        let page_count = state.page_count();
        PageView {
            items: state.items.clone(),
            page: state.page,
            page_size: state.page_size,
            total: state.total,
            page_count,
            has_prev: state.page > 1,
            has_next: state.page < page_count,
            has_context: !self.source.scoped() || state.scope.is_some(),
            is_loading: self.is_loading(),
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    /// Serves pages out of a fixed total, recording every query
    struct FakeSource {
        total: u64,
        scoped: bool,
        fail: bool,
        queries: Mutex<Vec<PageQuery>>,
    }

    impl FakeSource {
        fn new(total: u64) -> Self {
            Self {
                total,
                scoped: false,
                fail: false,
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for FakeSource {
        type Item = u64;

        fn scoped(&self) -> bool {
            self.scoped
        }

        async fn fetch_page(&self, query: &PageQuery) -> Result<Page<u64>> {
            self.queries.lock().push(query.clone());
            if self.fail {
                return Err(Error::Client(parley_client::Error::status(500, "boom")));
            }
            let start = u64::from(query.page - 1) * u64::from(query.page_size);
            let end = (start + u64::from(query.page_size)).min(self.total);
            Ok(Page {
                items: (start..end.max(start)).collect(),
                page: query.page,
                page_size: query.page_size,
                total: self.total,
            })
        }
    }

    #[tokio::test]
    async fn test_page_count_and_bounds() {
        let controller = PageController::with_page_size(FakeSource::new(25), 20);
        assert_eq!(controller.go_to_page(1).await.unwrap(), PageOutcome::Fetched);
        assert_eq!(controller.page_count(), 2);

        assert_eq!(controller.go_to_page(2).await.unwrap(), PageOutcome::Fetched);
        let view = controller.snapshot();
        assert_eq!(view.items, (20..25).collect::<Vec<_>>());
        assert!(view.has_prev);
        assert!(!view.has_next);

        assert_eq!(controller.go_to_page(3).await.unwrap(), PageOutcome::Skipped);
        assert_eq!(controller.go_to_page(0).await.unwrap(), PageOutcome::Skipped);
        assert_eq!(controller.source.queries.lock().len(), 2);
        assert_eq!(controller.page(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_leaves_state_unchanged() {
        let controller = PageController::with_page_size(FakeSource::new(45), 20);
        controller.go_to_page(1).await.unwrap();
        let before = controller.snapshot();

        let past_end = controller.page_count() + 1;
        assert_eq!(controller.go_to_page(past_end).await.unwrap(), PageOutcome::Skipped);
        assert_eq!(controller.go_to_page(0).await.unwrap(), PageOutcome::Skipped);
        assert_eq!(controller.snapshot(), before);
        assert_eq!(controller.source.queries.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_server_echo_wins() {
        struct Clamping;

        #[async_trait]
        impl PageSource for Clamping {
            type Item = u64;
            async fn fetch_page(&self, _query: &PageQuery) -> Result<Page<u64>> {
                Ok(Page { items: vec![1], page: 1, page_size: 200, total: 1 })
            }
        }

        let controller = PageController::with_page_size(Clamping, 500);
        controller.go_to_page(4).await.unwrap();
        let view = controller.snapshot();
        assert_eq!(view.page, 1);
        assert_eq!(view.page_size, 200);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_last_good_state() {
        let mut source = FakeSource::new(30);
        source.fail = true;
        let controller = PageController::with_page_size(source, 10);
        assert!(controller.go_to_page(1).await.is_err());
        let view = controller.snapshot();
        assert_eq!(view.page, 1);
        assert_eq!(view.total, 0);
        assert!(view.items.is_empty());
        assert!(!view.is_loading);
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let controller = PageController::with_page_size(FakeSource::new(30), 10);
        controller.go_to_page(2).await.unwrap();

        controller.reset();
        let once = controller.snapshot();
        controller.reset();
        let twice = controller.snapshot();

        assert_eq!(once, twice);
        assert_eq!(twice.page, 1);
        assert_eq!(twice.total, 0);
        assert!(twice.items.is_empty());
        assert_eq!(twice.page_count, 1);
        assert!(!twice.has_prev && !twice.has_next);
    }

    #[tokio::test]
    async fn test_scoped_source_needs_context() {
        let mut source = FakeSource::new(5);
        source.scoped = true;
        let controller = PageController::new(source);

        assert_eq!(controller.go_to_page(1).await.unwrap(), PageOutcome::Skipped);
        assert!(!controller.snapshot().has_context);
        assert!(controller.source.queries.lock().is_empty());

        assert!(controller.set_scope(Some("c1".into())));
        assert!(!controller.set_scope(Some("c1".into())));
        assert_eq!(controller.go_to_page(1).await.unwrap(), PageOutcome::Fetched);
        assert_eq!(
            controller.source.queries.lock()[0].conversation_id.as_deref(),
            Some("c1")
        );

        assert!(controller.set_scope(None));
        let view = controller.snapshot();
        assert!(!view.has_context);
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_next_and_prev() {
        let controller = PageController::with_page_size(FakeSource::new(25), 10);
        assert_eq!(controller.prev_page().await.unwrap(), PageOutcome::Skipped);
        controller.go_to_page(1).await.unwrap();
        assert_eq!(controller.next_page().await.unwrap(), PageOutcome::Fetched);
        assert_eq!(controller.next_page().await.unwrap(), PageOutcome::Fetched);
        assert_eq!(controller.page(), 3);
        assert_eq!(controller.next_page().await.unwrap(), PageOutcome::Skipped);
        assert_eq!(controller.prev_page().await.unwrap(), PageOutcome::Fetched);
        assert_eq!(controller.page(), 2);
        assert_eq!(controller.refresh().await.unwrap(), PageOutcome::Fetched);
        assert_eq!(controller.page(), 2);
    }

    #[tokio::test]
    async fn test_fetch_racing_a_rescope_is_dropped() {
        use tokio::sync::Notify;

        struct Gated {
            gate: Arc<Notify>,
        }

        #[async_trait]
        impl PageSource for Gated {
            type Item = u64;
            fn scoped(&self) -> bool {
                true
            }
            async fn fetch_page(&self, query: &PageQuery) -> Result<Page<u64>> {
                self.gate.notified().await;
                Ok(Page { items: vec![7], page: query.page, page_size: query.page_size, total: 1 })
            }
        }

        let gate = Arc::new(Notify::new());
        let controller = Arc::new(PageController::new(Gated { gate: gate.clone() }));
        controller.set_scope(Some("old".into()));

        let task = tokio::spawn({
            let controller = Arc::clone(&controller);
            async move { controller.go_to_page(1).await }
        });
        while !controller.is_loading() {
            tokio::task::yield_now().await;
        }
        controller.set_scope(Some("new".into()));
        gate.notify_one();

        assert_eq!(task.await.unwrap().unwrap(), PageOutcome::Stale);
        let view = controller.snapshot();
        assert!(view.items.is_empty());
        assert!(!view.is_loading);
    }

    #[tokio::test]
    async fn test_upload_source_pages_client_side() {
        use crate::testing::FakeApi;

        let api = Arc::new(FakeApi::default());
        api.set_uploads(5);
        let controller = PageController::with_page_size(UploadSource::new(api.clone()), 2);

        controller.go_to_page(3).await.unwrap();
        let view = controller.snapshot();
        assert_eq!(view.total, 5);
        assert_eq!(view.page_count, 3);
        assert_eq!(view.items.len(), 1);
        assert_eq!(view.items[0].stored_name, "upload-4");
    }

    #[tokio::test]
    async fn test_fresh_controller_rejects_page_past_the_end() {
        use crate::testing::FakeApi;

        let api = Arc::new(FakeApi::default());
        api.set_uploads(5);
        let controller = PageController::with_page_size(UploadSource::new(api.clone()), 2);

        assert_eq!(controller.go_to_page(9).await.unwrap(), PageOutcome::Skipped);
        let view = controller.snapshot();
        assert_eq!(view.page, 1);
        assert_eq!(view.total, 0);
        assert!(view.items.is_empty());

        controller.go_to_page(3).await.unwrap();
        assert_eq!(controller.go_to_page(9).await.unwrap(), PageOutcome::Skipped);
        let view = controller.snapshot();
        assert!(view.page >= 1 && view.page <= view.page_count);
        assert_eq!(view.page, 3);
    }
}
