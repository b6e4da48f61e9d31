//! Incremental list loading
//!
//! [`PagedListController`] owns one page-bounded sequence for a single data
//! source (a feed, a follower list, a chat history) and drives an injected
//! [`PageLoader`] one page at a time. The presentation layer renders from the
//! controller's flags: `is_loading`, `has_more_pages`, and `error`.
//!
//! At most one load is in flight per controller. The check-and-set of the
//! flight guard happens under a lock, so concurrent callers on a
//! multi-threaded runtime cannot double-append a page. Loads run under a
//! deadline and can be cancelled; a load superseded by `refresh`, `clear`, or
//! `cancel` has its result discarded.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{watch, Notify};

/// Default number of items requested per page
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Default deadline for a single page load
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced while loading a page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The loader reported a failure; the message is shown to the user as-is
    #[error("{0}")]
    Failed(String),

    /// The loader did not resolve before the deadline
    #[error("load timed out after {0:?}")]
    TimedOut(Duration),

    /// The load was cancelled
    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    /// Create a loader failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        LoadError::Failed(message.into())
    }
}

/// Data source for one paged list
///
/// Given a 0-based page index, asynchronously produce that page's items.
/// Loaders must be safe to call again with the same index (retries).
///
/// Async closures `Fn(usize) -> impl Future<Output = Result<Vec<T>, LoadError>>`
/// implement this trait.
#[async_trait]
pub trait PageLoader<T>: Send + Sync {
    /// Load the items of `page`
    async fn load_page(&self, page: usize) -> Result<Vec<T>, LoadError>;
}

#[async_trait]
impl<T, F, Fut> PageLoader<T> for F
where
    T: Send + 'static,
    F: Fn(usize) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<T>, LoadError>> + Send + 'static,
{
    async fn load_page(&self, page: usize) -> Result<Vec<T>, LoadError> {
        (self)(page).await
    }
}

/// How the controller decides that a source is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExhaustionPolicy {
    /// Only an empty page ends the list
    #[default]
    EmptyPage,
    /// A page shorter than the configured page size ends the list
    ShortPage,
}

/// Paged list configuration
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// Items per page the loader is expected to return
    pub page_size: usize,
    /// Deadline for a single page load
    pub load_timeout: Duration,
    /// Exhaustion rule
    pub exhaustion: ExhaustionPolicy,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            exhaustion: ExhaustionPolicy::EmptyPage,
        }
    }
}

impl PaginationConfig {
    /// Set the page size
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Set the per-load deadline
    pub fn load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Set the exhaustion rule
    pub fn exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion = policy;
        self
    }

    fn has_more(&self, received: usize) -> bool {
        match self.exhaustion {
            ExhaustionPolicy::EmptyPage => received > 0,
            ExhaustionPolicy::ShortPage => received > 0 && received >= self.page_size,
        }
    }
}

/// Observable state of a paged list
#[derive(Debug, Clone, PartialEq)]
pub struct PaginationState<T> {
    /// Loaded items, in load order
    pub items: Vec<T>,
    /// A load is in flight
    pub is_loading: bool,
    /// The source may have more pages
    pub has_more_pages: bool,
    /// Index of the next page to load
    pub current_page: usize,
    /// Message of the last failed load
    pub error: Option<String>,
}

impl<T> Default for PaginationState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            is_loading: false,
            has_more_pages: true,
            current_page: 0,
            error: None,
        }
    }
}

/// Item-free summary of a [`PaginationState`], published to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PaginationStatus {
    /// A load is in flight
    pub is_loading: bool,
    /// The source may have more pages
    pub has_more_pages: bool,
    /// Index of the next page to load
    pub current_page: usize,
    /// Number of loaded items
    pub item_count: usize,
    /// Message of the last failed load
    pub error: Option<String>,
}

impl<T> From<&PaginationState<T>> for PaginationStatus {
    fn from(state: &PaginationState<T>) -> Self {
        Self {
            is_loading: state.is_loading,
            has_more_pages: state.has_more_pages,
            current_page: state.current_page,
            item_count: state.items.len(),
            error: state.error.clone(),
        }
    }
}

/// Why a load request did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another load is in flight
    InFlight,
    /// The source is exhausted
    Exhausted,
}

/// Result of a load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was loaded
    Loaded {
        /// Number of items received
        received: usize,
        /// Whether more pages may follow
        has_more: bool,
    },
    /// The load failed; the message is in the state's `error`
    Failed(LoadError),
    /// The request was ignored
    Skipped(SkipReason),
    /// The load finished after `refresh`, `clear`, or `cancel`; its result was discarded
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flight {
    /// Append the next page
    Next,
    /// Replace everything with page 0
    Reload,
}

struct Inner<T> {
    state: PaginationState<T>,
    /// Bumped whenever an in-flight result must be discarded
    generation: u64,
    /// Cancel handle of the load in flight, owned by that load alone
    flight: Option<Arc<Notify>>,
}

impl<T> Inner<T> {
    /// Discard the load in flight, if any, returning its cancel handle
    fn supersede(&mut self) -> Option<Arc<Notify>> {
        self.generation += 1;
        self.state.is_loading = false;
        self.flight.take()
    }
}

/// Releases the flight guard if a load future is dropped before it finishes
struct FlightGuard<'a, T> {
    controller: &'a PagedListController<T>,
    generation: u64,
    armed: bool,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let abandoned = {
            let mut inner = self.controller.inner.lock();
            if inner.generation == self.generation && inner.state.is_loading {
                inner.supersede();
                true
            } else {
                false
            }
        };
        if abandoned {
            tracing::debug!("page load dropped before completion");
            self.controller.publish();
        }
    }
}

/// Controller for one incrementally loaded list
pub struct PagedListController<T> {
    config: PaginationConfig,
    inner: Mutex<Inner<T>>,
    status_tx: watch::Sender<PaginationStatus>,
}

impl<T> Default for PagedListController<T>
where
    T: Send + 'static,
{
    fn default() -> Self {
        Self::new(PaginationConfig::default())
    }
}

impl<T> PagedListController<T>
where
    T: Send + 'static,
{
    /// Create an empty controller
    pub fn new(config: PaginationConfig) -> Self {
        let state = PaginationState::default();
        let (status_tx, _) = watch::channel(PaginationStatus::from(&state));
        Self {
            config,
            inner: Mutex::new(Inner { state, generation: 0, flight: None }),
            status_tx,
        }
    }

    /// Controller configuration
    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Load the next page and append it
    ///
    /// Returns immediately with [`LoadOutcome::Skipped`] when a load is
    /// already in flight or the source is exhausted.
    pub async fn load_next<L>(&self, loader: &L) -> LoadOutcome
    where
        L: PageLoader<T> + ?Sized,
    {
        self.fly(loader, Flight::Next).await
    }

    /// Retry after a failure; same as [`load_next`](Self::load_next)
    pub async fn retry<L>(&self, loader: &L) -> LoadOutcome
    where
        L: PageLoader<T> + ?Sized,
    {
        self.fly(loader, Flight::Next).await
    }

    /// Reload from page 0 through the flight guard, replacing all items on success
    ///
    /// Unlike [`refresh`](Self::refresh) the items come from the loader, and
    /// the cursor ends on page 1 so the next `load_next` continues after them.
    pub async fn reload<L>(&self, loader: &L) -> LoadOutcome
    where
        L: PageLoader<T> + ?Sized,
    {
        self.fly(loader, Flight::Reload).await
    }

    /// Replace all items with `items` and rewind to page 0
    ///
    /// A load in flight is superseded: its result is discarded and the flight
    /// guard is released.
    pub fn refresh(&self, items: Vec<T>) {
        let superseded = {
            let mut inner = self.inner.lock();
            let flight = inner.supersede();
            inner.state.items = items;
            inner.state.current_page = 0;
            inner.state.has_more_pages = true;
            inner.state.error = None;
            flight
        };
        if let Some(flight) = superseded {
            tracing::debug!("refresh superseded an in-flight page load");
            flight.notify_one();
        }
        self.publish();
    }

    /// Reset to the initial empty state
    pub fn clear(&self) {
        let superseded = {
            let mut inner = self.inner.lock();
            let flight = inner.supersede();
            inner.state = PaginationState::default();
            flight
        };
        if let Some(flight) = superseded {
            flight.notify_one();
        }
        self.publish();
    }

    /// Abort the in-flight load, if any
    ///
    /// Returns `true` if a load was in flight. Items and cursor are left as
    /// they were before the load started, and no error is recorded.
    pub fn cancel(&self) -> bool {
        let flight = {
            let mut inner = self.inner.lock();
            if !inner.state.is_loading {
                return false;
            }
            inner.supersede()
        };
        tracing::debug!("page load cancelled");
        if let Some(flight) = flight {
            flight.notify_one();
        }
        self.publish();
        true
    }

    /// Whether a load is in flight
    pub fn is_loading(&self) -> bool {
        self.inner.lock().state.is_loading
    }

    /// Whether the source may have more pages
    pub fn has_more_pages(&self) -> bool {
        self.inner.lock().state.has_more_pages
    }

    /// Index of the next page to load
    pub fn current_page(&self) -> usize {
        self.inner.lock().state.current_page
    }

    /// Message of the last failed load
    pub fn error(&self) -> Option<String> {
        self.inner.lock().state.error.clone()
    }

    /// Number of loaded items
    pub fn len(&self) -> usize {
        self.inner.lock().state.items.len()
    }

    /// Whether no items are loaded
    pub fn is_empty(&self) -> bool {
        self.inner.lock().state.items.is_empty()
    }

    /// Current status without items
    pub fn status(&self) -> PaginationStatus {
        PaginationStatus::from(&self.inner.lock().state)
    }

    /// Subscribe to status changes
    pub fn subscribe(&self) -> watch::Receiver<PaginationStatus> {
        self.status_tx.subscribe()
    }

    async fn fly<L>(&self, loader: &L, flight: Flight) -> LoadOutcome
    where
        L: PageLoader<T> + ?Sized,
    {
        let (page, generation, cancel) = {
            let mut inner = self.inner.lock();
            if inner.state.is_loading {
                return LoadOutcome::Skipped(SkipReason::InFlight);
            }
            if flight == Flight::Next && !inner.state.has_more_pages {
                return LoadOutcome::Skipped(SkipReason::Exhausted);
            }
            // `notify_one` leaves a permit, so a cancel issued before the
            // loader is polled is not lost.
            let cancel = Arc::new(Notify::new());
            inner.flight = Some(Arc::clone(&cancel));
            inner.state.is_loading = true;
            inner.state.error = None;
            let page = match flight {
                Flight::Next => inner.state.current_page,
                Flight::Reload => 0,
            };
            (page, inner.generation, cancel)
        };
        let mut guard = FlightGuard { controller: self, generation, armed: true };
        self.publish();

        let result = self.run_loader(loader, page, &cancel).await;
        guard.armed = false;

        let outcome = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                tracing::debug!(page, "discarding superseded page load");
                return LoadOutcome::Superseded;
            }
            inner.flight = None;
            let state = &mut inner.state;
            state.is_loading = false;
            match result {
                Ok(items) => {
                    let received = items.len();
                    let has_more = self.config.has_more(received);
                    match flight {
                        Flight::Next => {
                            state.items.extend(items);
                            state.current_page += 1;
                        }
                        Flight::Reload => {
                            state.items = items;
                            state.current_page = 1;
                        }
                    }
                    state.has_more_pages = has_more;
                    tracing::debug!(page, received, has_more, "page loaded");
                    LoadOutcome::Loaded { received, has_more }
                }
                Err(LoadError::Cancelled) => {
                    tracing::debug!(page, "page load cancelled by loader");
                    LoadOutcome::Superseded
                }
                Err(error) => {
                    tracing::warn!(page, %error, "page load failed");
                    state.error = Some(error.to_string());
                    LoadOutcome::Failed(error)
                }
            }
        };
        self.publish();
        outcome
    }

    async fn run_loader<L>(
        &self,
        loader: &L,
        page: usize,
        cancel: &Notify,
    ) -> Result<Vec<T>, LoadError>
    where
        L: PageLoader<T> + ?Sized,
    {
        let timeout = self.config.load_timeout;

        tokio::select! {
            result = tokio::time::timeout(timeout, loader.load_page(page)) => {
                result.unwrap_or(Err(LoadError::TimedOut(timeout)))
            }
            _ = cancel.notified() => Err(LoadError::Cancelled),
        }
    }
}

impl<T> PagedListController<T> {
    fn publish(&self) {
        let status = PaginationStatus::from(&self.inner.lock().state);
        self.status_tx.send_replace(status);
    }
}

impl<T> PagedListController<T>
where
    T: Clone + Send + 'static,
{
    /// Copy of the loaded items
    pub fn items(&self) -> Vec<T> {
        self.inner.lock().state.items.clone()
    }

    /// Copy of the full state
    pub fn snapshot(&self) -> PaginationState<T> {
        self.inner.lock().state.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn full_pages(page: usize) -> impl Future<Output = Result<Vec<usize>, LoadError>> {
        async move { Ok(vec![page * 10, page * 10 + 1, page * 10 + 2]) }
    }

    /// Loader that blocks until the gate opens
    #[derive(Clone)]
    struct GatedLoader {
        gate: Arc<Notify>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PageLoader<usize> for GatedLoader {
        async fn load_page(&self, page: usize) -> Result<Vec<usize>, LoadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.gate.notified().await;
            Ok(vec![page; 3])
        }
    }

    async fn wait_until_loading<T: Send + 'static>(controller: &PagedListController<T>) {
        while !controller.is_loading() {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_initial_state() {
        let controller: PagedListController<u8> = PagedListController::default();
        let state = controller.snapshot();

        assert!(state.items.is_empty());
        assert!(!state.is_loading);
        assert!(state.has_more_pages);
        assert_eq!(state.current_page, 0);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_full_pages_advance_cursor() {
        let controller: PagedListController<usize> = PagedListController::default();

        for n in 1..=4 {
            let outcome = controller.load_next(&full_pages).await;
            assert_eq!(outcome, LoadOutcome::Loaded { received: 3, has_more: true });
            assert_eq!(controller.current_page(), n);
            assert!(controller.has_more_pages());
        }

        assert_eq!(controller.len(), 12);
        assert_eq!(&controller.items()[..4], &[0, 1, 2, 10]);
    }

    #[tokio::test]
    async fn test_empty_page_exhausts_source() {
        let controller: PagedListController<usize> = PagedListController::default();
        let loader = |page: usize| async move {
            if page < 2 {
                Ok::<_, LoadError>(vec![page])
            } else {
                Ok(Vec::new())
            }
        };

        controller.load_next(&loader).await;
        controller.load_next(&loader).await;
        let outcome = controller.load_next(&loader).await;

        assert_eq!(outcome, LoadOutcome::Loaded { received: 0, has_more: false });
        assert!(!controller.has_more_pages());
        assert_eq!(controller.current_page(), 3);

        let items_before = controller.items();
        let outcome = controller.load_next(&full_pages).await;
        assert_eq!(outcome, LoadOutcome::Skipped(SkipReason::Exhausted));
        assert_eq!(controller.items(), items_before);
        assert_eq!(controller.current_page(), 3);
    }

    #[tokio::test]
    async fn test_short_page_policy() {
        let controller: PagedListController<u32> = PagedListController::new(
            PaginationConfig::default().page_size(3).exhaustion(ExhaustionPolicy::ShortPage),
        );
        let loader = |page: usize| async move {
            Ok::<_, LoadError>(if page == 0 { vec![1, 2, 3] } else { vec![4] })
        };

        controller.load_next(&loader).await;
        assert!(controller.has_more_pages());

        let outcome = controller.load_next(&loader).await;
        assert_eq!(outcome, LoadOutcome::Loaded { received: 1, has_more: false });
        assert_eq!(controller.items(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let controller: PagedListController<&'static str> = PagedListController::default();
        let loader = |_page: usize| async { Ok::<_, LoadError>(vec!["same"]) };

        controller.load_next(&loader).await;
        controller.load_next(&loader).await;

        assert_eq!(controller.items(), vec!["same", "same"]);
    }

    #[tokio::test]
    async fn test_load_while_in_flight_is_noop() {
        let controller = Arc::new(PagedListController::<usize>::default());
        let loader = GatedLoader {
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let first = {
            let controller = Arc::clone(&controller);
            let loader = loader.clone();
            tokio::spawn(async move { controller.load_next(&loader).await })
        };
        wait_until_loading(&controller).await;

        let second = controller.load_next(&loader).await;
        assert_eq!(second, LoadOutcome::Skipped(SkipReason::InFlight));

        loader.gate.notify_one();
        let first = first.await.unwrap();

        assert_eq!(first, LoadOutcome::Loaded { received: 3, has_more: true });
        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.current_page(), 1);
        assert_eq!(controller.len(), 3);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_failure_keeps_items_and_retry_recovers() {
        let controller: PagedListController<usize> = PagedListController::default();
        controller.load_next(&full_pages).await;
        controller.load_next(&full_pages).await;
        let items_after_two = controller.items();

        let failing = |_page: usize| async { Err::<Vec<usize>, _>(LoadError::failed("timeout")) };
        let outcome = controller.load_next(&failing).await;

        assert_eq!(outcome, LoadOutcome::Failed(LoadError::failed("timeout")));
        assert_eq!(controller.error().as_deref(), Some("timeout"));
        assert_eq!(controller.items(), items_after_two);
        assert_eq!(controller.current_page(), 2);
        assert!(!controller.is_loading());

        let outcome = controller.retry(&full_pages).await;
        assert_eq!(outcome, LoadOutcome::Loaded { received: 3, has_more: true });
        assert_eq!(controller.error(), None);
        assert_eq!(controller.current_page(), 3);
        assert_eq!(&controller.items()[6..], &[20, 21, 22]);
    }

    #[tokio::test]
    async fn test_refresh_resets_cursor() {
        let controller: PagedListController<usize> = PagedListController::default();
        controller.load_next(&full_pages).await;
        controller.load_next(&|_page: usize| async { Ok::<_, LoadError>(Vec::<usize>::new()) }).await;
        assert!(!controller.has_more_pages());

        controller.refresh(vec![7, 8, 9]);

        let state = controller.snapshot();
        assert_eq!(state.items, vec![7, 8, 9]);
        assert_eq!(state.current_page, 0);
        assert!(state.has_more_pages);
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_refresh_supersedes_in_flight_load() {
        let controller = Arc::new(PagedListController::<usize>::default());
        let loader = GatedLoader {
            gate: Arc::new(Notify::new()),
            calls: Arc::new(AtomicUsize::new(0)),
        };

        let pending = {
            let controller = Arc::clone(&controller);
            let loader = loader.clone();
            tokio::spawn(async move { controller.load_next(&loader).await })
        };
        wait_until_loading(&controller).await;

        controller.refresh(vec![1, 2]);
        assert!(!controller.is_loading());

        assert_eq!(pending.await.unwrap(), LoadOutcome::Superseded);
        assert_eq!(controller.items(), vec![1, 2]);
        assert_eq!(controller.current_page(), 0);
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let controller: PagedListController<usize> = PagedListController::default();
        controller.load_next(&full_pages).await;
        controller
            .load_next(&|_page: usize| async { Err::<Vec<usize>, _>(LoadError::failed("boom")) })
            .await;

        controller.clear();

        assert_eq!(controller.snapshot(), PaginationState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_loader_times_out_into_retryable_error() {
        let controller: PagedListController<usize> = PagedListController::new(
            PaginationConfig::default().load_timeout(Duration::from_secs(5)),
        );
        let hung = |_page: usize| std::future::pending::<Result<Vec<usize>, LoadError>>();

        let outcome = controller.load_next(&hung).await;

        assert_eq!(outcome, LoadOutcome::Failed(LoadError::TimedOut(Duration::from_secs(5))));
        assert!(!controller.is_loading());
        assert!(controller.error().unwrap().contains("timed out"));

        let outcome = controller.retry(&full_pages).await;
        assert!(matches!(outcome, LoadOutcome::Loaded { .. }));
        assert_eq!(controller.error(), None);
    }

    #[tokio::test]
    async fn test_cancel_releases_flight_guard() {
        let controller = Arc::new(PagedListController::<usize>::default());
        assert!(!controller.cancel());

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                let hung = |_page: usize| std::future::pending::<Result<Vec<usize>, LoadError>>();
                controller.load_next(&hung).await
            })
        };
        wait_until_loading(&controller).await;

        assert!(controller.cancel());
        assert_eq!(pending.await.unwrap(), LoadOutcome::Superseded);
        assert!(!controller.is_loading());
        assert_eq!(controller.current_page(), 0);

        assert!(matches!(controller.load_next(&full_pages).await, LoadOutcome::Loaded { .. }));
    }

    #[tokio::test]
    async fn test_dropped_load_releases_flight_guard() {
        let controller = Arc::new(PagedListController::<usize>::default());
        let mut rx = controller.subscribe();

        let pending = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                let hung = |_page: usize| std::future::pending::<Result<Vec<usize>, LoadError>>();
                controller.load_next(&hung).await
            })
        };
        wait_until_loading(&controller).await;

        pending.abort();
        assert!(pending.await.unwrap_err().is_cancelled());

        assert!(!controller.is_loading());
        assert_eq!(controller.error(), None);
        assert!(!rx.borrow_and_update().is_loading);

        let outcome = controller.load_next(&full_pages).await;
        assert_eq!(outcome, LoadOutcome::Loaded { received: 3, has_more: true });
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test]
    async fn test_load_after_refresh_is_not_cancelled() {
        let controller = Arc::new(PagedListController::<usize>::default());

        let stale = {
            let controller = Arc::clone(&controller);
            tokio::spawn(async move {
                let hung = |_page: usize| std::future::pending::<Result<Vec<usize>, LoadError>>();
                controller.load_next(&hung).await
            })
        };
        wait_until_loading(&controller).await;

        // The stale load has not observed its cancel yet when the next one starts
        controller.refresh(vec![1]);
        let outcome = controller.load_next(&full_pages).await;

        assert_eq!(outcome, LoadOutcome::Loaded { received: 3, has_more: true });
        assert_eq!(controller.error(), None);
        assert_eq!(controller.items(), vec![1, 0, 1, 2]);
        assert_eq!(stale.await.unwrap(), LoadOutcome::Superseded);
    }

    #[tokio::test]
    async fn test_loader_cancellation_is_not_an_error() {
        let controller: PagedListController<usize> = PagedListController::default();
        let cancelled = |_page: usize| async { Err::<Vec<usize>, _>(LoadError::Cancelled) };

        assert_eq!(controller.load_next(&cancelled).await, LoadOutcome::Superseded);
        assert_eq!(controller.error(), None);
        assert!(!controller.is_loading());
        assert_eq!(controller.current_page(), 0);
    }

    #[tokio::test]
    async fn test_reload_replaces_items() {
        let controller: PagedListController<usize> = PagedListController::default();
        controller.load_next(&full_pages).await;
        controller.load_next(&full_pages).await;

        let fresh = |_page: usize| async { Ok::<_, LoadError>(vec![99usize]) };
        let outcome = controller.reload(&fresh).await;

        assert_eq!(outcome, LoadOutcome::Loaded { received: 1, has_more: true });
        assert_eq!(controller.items(), vec![99]);
        assert_eq!(controller.current_page(), 1);
    }

    #[tokio::test]
    async fn test_status_subscription() {
        let controller: PagedListController<usize> = PagedListController::default();
        let mut rx = controller.subscribe();
        assert_eq!(*rx.borrow(), PaginationStatus { has_more_pages: true, ..Default::default() });

        controller.load_next(&full_pages).await;

        rx.changed().await.unwrap();
        let status = rx.borrow().clone();
        assert_eq!(status.item_count, 3);
        assert_eq!(status.current_page, 1);
        assert!(!status.is_loading);
    }
}
