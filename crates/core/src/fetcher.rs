use crate::error::SearchError;
use crate::models::{Repository, SearchParameters, SearchResponse};
use crate::traits::RepositorySearch;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::debug;

/// Artificial settling delay between dispatch and request execution.
pub const DISPATCH_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy)]
pub struct FetcherConfig {
    pub dispatch_delay: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            dispatch_delay: DISPATCH_DELAY,
        }
    }
}

/// The fetcher's output channels plus the dispatch generation. Every write
/// re-checks the generation inside the watch critical section, so a stale
/// attempt can never slip a publish past a newer dispatch.
#[derive(Clone)]
struct Streams {
    response: Arc<watch::Sender<SearchResponse>>,
    loading: Arc<watch::Sender<bool>>,
    error: Arc<watch::Sender<Option<Arc<SearchError>>>>,
    generation: Arc<AtomicU64>,
}

impl Streams {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    // Deduplicated: equal consecutive values do not notify.
    fn set_loading(&self, generation: u64, value: bool) {
        self.loading.send_if_modified(|current| {
            if !self.is_current(generation) || *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    // Deduplicated by message; errors carry no identity beyond it.
    fn set_error(&self, generation: u64, next: Option<Arc<SearchError>>) {
        self.error.send_if_modified(|current| {
            if !self.is_current(generation) {
                return false;
            }
            let unchanged = match (&*current, &next) {
                (None, None) => true,
                (Some(previous), Some(candidate)) => {
                    previous.to_string() == candidate.to_string()
                }
                _ => false,
            };
            if unchanged {
                return false;
            }
            *current = next;
            true
        });
    }

    fn publish(&self, generation: u64, response: SearchResponse) {
        self.response.send_if_modified(|current| {
            if !self.is_current(generation) {
                return false;
            }
            *current = response;
            true
        });
    }
}

/// Runs the per-parameter-set request state machine:
/// `Idle → Pending → (delay) → InFlight → Success | Failure`, with trivial
/// queries short-circuiting straight to the empty response. Dispatching a
/// new parameter set supersedes the previous attempt: the old request may
/// still complete, but its outcome is discarded, never merged.
pub struct ResultFetcher<B> {
    backend: Arc<B>,
    config: FetcherConfig,
    streams: Streams,
}

impl<B: RepositorySearch + Send + Sync + 'static> ResultFetcher<B> {
    pub fn new(backend: Arc<B>, config: FetcherConfig) -> Self {
        Self {
            backend,
            config,
            streams: Streams {
                response: Arc::new(watch::channel(SearchResponse::empty()).0),
                loading: Arc::new(watch::channel(false).0),
                error: Arc::new(watch::channel(None).0),
                generation: Arc::new(AtomicU64::new(0)),
            },
        }
    }

    /// Starts a fetch attempt for a new canonical parameter set.
    pub fn dispatch(&self, params: SearchParameters) {
        let generation = self.streams.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // The superseded attempt can no longer publish anything, including
        // the end of its own loading span; clean that up here.
        self.streams.set_loading(generation, false);

        if !params.has_searchable_query() {
            debug!(
                query = params.q.as_deref().unwrap_or_default(),
                "query below threshold, short-circuiting to the empty response"
            );
            self.streams.publish(generation, SearchResponse::empty());
            return;
        }

        let backend = Arc::clone(&self.backend);
        let streams = self.streams.clone();
        let delay = self.config.dispatch_delay;

        tokio::spawn(async move {
            streams.set_loading(generation, true);
            streams.set_error(generation, None);

            sleep(delay).await;
            if !streams.is_current(generation) {
                debug!(generation, "superseded before the request was sent");
                return;
            }

            let outcome = backend.search_repositories(&params).await;
            if !streams.is_current(generation) {
                debug!(generation, "superseded in flight, outcome discarded");
                return;
            }

            match outcome {
                Ok(response) => streams.publish(generation, response),
                Err(error) => {
                    debug!(%error, "search failed, masking with the empty response");
                    streams.set_error(generation, Some(Arc::new(error)));
                    streams.publish(generation, SearchResponse::empty());
                }
            }
            streams.set_loading(generation, false);
        });
    }

    pub fn subscribe_response(&self) -> watch::Receiver<SearchResponse> {
        self.streams.response.subscribe()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.streams.loading.subscribe()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<Arc<SearchError>>> {
        self.streams.error.subscribe()
    }

    // Derived views over the latest response; recomputed on read, not
    // stored. `is_empty` starts true because the initial response is empty.

    pub fn items(&self) -> Vec<Repository> {
        self.streams.response.borrow().items.clone()
    }

    pub fn count(&self) -> u64 {
        self.streams.response.borrow().total_count
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_loading(&self) -> bool {
        *self.streams.loading.borrow()
    }

    pub fn last_error(&self) -> Option<Arc<SearchError>> {
        self.streams.error.borrow().clone()
    }
}
