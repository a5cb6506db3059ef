use crate::chips::{derive_chips, removal_update, Chip};
use crate::debounce::{spawn_debounce, DEBOUNCE_WINDOW};
use crate::error::{SearchError, StateError};
use crate::fetcher::{FetcherConfig, ResultFetcher};
use crate::models::{
    PageEvent, Repository, SearchParameters, SearchResponse, SortEvent, SortField, SortOrder,
};
use crate::navigation::{spawn_url_sync, AddressBar};
use crate::params::{ParamStore, ParamsHandle, ParamsUpdate};
use crate::traits::RepositorySearch;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub debounce_window: Duration,
    pub fetcher: FetcherConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            debounce_window: DEBOUNCE_WINDOW,
            fetcher: FetcherConfig::default(),
        }
    }
}

/// Owns the authoritative parameter stream. UI events and navigation changes
/// all funnel into the parameter store's merge pipeline; each distinct
/// canonical state then triggers exactly one URL write and one fetch
/// dispatch, in merge order.
pub struct SearchOrchestrator<B> {
    params: ParamsHandle,
    canonical: watch::Receiver<SearchParameters>,
    address: AddressBar,
    fetcher: Arc<ResultFetcher<B>>,
    raw_text: mpsc::UnboundedSender<String>,
    shutdown: watch::Sender<bool>,
}

impl<B: RepositorySearch + Send + Sync + 'static> SearchOrchestrator<B> {
    pub fn spawn(backend: B, address: AddressBar, config: OrchestratorConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (params_handle, mut emissions, canonical) = ParamStore::spawn(shutdown_rx.clone());

        spawn_url_sync(address.clone(), params_handle.clone(), shutdown_rx.clone());

        let fetcher = Arc::new(ResultFetcher::new(Arc::new(backend), config.fetcher));

        // Debounced text path: raw keystrokes settle, then join the merge
        // pipeline like any other producer.
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (settled_tx, mut settled_rx) = mpsc::unbounded_channel();
        spawn_debounce(raw_rx, config.debounce_window, settled_tx);
        {
            let params = params_handle.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        settled = settled_rx.recv() => {
                            let Some(text) = settled else { break };
                            if params.update(ParamsUpdate::search(text)).is_err() {
                                break;
                            }
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            });
        }

        // Canonical loop. An ordered channel rather than a watch: every
        // distinct state is processed exactly once, none coalesced away.
        {
            let address = address.clone();
            let fetcher = Arc::clone(&fetcher);
            let mut shutdown = shutdown_rx;
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        emitted = emissions.recv() => {
                            let Some(current) = emitted else { break };
                            debug!(?current, "canonical change");
                            address.apply(&current);
                            fetcher.dispatch(current);
                        }
                        _ = shutdown.changed() => break,
                    }
                }
            });
        }

        Self {
            params: params_handle,
            canonical,
            address,
            fetcher,
            raw_text: raw_tx,
            shutdown: shutdown_tx,
        }
    }

    // Producers.

    /// Raw, possibly per-keystroke text input; settles through the debounce
    /// gate before it reaches the canonical state.
    pub fn type_text(&self, raw: impl Into<String>) -> Result<(), StateError> {
        self.raw_text
            .send(raw.into())
            .map_err(|_| StateError::ChannelClosed("input"))
    }

    /// Immediate text commit, bypassing the debounce gate.
    pub fn set_search(&self, text: impl Into<String>) -> Result<(), StateError> {
        self.params.update(ParamsUpdate::search(text))
    }

    pub fn set_sort(&self, event: SortEvent) -> Result<(), StateError> {
        let selection = match event.direction {
            Some(order) => SortField::parse(&event.active).map(|sort| (sort, order)),
            None => None,
        };
        self.params.update(ParamsUpdate::sort_pair(selection))
    }

    pub fn set_page(&self, event: PageEvent) -> Result<(), StateError> {
        self.params
            .update(ParamsUpdate::page(event.page_index + 1, event.page_size))
    }

    pub fn remove_chip(&self, chip: &Chip) -> Result<(), StateError> {
        self.params.update(removal_update(chip))
    }

    // Read-only projections of the canonical state, recomputed per read.

    pub fn params(&self) -> SearchParameters {
        self.canonical.borrow().clone()
    }

    pub fn subscribe_params(&self) -> watch::Receiver<SearchParameters> {
        self.canonical.clone()
    }

    pub fn query_text(&self) -> String {
        self.canonical.borrow().q.clone().unwrap_or_default()
    }

    pub fn sort_selection(&self) -> Option<(SortField, SortOrder)> {
        let current = self.canonical.borrow();
        current.sort.zip(current.order)
    }

    /// `(page, per_page)` with the page defaulting to 1 when unset.
    pub fn page_selection(&self) -> (u32, Option<u32>) {
        let current = self.canonical.borrow();
        (current.page.unwrap_or(1), current.per_page)
    }

    pub fn chips(&self) -> Vec<Chip> {
        derive_chips(&self.canonical.borrow())
    }

    pub fn address(&self) -> &AddressBar {
        &self.address
    }

    // Result streams, delegated from the fetcher.

    pub fn items(&self) -> Vec<Repository> {
        self.fetcher.items()
    }

    pub fn count(&self) -> u64 {
        self.fetcher.count()
    }

    pub fn is_empty(&self) -> bool {
        self.fetcher.is_empty()
    }

    pub fn is_loading(&self) -> bool {
        self.fetcher.is_loading()
    }

    pub fn last_error(&self) -> Option<Arc<SearchError>> {
        self.fetcher.last_error()
    }

    pub fn subscribe_response(&self) -> watch::Receiver<SearchResponse> {
        self.fetcher.subscribe_response()
    }

    pub fn subscribe_loading(&self) -> watch::Receiver<bool> {
        self.fetcher.subscribe_loading()
    }

    pub fn subscribe_error(&self) -> watch::Receiver<Option<Arc<SearchError>>> {
        self.fetcher.subscribe_error()
    }

    /// Tears the session down: every long-lived task observes the signal
    /// and exits, so no late callback touches destroyed state. Dropping the
    /// orchestrator has the same effect.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
