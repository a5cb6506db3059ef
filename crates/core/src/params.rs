use crate::error::StateError;
use crate::models::{SearchParameters, SortField, SortOrder};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// One key of a partial parameter update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate<T> {
    Keep,
    Clear,
    Set(T),
}

impl<T> Default for FieldUpdate<T> {
    fn default() -> Self {
        FieldUpdate::Keep
    }
}

impl<T: Clone> FieldUpdate<T> {
    fn fold(&self, previous: &Option<T>) -> Option<T> {
        match self {
            FieldUpdate::Keep => previous.clone(),
            FieldUpdate::Clear => None,
            FieldUpdate::Set(value) => Some(value.clone()),
        }
    }
}

/// A partial update over the fixed parameter key set. The canonical state is
/// the left-fold of all updates in arrival order, later fields overwriting
/// earlier ones per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamsUpdate {
    pub q: FieldUpdate<String>,
    pub sort: FieldUpdate<SortField>,
    pub order: FieldUpdate<SortOrder>,
    pub page: FieldUpdate<u32>,
    pub per_page: FieldUpdate<u32>,
}

impl ParamsUpdate {
    /// Settled text input. Empty text unsets `q`; producers never store the
    /// empty string.
    pub fn search(text: impl Into<String>) -> Self {
        let text = text.into();
        let q = if text.is_empty() {
            FieldUpdate::Clear
        } else {
            FieldUpdate::Set(text)
        };
        Self {
            q,
            ..Self::default()
        }
    }

    /// Sort selection; `None` clears both the field and the direction.
    pub fn sort_pair(selection: Option<(SortField, SortOrder)>) -> Self {
        match selection {
            Some((sort, order)) => Self {
                sort: FieldUpdate::Set(sort),
                order: FieldUpdate::Set(order),
                ..Self::default()
            },
            None => Self {
                sort: FieldUpdate::Clear,
                order: FieldUpdate::Clear,
                ..Self::default()
            },
        }
    }

    pub fn page(page: u32, per_page: u32) -> Self {
        Self {
            page: FieldUpdate::Set(page),
            per_page: FieldUpdate::Set(per_page),
            ..Self::default()
        }
    }

    /// Full-set update: every key is written, unset keys clear. Remote
    /// producers (URL reads) use this so both producer classes normalize to
    /// the same key set before the store's equality check; a round-tripped
    /// echo folds to the identical state and is deduplicated away.
    pub fn replace_all(params: &SearchParameters) -> Self {
        fn field<T: Clone>(value: &Option<T>) -> FieldUpdate<T> {
            match value {
                Some(value) => FieldUpdate::Set(value.clone()),
                None => FieldUpdate::Clear,
            }
        }

        Self {
            q: field(&params.q),
            sort: field(&params.sort),
            order: field(&params.order),
            page: field(&params.page),
            per_page: field(&params.per_page),
        }
    }

    /// Per-key last-write-wins merge onto the current canonical state.
    pub fn apply(&self, current: &SearchParameters) -> SearchParameters {
        SearchParameters {
            q: self.q.fold(&current.q),
            sort: self.sort.fold(&current.sort),
            order: self.order.fold(&current.order),
            page: self.page.fold(&current.page),
            per_page: self.per_page.fold(&current.per_page),
        }
    }
}

/// Producer handle into the canonical parameter state. Cheap to clone; every
/// producer (UI events, settled text, URL reads) goes through here, and
/// nothing writes the canonical state directly.
#[derive(Clone)]
pub struct ParamsHandle {
    updates: mpsc::UnboundedSender<ParamsUpdate>,
}

impl ParamsHandle {
    pub fn update(&self, update: ParamsUpdate) -> Result<(), StateError> {
        self.updates
            .send(update)
            .map_err(|_| StateError::ChannelClosed("params"))
    }
}

pub struct ParamStore;

impl ParamStore {
    /// Spawns the single-writer fold task and returns the producer handle,
    /// the ordered emission stream (exactly one item per distinct canonical
    /// state, in merge order) and a watch holding the latest canonical value.
    ///
    /// A burst of updates queued ahead of the task's wakeup folds into a
    /// single emission; an emission is suppressed entirely when the folded
    /// state equals the previous one.
    pub fn spawn(
        mut shutdown: watch::Receiver<bool>,
    ) -> (
        ParamsHandle,
        mpsc::UnboundedReceiver<SearchParameters>,
        watch::Receiver<SearchParameters>,
    ) {
        let (update_tx, mut update_rx) = mpsc::unbounded_channel::<ParamsUpdate>();
        let (emit_tx, emit_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SearchParameters::default());

        tokio::spawn(async move {
            let mut canonical = SearchParameters::default();
            loop {
                let first = tokio::select! {
                    update = update_rx.recv() => update,
                    _ = shutdown.changed() => None,
                };
                let Some(first) = first else { break };

                let mut merged = first.apply(&canonical);
                while let Ok(next) = update_rx.try_recv() {
                    merged = next.apply(&merged);
                }

                if merged == canonical {
                    continue;
                }
                canonical = merged;
                debug!(?canonical, "canonical parameters changed");
                state_tx.send_replace(canonical.clone());
                if emit_tx.send(canonical.clone()).is_err() {
                    break;
                }
            }
        });

        (ParamsHandle { updates: update_tx }, emit_rx, state_rx)
    }
}
