use crate::error::SearchError;
use crate::models::{SearchParameters, SortField, SortOrder};
use crate::params::{ParamsHandle, ParamsUpdate};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use url::Url;

/// Query keys the synchronizer owns. Everything else in the query string
/// belongs to the host and is preserved untouched on write.
const RECOGNIZED_KEYS: [&str; 5] = ["q", "sort", "order", "page", "per_page"];

/// In-process stand-in for the host navigation layer: the current location
/// plus change notification, as an address bar would provide. External code
/// calls [`AddressBar::navigate`] (paste, back/forward); the orchestrator
/// writes canonical parameters back through [`AddressBar::apply`].
#[derive(Clone)]
pub struct AddressBar {
    location: Arc<watch::Sender<Url>>,
}

impl AddressBar {
    pub fn new(initial: Url) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            location: Arc::new(sender),
        }
    }

    pub fn parse(initial: &str) -> Result<Self, SearchError> {
        Ok(Self::new(Url::parse(initial)?))
    }

    pub fn location(&self) -> Url {
        self.location.borrow().clone()
    }

    /// External navigation. Notifies subscribers, which feeds the remote
    /// producer path. The location updates even with no subscriber attached.
    pub fn navigate(&self, location: Url) {
        self.location.send_replace(location);
    }

    pub fn subscribe(&self) -> watch::Receiver<Url> {
        self.location.subscribe()
    }

    /// Writes the canonical parameters into the query string, preserving
    /// every key outside the recognized set.
    pub fn apply(&self, params: &SearchParameters) {
        self.location
            .send_modify(|location| write_params(location, params));
    }
}

/// Reads the recognized keys out of a location. Unknown keys are ignored;
/// unparseable or out-of-range values normalize to unset rather than error.
pub fn params_from_url(location: &Url) -> SearchParameters {
    let mut params = SearchParameters::default();
    for (key, value) in location.query_pairs() {
        match key.as_ref() {
            "q" => params.q = Some(value.into_owned()).filter(|q| !q.is_empty()),
            "sort" => params.sort = SortField::parse(&value),
            "order" => params.order = SortOrder::parse(&value),
            "page" => params.page = parse_positive(&value),
            "per_page" => params.per_page = parse_positive(&value),
            _ => {}
        }
    }
    params
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.parse::<u32>().ok().filter(|value| *value >= 1)
}

/// Rewrites the recognized portion of the query string in place. Foreign
/// pairs keep their relative order, ahead of the recognized keys.
pub fn write_params(location: &mut Url, params: &SearchParameters) {
    let preserved: Vec<(String, String)> = location
        .query_pairs()
        .filter(|(key, _)| !RECOGNIZED_KEYS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    {
        let mut pairs = location.query_pairs_mut();
        pairs.clear();
        for (key, value) in &preserved {
            pairs.append_pair(key, value);
        }
        for (key, value) in params.to_query_pairs() {
            pairs.append_pair(key, &value);
        }
    }

    if location.query() == Some("") {
        location.set_query(None);
    }
}

/// Seeds the canonical state from the current location, then feeds every
/// subsequent navigation through the same merge pipeline as local updates.
/// Cycle prevention is structural, without origin tagging: a write-back echo
/// parses to the state the store already holds and is deduplicated there.
pub fn spawn_url_sync(
    address: AddressBar,
    params: ParamsHandle,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let mut locations = address.subscribe();
    // Seed synchronously so the initial remote state is merged ahead of any
    // producer update issued right after construction.
    let seed = params_from_url(&locations.borrow_and_update().clone());
    let seeded = params.update(ParamsUpdate::replace_all(&seed));

    tokio::spawn(async move {
        if seeded.is_err() {
            return;
        }

        loop {
            tokio::select! {
                changed = locations.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let location = locations.borrow_and_update().clone();
                    let remote = params_from_url(&location);
                    debug!(%location, "navigation change");
                    if params.update(ParamsUpdate::replace_all(&remote)).is_err() {
                        break;
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).expect("test url should parse")
    }

    #[test]
    fn reads_recognized_keys_and_ignores_the_rest() {
        let params = params_from_url(&url(
            "https://example.com/search?q=topic%3Arust&sort=stars&order=desc&page=2&per_page=5&utm_source=mail",
        ));
        assert_eq!(
            params,
            SearchParameters {
                q: Some("topic:rust".to_string()),
                sort: Some(SortField::Stars),
                order: Some(SortOrder::Desc),
                page: Some(2),
                per_page: Some(5),
            }
        );
    }

    #[test]
    fn malformed_values_normalize_to_unset() {
        let params = params_from_url(&url(
            "https://example.com/search?q=&sort=velocity&order=sideways&page=zero&per_page=0",
        ));
        assert_eq!(params, SearchParameters::default());
    }

    #[test]
    fn write_preserves_foreign_keys() {
        let mut location = url("https://example.com/search?theme=dark&q=old&page=9");
        let params = SearchParameters {
            q: Some("topic:rust".to_string()),
            per_page: Some(5),
            ..SearchParameters::default()
        };

        write_params(&mut location, &params);

        let query = location.query().expect("query present");
        assert!(query.contains("theme=dark"));
        assert!(query.contains("per_page=5"));
        assert!(!query.contains("page=9"), "unset keys are removed");

        let round_trip = params_from_url(&location);
        assert_eq!(round_trip, params);
    }

    #[test]
    fn write_of_all_unset_drops_the_query_string() {
        let mut location = url("https://example.com/search?q=old&page=2");
        write_params(&mut location, &SearchParameters::default());
        assert_eq!(location.query(), None);
    }

    #[tokio::test]
    async fn seeds_and_follows_navigation() {
        use crate::params::ParamStore;

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, mut emissions, _state) = ParamStore::spawn(shutdown_rx.clone());
        let address = AddressBar::new(url("https://example.com/search?q=topic%3Arust&page=2&per_page=5"));
        spawn_url_sync(address.clone(), handle, shutdown_rx);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let seeded = emissions.try_recv().expect("seed emission");
        assert_eq!(seeded.q.as_deref(), Some("topic:rust"));
        assert_eq!(seeded.page, Some(2));

        address.navigate(url("https://example.com/search?q=topic%3Atokio"));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let followed = emissions.try_recv().expect("navigation emission");
        assert_eq!(followed.q.as_deref(), Some("topic:tokio"));
        assert_eq!(followed.page, None, "full-set remote update clears the rest");
    }
}
