pub mod chips;
pub mod debounce;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod navigation;
pub mod orchestrator;
pub mod params;
pub mod stores;
pub mod traits;

pub use chips::{derive_chips, removal_update, Chip, RESET_PER_PAGE};
pub use debounce::{spawn_debounce, DEBOUNCE_WINDOW};
pub use error::{SearchError, StateError};
pub use fetcher::{FetcherConfig, ResultFetcher, DISPATCH_DELAY};
pub use models::{
    PageEvent, Repository, RepositoryOwner, SearchParameters, SearchResponse, SortEvent,
    SortField, SortOrder,
};
pub use navigation::{params_from_url, spawn_url_sync, write_params, AddressBar};
pub use orchestrator::{OrchestratorConfig, SearchOrchestrator};
pub use params::{FieldUpdate, ParamStore, ParamsHandle, ParamsUpdate};
pub use stores::GithubStore;
pub use traits::RepositorySearch;
