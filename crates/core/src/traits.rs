use crate::error::SearchError;
use crate::models::{SearchParameters, SearchResponse};
use async_trait::async_trait;

/// Seam to the repository-search endpoint. The fetcher is generic over this
/// so tests can substitute a fake backend.
#[async_trait]
pub trait RepositorySearch {
    async fn search_repositories(
        &self,
        params: &SearchParameters,
    ) -> Result<SearchResponse, SearchError>;
}
