use crate::error::SearchError;
use crate::models::{SearchParameters, SearchResponse};
use crate::traits::RepositorySearch;
use async_trait::async_trait;
use reqwest::header;
use reqwest::Client;
use std::sync::Arc;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com";

// GitHub rejects requests without a User-Agent.
const USER_AGENT: &str = concat!("repo-search/", env!("CARGO_PKG_VERSION"));

pub struct GithubStore {
    client: Arc<Client>,
    endpoint: String,
}

impl GithubStore {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Arc::new(Client::new()),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for GithubStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

/// Builds the search URL with exactly the recognized parameters; unset
/// fields are omitted entirely.
pub fn build_search_url(endpoint: &str, params: &SearchParameters) -> Result<Url, SearchError> {
    let mut url = Url::parse(&format!(
        "{}/search/repositories",
        endpoint.trim_end_matches('/')
    ))?;

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params.to_query_pairs() {
            pairs.append_pair(key, &value);
        }
    }

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

#[async_trait]
impl RepositorySearch for GithubStore {
    async fn search_repositories(
        &self,
        params: &SearchParameters,
    ) -> Result<SearchResponse, SearchError> {
        let url = build_search_url(&self.endpoint, params)?;

        let response = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "github".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json::<SearchResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortField, SortOrder};

    #[test]
    fn search_url_carries_only_set_fields() {
        let params = SearchParameters {
            q: Some("topic:angular".to_string()),
            sort: Some(SortField::Stars),
            order: Some(SortOrder::Desc),
            page: Some(1),
            per_page: Some(5),
        };

        let url = build_search_url(DEFAULT_ENDPOINT, &params).expect("url builds");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/search/repositories?q=topic%3Aangular&sort=stars&order=desc&page=1&per_page=5"
        );
    }

    #[test]
    fn search_url_with_no_parameters_has_no_query() {
        let url =
            build_search_url(DEFAULT_ENDPOINT, &SearchParameters::default()).expect("url builds");
        assert_eq!(url.as_str(), "https://api.github.com/search/repositories");
    }

    #[test]
    fn endpoint_trailing_slash_is_tolerated() {
        let url = build_search_url("http://localhost:8080/", &SearchParameters::default())
            .expect("url builds");
        assert_eq!(url.as_str(), "http://localhost:8080/search/repositories");
    }
}
