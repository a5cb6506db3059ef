use serde::{Deserialize, Serialize};
use std::fmt;

/// Sort keys accepted by the repository search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortField {
    Stars,
    Forks,
    HelpWantedIssues,
    Updated,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Stars => "stars",
            SortField::Forks => "forks",
            SortField::HelpWantedIssues => "help-wanted-issues",
            SortField::Updated => "updated",
        }
    }

    /// Wire spelling to field; anything else is unset.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stars" => Some(SortField::Stars),
            "forks" => Some(SortField::Forks),
            "help-wanted-issues" => Some(SortField::HelpWantedIssues),
            "updated" => Some(SortField::Updated),
            _ => None,
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }

    /// Directional arrow used in sort chip labels.
    pub fn arrow(&self) -> char {
        match self {
            SortOrder::Asc => '↑',
            SortOrder::Desc => '↓',
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// The canonical search query. Every field is optional; `None` means unset,
/// which is distinct from an empty string. Equality is the derived field-wise
/// comparison over the fixed key set: updates arrive as partial merges, and
/// two states with identical effective content must compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<SortField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<SortOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl SearchParameters {
    /// True when the trimmed query is long enough to reach the network.
    /// Shorter or absent queries short-circuit to the empty response.
    pub fn has_searchable_query(&self) -> bool {
        self.q
            .as_deref()
            .map(str::trim)
            .is_some_and(|query| query.chars().count() > 2)
    }

    /// Key/value pairs in wire order; unset fields are omitted.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(q) = &self.q {
            pairs.push(("q", q.clone()));
        }
        if let Some(sort) = self.sort {
            pairs.push(("sort", sort.as_str().to_string()));
        }
        if let Some(order) = self.order {
            pairs.push(("order", order.as_str().to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Pass-through record from the search endpoint. The core never interprets
/// these fields; they exist for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub owner: Option<RepositoryOwner>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub score: f64,
}

/// One page of search results. Regenerated per request, replaced wholesale,
/// never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub total_count: u64,
    pub incomplete_results: bool,
    #[serde(default)]
    pub items: Vec<Repository>,
}

impl SearchResponse {
    /// The terminal empty result: what trivial queries and masked failures
    /// resolve to.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Sort selection event from the presentation layer. An unset direction
/// means "clear sort"; an unrecognized `active` field normalizes to the
/// same clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortEvent {
    pub active: String,
    pub direction: Option<SortOrder>,
}

/// Paginator event from the presentation layer. `page_index` is zero-based
/// and is translated to the one-based `page` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageEvent {
    pub page_index: u32,
    pub page_size: u32,
}
