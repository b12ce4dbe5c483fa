use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::retry::RateLimitSignal;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub category: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }
}

/// One candidate from a search provider. `source_url` is the dedup key and is
/// compared exactly; `metadata` is the provider's raw item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub source_url: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub metadata: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// All queries at once.
    Parallel,
    /// One query at a time through the retrier, `delay` apart.
    Sequential { delay: Duration },
}

/// One query's response.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPage {
    Results(Vec<SearchResult>),
    RateLimited { retry_after: Option<Duration> },
}

impl RateLimitSignal for SearchPage {
    fn is_rate_limited(&self) -> bool {
        matches!(self, SearchPage::RateLimited { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            SearchPage::RateLimited { retry_after } => *retry_after,
            SearchPage::Results(_) => None,
        }
    }
}

/// A keyword search backend serving exactly one category.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    fn category(&self) -> &str;

    fn pacing(&self) -> Pacing;

    /// Per-query result limit sent to the backend.
    fn result_limit(&self) -> usize {
        10
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchPage, ProviderError>;
}
