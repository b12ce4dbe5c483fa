use std::time::Duration;

use async_trait::async_trait;
use fanline_core::api::{
    GithubSearchConfig, Pacing, ProviderError, SearchPage, SearchProvider, SearchResult,
};
use reqwest::StatusCode;
use serde_json::Value;

use crate::http::{client_with_timeout, parse_retry_after, read_json, request_error, usable_secret};

const SEARCH_TIMEOUT_MS: u64 = 30_000;

/// Repository search against the GitHub REST API.
pub struct GithubSearch {
    http: reqwest::Client,
    base_url: String,
    token: String,
    limit: usize,
    pacing: Pacing,
}

impl GithubSearch {
    pub fn new(cfg: &GithubSearchConfig, pacing: Pacing) -> anyhow::Result<Self> {
        Ok(Self {
            http: client_with_timeout(SEARCH_TIMEOUT_MS)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            token: cfg.token.clone(),
            limit: cfg.results_per_query.max(1),
            pacing,
        })
    }
}

fn is_rate_limited(status: StatusCode, headers: &reqwest::header::HeaderMap) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    status == StatusCode::FORBIDDEN
        && headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0")
}

fn map_item(item: &Value) -> Option<SearchResult> {
    let source_url = item.get("html_url")?.as_str()?.to_string();
    let title = item
        .get("full_name")
        .and_then(Value::as_str)
        .unwrap_or(&source_url)
        .to_string();
    Some(SearchResult {
        source_url,
        title,
        category: "github".to_string(),
        snippet: item
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        metadata: item.clone(),
    })
}

#[async_trait]
impl SearchProvider for GithubSearch {
    fn category(&self) -> &str {
        "github"
    }

    fn pacing(&self) -> Pacing {
        self.pacing
    }

    fn result_limit(&self) -> usize {
        self.limit
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchPage, ProviderError> {
        let url = format!("{}/search/repositories", self.base_url);
        let per_page = limit.clamp(1, 100).to_string();
        let mut req = self
            .http
            .get(&url)
            .query(&[("q", query), ("sort", "stars"), ("per_page", per_page.as_str())])
            .header(reqwest::header::ACCEPT, "application/vnd.github.v3+json");
        if let Some(token) = usable_secret(&self.token) {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| request_error(e, &url))?;
        if is_rate_limited(resp.status(), resp.headers()) {
            let retry_after = parse_retry_after(resp.headers());
            tracing::debug!(
                target: "fanline.search",
                status = resp.status().as_u16(),
                retry_after_ms = retry_after.map(|d: Duration| d.as_millis() as u64),
                "github rate limited"
            );
            return Ok(SearchPage::RateLimited { retry_after });
        }

        let body = read_json(resp).await?;
        let items = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(map_item).collect())
            .unwrap_or_default();
        Ok(SearchPage::Results(items))
    }
}
