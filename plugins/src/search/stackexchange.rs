use std::time::Duration;

use async_trait::async_trait;
use fanline_core::api::{
    Pacing, ProviderError, SearchPage, SearchProvider, SearchResult, StackExchangeSearchConfig,
};
use reqwest::StatusCode;
use serde_json::Value;

use crate::http::{
    client_with_timeout, parse_retry_after, preview_body, request_error, usable_secret,
};

const SEARCH_TIMEOUT_MS: u64 = 30_000;
/// Includes question bodies in `items`.
const FILTER: &str = "!nNPvSNdWme";
/// `throttle_violation`
const THROTTLE_ERROR_ID: i64 = 502;

/// Question search against the Stack Exchange API. Responses carry errors and
/// throttling in the JSON body as well as the status line.
pub struct StackExchangeSearch {
    http: reqwest::Client,
    base_url: String,
    site: String,
    key: String,
    limit: usize,
    pacing: Pacing,
}

impl StackExchangeSearch {
    pub fn new(cfg: &StackExchangeSearchConfig, pacing: Pacing) -> anyhow::Result<Self> {
        Ok(Self {
            http: client_with_timeout(SEARCH_TIMEOUT_MS)?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            site: cfg.site.clone(),
            key: cfg.key.clone(),
            limit: cfg.results_per_query.max(1),
            pacing,
        })
    }
}

fn backoff_field(body: &Value) -> Option<Duration> {
    body.get("backoff")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
}

fn map_item(item: &Value) -> Option<SearchResult> {
    let source_url = item.get("link")?.as_str()?.to_string();
    let title = item
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or(&source_url)
        .to_string();
    let tags = item
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default();
    Some(SearchResult {
        source_url,
        title,
        category: "stackoverflow".to_string(),
        snippet: tags,
        metadata: item.clone(),
    })
}

#[async_trait]
impl SearchProvider for StackExchangeSearch {
    fn category(&self) -> &str {
        "stackoverflow"
    }

    fn pacing(&self) -> Pacing {
        self.pacing
    }

    fn result_limit(&self) -> usize {
        self.limit
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SearchPage, ProviderError> {
        let url = format!("{}/search/advanced", self.base_url);
        let page_size = limit.clamp(1, 100).to_string();
        let mut params = vec![
            ("q", query),
            ("site", self.site.as_str()),
            ("sort", "votes"),
            ("order", "desc"),
            ("filter", FILTER),
            ("pagesize", page_size.as_str()),
        ];
        if let Some(key) = usable_secret(&self.key) {
            params.push(("key", key));
        }

        let resp = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| request_error(e, &url))?;
        let status = resp.status();
        let header_hint = parse_retry_after(resp.headers());
        let final_url = resp.url().to_string();
        let text = resp.text().await.map_err(|e| request_error(e, &final_url))?;
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        let error_id = body.get("error_id").and_then(Value::as_i64);
        if status == StatusCode::TOO_MANY_REQUESTS || error_id == Some(THROTTLE_ERROR_ID) {
            let retry_after = backoff_field(&body).or(header_hint);
            tracing::debug!(
                target: "fanline.search",
                status = status.as_u16(),
                retry_after_ms = retry_after.map(|d| d.as_millis() as u64),
                "stackexchange throttled"
            );
            return Ok(SearchPage::RateLimited { retry_after });
        }
        if let Some(id) = error_id {
            let message = body
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error");
            return Err(ProviderError::Other(format!(
                "stackexchange error {id}: {message}"
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: final_url,
                body: preview_body(&text),
            });
        }
        if body.is_null() {
            return Err(ProviderError::Decode {
                url: final_url,
                message: format!("invalid JSON | body={}", preview_body(&text)),
            });
        }

        if let Some(wait) = backoff_field(&body) {
            tracing::info!(
                target: "fanline.search",
                backoff_secs = wait.as_secs(),
                "stackexchange asked for backoff on next call"
            );
        }

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(map_item).collect())
            .unwrap_or_default();
        Ok(SearchPage::Results(items))
    }
}
