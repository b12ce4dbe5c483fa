//! Shared reqwest plumbing for provider adapters.

use std::time::Duration;

use fanline_core::api::ProviderError;
use reqwest::header::HeaderMap;
use serde_json::Value;

const BODY_PREVIEW_LIMIT: usize = 512;

pub(crate) const USER_AGENT: &str = concat!("fanline/", env!("CARGO_PKG_VERSION"));

/// Client for request/response calls, bounded by `timeout_ms` end to end.
pub(crate) fn client_with_timeout(timeout_ms: u64) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_millis(timeout_ms))
        .build()?)
}

/// Client for long-lived streams: only connecting is bounded; the caller owns
/// the overall deadline.
pub(crate) fn streaming_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(30))
        .build()?)
}

fn error_kind(err: &reqwest::Error) -> &'static str {
    if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_request() {
        "request"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else {
        "unknown"
    }
}

pub(crate) fn request_error(err: reqwest::Error, url: &str) -> ProviderError {
    ProviderError::Request {
        kind: error_kind(&err),
        url: url.to_string(),
        message: err.to_string(),
    }
}

pub(crate) fn preview_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    let mut out: String = trimmed.chars().take(BODY_PREVIEW_LIMIT).collect();
    if trimmed.chars().count() > BODY_PREVIEW_LIMIT {
        out.push_str("...");
    }
    out
}

/// `Retry-After` in seconds. HTTP-date values are not supported.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Non-2xx becomes `ProviderError::Status` with a body preview.
pub(crate) async fn ensure_success(
    resp: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let body = resp.text().await.unwrap_or_default();
    Err(ProviderError::Status {
        status: status.as_u16(),
        url,
        body: preview_body(&body),
    })
}

pub(crate) async fn read_json(resp: reqwest::Response) -> Result<Value, ProviderError> {
    let resp = ensure_success(resp).await?;
    let url = resp.url().to_string();
    let body = resp.text().await.map_err(|e| request_error(e, &url))?;
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str::<Value>(&body).map_err(|e| ProviderError::Decode {
        url,
        message: format!("{e} | body={}", preview_body(&body)),
    })
}

/// Treats empty strings and obvious placeholders as "not set".
pub(crate) fn usable_secret(value: &str) -> Option<&str> {
    let v = value.trim();
    if v.is_empty() || v.contains("placeholder") {
        None
    } else {
        Some(v)
    }
}
