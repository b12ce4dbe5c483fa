use async_trait::async_trait;
use fanline_core::api::{AutomationProvider, AutomationRequest, EventByteStream, ProviderError};
use futures::StreamExt;

use crate::http::{ensure_success, request_error, streaming_client, usable_secret};

/// Browser-automation agent reached over an SSE endpoint. Auth is the
/// `X-API-Key` header.
pub struct TinyfishAutomation {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl TinyfishAutomation {
    pub fn new(url: String, api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            http: streaming_client()?,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl AutomationProvider for TinyfishAutomation {
    fn name(&self) -> &str {
        "tinyfish"
    }

    async fn start(&self, request: &AutomationRequest) -> Result<EventByteStream, ProviderError> {
        let Some(key) = usable_secret(&self.api_key) else {
            return Err(ProviderError::NotConfigured {
                provider: "automation",
                reason: "API key is not configured (set TINYFISH_API_KEY)".into(),
            });
        };

        tracing::debug!(
            target: "fanline.automation",
            url = %self.url,
            target_url = %request.target_url,
            goal_len = request.goal.len(),
            "starting automation"
        );
        let resp = self
            .http
            .post(&self.url)
            .header("X-API-Key", key)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(request)
            .send()
            .await
            .map_err(|e| request_error(e, &self.url))?;
        let resp = ensure_success(resp).await?;

        let stream = resp
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| ProviderError::Stream(e.to_string())));
        Ok(Box::pin(stream))
    }
}
