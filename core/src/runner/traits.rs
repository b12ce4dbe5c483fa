use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Serialize;

use crate::error::ProviderError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutomationRequest {
    #[serde(rename = "url")]
    pub target_url: String,
    pub goal: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub browser_profile: Option<String>,
}

/// Raw response body of one automation call. Dropping it aborts the call.
pub type EventByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ProviderError>> + Send>>;

#[async_trait]
pub trait AutomationProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Submit the request; resolves once the provider accepted it and the
    /// event stream is open.
    async fn start(&self, request: &AutomationRequest) -> Result<EventByteStream, ProviderError>;
}
