//! Market-data gateway
//!
//! Thin HTTP wrapper around the Indian Stock Market API. Issues GET
//! requests with the provider API key and returns parsed JSON. No retry,
//! no cache, no response-schema validation beyond "is it JSON".
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::error::AssistantError;
use crate::registry::ProviderRequest;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

pub struct MarketDataGateway {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MarketDataGateway {
    pub fn new(base_url: &str, api_key: String) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Fetch a resolved provider request.
    ///
    /// Any transport failure or non-JSON body comes back as a `Gateway`
    /// error; callers treat it as a normal outcome and proceed without
    /// data context. Non-2xx responses with a JSON body pass through
    /// unchanged since the provider reports errors in-band.
    pub async fn fetch(&self, request: &ProviderRequest) -> crate::Result<Value> {
        let url = format!("{}{}", self.base_url, request.endpoint);

        info!(endpoint = %request.endpoint, "Fetching market data");
        debug!(params = ?request.params, "Provider query parameters");

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| {
                AssistantError::Gateway(format!(
                    "Market data request failed for {}: {}",
                    request.endpoint, e
                ))
            })?;

        response.json::<Value>().await.map_err(|e| {
            AssistantError::Gateway(format!(
                "Invalid JSON from {}: {}",
                request.endpoint, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let gateway = MarketDataGateway::new("https://example.test/", "key".to_string()).unwrap();
        assert_eq!(gateway.base_url, "https://example.test");
    }
}
