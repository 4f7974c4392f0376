use std::time::Duration;

use reqwest::Client;

use super::ChatTransport;
use super::error::TransportError;
use super::types::{ChatRequest, ChatResponse};

pub const API_URL: &str = "https://api.z.ai/api/coding/paas/v4/chat/completions";

/// HTTP transport for the Z.ai chat-completions endpoint. One call per `post`,
/// no retries of its own.
pub struct ZaiClient {
    api_key: String,
    client: Client,
    base_url: String,
}

impl ZaiClient {
    /// Create a client for `base_url` whose requests give up after `timeout`.
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }
}

impl ChatTransport for ZaiClient {
    async fn post(&self, req: &ChatRequest) -> Result<ChatResponse, TransportError> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(req)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChatResponse>().await?;
        Ok(body)
    }
}
