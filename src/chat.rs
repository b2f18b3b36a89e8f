//! Streaming completion client.
//!
//! Thin wrapper over an Anthropic-style `/v1/messages` endpoint. The core
//! only supplies the system prompt (via the context composer) and relays
//! the provider's SSE byte stream untouched; streaming-protocol details and
//! retries belong to the provider, not to this crate.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::CompletionConfig;

/// A single conversation turn as received from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

pub struct CompletionClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl CompletionClient {
    /// Requires the `ANTHROPIC_API_KEY` environment variable.
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .map_err(|_| anyhow::anyhow!("ANTHROPIC_API_KEY environment variable not set"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Start a streaming completion. Returns the raw response whose body is
    /// the provider's SSE stream; the caller forwards it byte-for-byte.
    pub async fn stream(
        &self,
        system_prompt: &str,
        messages: &[ChatMessage],
    ) -> Result<reqwest::Response> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system_prompt,
            "messages": messages,
            "stream": true,
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("completion API error {}: {}", status, body_text);
        }

        Ok(response)
    }
}
