use anyhow::Result;
use async_trait::async_trait;
use oracle_engine::{CapabilityError, PromptContext, ReasoningAgent};
use tracing::debug;

use super::{check_status, http_client, non_empty, send_error, LanguageModel};
use crate::config::Endpoint;
use crate::prompts;

/// Google `generateContent` client; the default optimist.
pub struct GeminiAgent {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl GeminiAgent {
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        endpoint.require_api_key()?;
        Ok(Self {
            endpoint: endpoint.clone(),
            client: http_client(endpoint)?,
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.endpoint.url.trim_end_matches('/'),
            self.endpoint.model,
            self.endpoint.api_key
        )
    }
}

#[async_trait]
impl LanguageModel for GeminiAgent {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        let start = std::time::Instant::now();

        let request_body = serde_json::json!({
            "contents": [{
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "temperature": self.endpoint.temperature,
                "maxOutputTokens": self.endpoint.max_output_tokens
            }
        });

        let response = self
            .client
            .post(self.url())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| send_error(e, self.endpoint.timeout_secs))?;
        let response = check_status(response, "Gemini").await?;

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;

        let text = non_empty(
            resp_json["candidates"][0]["content"]["parts"][0]["text"].as_str(),
            "Gemini",
        )?;
        debug!(
            model = %self.endpoint.model,
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Gemini completion"
        );
        Ok(text)
    }
}

#[async_trait]
impl ReasoningAgent for GeminiAgent {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    async fn respond(&self, ctx: &PromptContext) -> Result<String, CapabilityError> {
        self.complete(&prompts::render(ctx)).await
    }
}
