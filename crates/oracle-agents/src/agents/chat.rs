use anyhow::Result;
use async_trait::async_trait;
use oracle_engine::{CapabilityError, PromptContext, ReasoningAgent};
use tracing::debug;

use super::{check_status, http_client, non_empty, send_error, LanguageModel};
use crate::config::Endpoint;
use crate::prompts;

/// OpenAI-compatible chat completions client; the default skeptic (DeepSeek).
pub struct ChatCompletionsAgent {
    endpoint: Endpoint,
    client: reqwest::Client,
}

impl ChatCompletionsAgent {
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        endpoint.require_api_key()?;
        Ok(Self {
            endpoint: endpoint.clone(),
            client: http_client(endpoint)?,
        })
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsAgent {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    fn model(&self) -> &str {
        &self.endpoint.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError> {
        let start = std::time::Instant::now();

        let request_body = serde_json::json!({
            "model": self.endpoint.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "max_tokens": self.endpoint.max_output_tokens,
            "temperature": self.endpoint.temperature
        });

        let url = format!(
            "{}/chat/completions",
            self.endpoint.url.trim_end_matches('/')
        );
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.endpoint.api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| send_error(e, self.endpoint.timeout_secs))?;
        let response = check_status(response, &self.endpoint.name).await?;

        let resp_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CapabilityError::ParseError(e.to_string()))?;

        let text = non_empty(
            resp_json["choices"][0]["message"]["content"].as_str(),
            &self.endpoint.name,
        )?;
        debug!(
            model = %self.endpoint.model,
            chars = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "chat completion"
        );
        Ok(text)
    }
}

#[async_trait]
impl ReasoningAgent for ChatCompletionsAgent {
    fn name(&self) -> &str {
        &self.endpoint.name
    }

    async fn respond(&self, ctx: &PromptContext) -> Result<String, CapabilityError> {
        self.complete(&prompts::render(ctx)).await
    }
}
