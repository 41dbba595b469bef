//! HTTP-backed capabilities for the debate.
//!
//! Each endpoint is a [`LanguageModel`]; the persona agents wrap one with the
//! debate prompt templates and the grounding checker wraps one with the
//! realism-check template.

pub mod chat;
pub mod gemini;
pub mod grounding;

use anyhow::Result;
use async_trait::async_trait;
use oracle_engine::{CapabilityError, ReasoningAgent, StatementConsistency};
use reqwest::header::RETRY_AFTER;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Endpoint, OracleConfig, Provider};

pub use chat::ChatCompletionsAgent;
pub use gemini::GeminiAgent;
pub use grounding::{parse_grounding_reply, LlmGroundingChecker};

/// A single-prompt text completion endpoint.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Speaker label for transcripts and logs
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn complete(&self, prompt: &str) -> Result<String, CapabilityError>;
}

/// The three capabilities a debate needs, built from configuration.
pub struct AgentSet {
    pub optimist: Arc<dyn ReasoningAgent>,
    pub skeptic: Arc<dyn ReasoningAgent>,
    pub checker: Arc<dyn StatementConsistency>,
}

impl AgentSet {
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        Ok(Self {
            optimist: build_agent(&config.optimist)?,
            skeptic: build_agent(&config.skeptic)?,
            checker: Arc::new(LlmGroundingChecker::new(build_model(&config.grounding)?)),
        })
    }
}

/// Debate participant for an endpoint.
pub fn build_agent(endpoint: &Endpoint) -> Result<Arc<dyn ReasoningAgent>> {
    Ok(match endpoint.provider {
        Provider::Gemini => Arc::new(GeminiAgent::new(endpoint)?),
        Provider::ChatCompletions => Arc::new(ChatCompletionsAgent::new(endpoint)?),
    })
}

/// Raw completion client for an endpoint.
pub fn build_model(endpoint: &Endpoint) -> Result<Arc<dyn LanguageModel>> {
    Ok(match endpoint.provider {
        Provider::Gemini => Arc::new(GeminiAgent::new(endpoint)?),
        Provider::ChatCompletions => Arc::new(ChatCompletionsAgent::new(endpoint)?),
    })
}

pub(crate) fn http_client(endpoint: &Endpoint) -> Result<reqwest::Client> {
    use anyhow::Context;
    reqwest::Client::builder()
        .timeout(Duration::from_secs(endpoint.timeout_secs))
        .build()
        .context("Failed to create HTTP client")
}

/// Map a transport error, surfacing client-side timeouts distinctly.
pub(crate) fn send_error(err: reqwest::Error, timeout_secs: u64) -> CapabilityError {
    if err.is_timeout() {
        CapabilityError::Timeout(timeout_secs)
    } else {
        CapabilityError::RequestFailed(err.to_string())
    }
}

/// Pass through a success response; map anything else to a capability error.
pub(crate) async fn check_status(
    response: reqwest::Response,
    provider: &str,
) -> Result<reqwest::Response, CapabilityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(0);
        return Err(CapabilityError::RateLimited(retry_after));
    }
    let body = response.text().await.unwrap_or_default();
    let message = format!("{} API error ({}): {}", provider, status, body);
    if status == StatusCode::SERVICE_UNAVAILABLE {
        Err(CapabilityError::Unavailable(message))
    } else {
        Err(CapabilityError::RequestFailed(message))
    }
}

/// Reject empty completions; the debate has nothing to record for them.
pub(crate) fn non_empty(text: Option<&str>, provider: &str) -> Result<String, CapabilityError> {
    match text.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t.to_string()),
        _ => Err(CapabilityError::ParseError(format!(
            "{} response contained no text",
            provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  hi \n"), "Gemini").unwrap(), "hi");
        assert!(matches!(
            non_empty(Some("   "), "Gemini"),
            Err(CapabilityError::ParseError(_))
        ));
        let err = non_empty(None, "DeepSeek").unwrap_err();
        assert_eq!(
            err.to_string(),
            "response parse error: DeepSeek response contained no text"
        );
    }

    #[test]
    fn test_agent_set_builds_from_config() {
        let mut config = OracleConfig::default();
        for endpoint in [
            &mut config.optimist,
            &mut config.skeptic,
            &mut config.grounding,
        ] {
            endpoint.api_key = "test-key".into();
        }
        let set = AgentSet::from_config(&config).unwrap();
        assert_eq!(set.optimist.name(), "Gemini");
        assert_eq!(set.skeptic.name(), "DeepSeek");
    }

    #[test]
    fn test_agent_set_requires_keys() {
        let mut config = OracleConfig::default();
        config.skeptic.api_key = String::new();
        config.optimist.api_key = "k".into();
        config.grounding.api_key = "k".into();
        let err = AgentSet::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("DeepSeek"));
    }
}
