use anyhow::{bail, Context, Result};
use oracle_engine::{DebateConfig, Lexicon, SimulationConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Wire protocol spoken by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Google `generateContent` REST API
    Gemini,
    /// OpenAI-compatible `/chat/completions` (DeepSeek, vLLM, llama.cpp, ...)
    ChatCompletions,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gemini => write!(f, "gemini"),
            Self::ChatCompletions => write!(f, "chat_completions"),
        }
    }
}

/// Language-model endpoint configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub provider: Provider,
    /// Speaker label recorded in the transcript.
    pub name: String,
    /// Base URL; the provider appends its own path.
    pub url: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub timeout_secs: u64,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Endpoint {
    /// API key, or an error naming the endpoint when none is configured.
    pub fn require_api_key(&self) -> Result<&str> {
        if self.api_key.trim().is_empty() {
            bail!(
                "no API key configured for {} endpoint ({} at {})",
                self.name,
                self.model,
                self.url
            );
        }
        Ok(&self.api_key)
    }
}

/// Partial endpoint from a config file; present fields replace the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointOverride {
    pub provider: Option<Provider>,
    pub name: Option<String>,
    pub url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl EndpointOverride {
    fn apply(self, base: &mut Endpoint) {
        if let Some(provider) = self.provider {
            base.provider = provider;
        }
        if let Some(name) = self.name {
            base.name = name;
        }
        if let Some(url) = self.url {
            base.url = url;
        }
        if let Some(model) = self.model {
            base.model = model;
        }
        if let Some(api_key) = self.api_key {
            base.api_key = api_key;
        }
        if let Some(timeout_secs) = self.timeout_secs {
            base.timeout_secs = timeout_secs;
        }
        if let Some(temperature) = self.temperature {
            base.temperature = temperature;
        }
        if let Some(max_output_tokens) = self.max_output_tokens {
            base.max_output_tokens = max_output_tokens;
        }
    }
}

/// On-disk TOML layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    optimist: EndpointOverride,
    #[serde(default)]
    skeptic: EndpointOverride,
    #[serde(default)]
    grounding: EndpointOverride,
    simulation: Option<SimulationConfig>,
    debate: Option<DebateConfig>,
    lexicon: Option<Lexicon>,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-exp";

/// Top-level oracle configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Optimist analyst (Gemini by default)
    pub optimist: Endpoint,
    /// Skeptic analyst (DeepSeek by default)
    pub skeptic: Endpoint,
    /// Statement consistency checker for optimist turns
    pub grounding: Endpoint,
    pub simulation: SimulationConfig,
    pub debate: DebateConfig,
    /// Phrase lists for convergence and verdict synthesis
    pub lexicon: Lexicon,
}

impl Default for OracleConfig {
    fn default() -> Self {
        let gemini_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        Self {
            optimist: Endpoint {
                provider: Provider::Gemini,
                name: "Gemini".into(),
                url: std::env::var("ORACLE_OPTIMIST_URL")
                    .unwrap_or_else(|_| GEMINI_BASE_URL.into()),
                model: std::env::var("ORACLE_OPTIMIST_MODEL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
                api_key: gemini_key.clone(),
                timeout_secs: 120,
                temperature: 0.7,
                max_output_tokens: 2048,
            },
            skeptic: Endpoint {
                provider: Provider::ChatCompletions,
                name: "DeepSeek".into(),
                url: std::env::var("ORACLE_SKEPTIC_URL")
                    .unwrap_or_else(|_| "https://api.deepseek.com/v1".into()),
                model: std::env::var("ORACLE_SKEPTIC_MODEL")
                    .unwrap_or_else(|_| "deepseek-chat".into()),
                api_key: std::env::var("DEEPSEEK_API_KEY").unwrap_or_default(),
                timeout_secs: 120,
                temperature: 0.7,
                max_output_tokens: 2048,
            },
            grounding: Endpoint {
                provider: Provider::Gemini,
                name: "RealismValidator".into(),
                url: std::env::var("ORACLE_GROUNDING_URL")
                    .unwrap_or_else(|_| GEMINI_BASE_URL.into()),
                model: std::env::var("ORACLE_GROUNDING_MODEL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.into()),
                api_key: gemini_key,
                timeout_secs: 60,
                temperature: 0.1,
                max_output_tokens: 1024,
            },
            simulation: SimulationConfig::default(),
            debate: DebateConfig::default(),
            lexicon: Lexicon::default(),
        }
    }
}

impl OracleConfig {
    /// Load a TOML file over the environment defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse TOML content over the environment defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse oracle TOML")?;
        let mut config = Self::default();
        file.optimist.apply(&mut config.optimist);
        file.skeptic.apply(&mut config.skeptic);
        file.grounding.apply(&mut config.grounding);
        if let Some(simulation) = file.simulation {
            config.simulation = simulation;
        }
        if let Some(debate) = file.debate {
            config.debate = debate;
        }
        if let Some(lexicon) = file.lexicon {
            config.lexicon = lexicon.normalized();
        }
        config.validate()?;
        Ok(config)
    }

    /// Defaults, or the file at `path` when one is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject tunables the engine would refuse at run time.
    pub fn validate(&self) -> Result<()> {
        self.simulation
            .validate()
            .context("Invalid [simulation] section")?;
        self.debate.validate().context("Invalid [debate] section")?;
        for endpoint in [&self.optimist, &self.skeptic, &self.grounding] {
            if endpoint.timeout_secs == 0 {
                bail!("{} endpoint timeout_secs must be at least 1", endpoint.name);
            }
        }
        Ok(())
    }
}
