use std::path::{Path, PathBuf};

use coordination::RetryPolicy;
use serde::Deserialize;

/// OpenAI-compatible inference endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Base URL up to and including the version segment, e.g. `.../v1`.
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Whole-request timeout for a single HTTP call.
    pub timeout_secs: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("ROUNDTABLE_API_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".into()),
            model: std::env::var("ROUNDTABLE_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into()),
            api_key: std::env::var("ROUNDTABLE_API_KEY")
                .or_else(|_| std::env::var("OPENAI_API_KEY"))
                .ok(),
            timeout_secs: 120,
        }
    }
}

/// Sampling settings for one kind of call.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct StageParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl StageParams {
    pub const fn new(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature,
            max_tokens,
        }
    }
}

/// Per-call-kind sampling settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub conversational: StageParams,
    pub technical: StageParams,
    pub debate: StageParams,
    pub synthesis: StageParams,
    pub shots: StageParams,
    pub breakdown: StageParams,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            conversational: StageParams::new(0.7, 400),
            technical: StageParams::new(0.4, 600),
            debate: StageParams::new(0.8, 350),
            synthesis: StageParams::new(0.5, 2000),
            shots: StageParams::new(0.6, 1500),
            breakdown: StageParams::new(0.3, 200),
        }
    }
}

/// Top-level roundtable configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundtableConfig {
    pub endpoint: EndpointConfig,
    pub retry: RetryPolicy,
    pub stages: StageSettings,
    /// Per-run event channel capacity; slow subscribers lag past this.
    pub event_capacity: usize,
}

impl Default for RoundtableConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            retry: RetryPolicy::default(),
            stages: StageSettings::default(),
            event_capacity: coordination::events::DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RoundtableConfig {
    /// Load from a TOML file; keys it leaves out keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }
}
