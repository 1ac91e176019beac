use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::time::Duration;

use crate::breakdown::merger::CharacterMergePolicy;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Oracle (LLM provider) config
    #[serde(default)]
    pub oracle: OracleConfig,

    /// Chunking, concurrency and normalization settings
    #[serde(default)]
    pub breakdown: BreakdownConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Oracle provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OracleProvider {
    // @provider: Ollama
    #[default]
    Ollama,
    // @provider: OpenAI
    OpenAI,
    // @provider: Anthropic
    Anthropic,
    // @provider: LM Studio (OpenAI-compatible local server)
    LMStudio,
}

impl OracleProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::Ollama => "Ollama",
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::LMStudio => "LM Studio",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::Ollama => "ollama".to_string(),
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::LMStudio => "lmstudio".to_string(),
        }
    }

    /// Whether the provider refuses requests without an API key
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Self::OpenAI | Self::Anthropic)
    }
}

impl std::fmt::Display for OracleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for OracleProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "lmstudio" => Ok(Self::LMStudio),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: OracleProvider) -> Self {
        let (model, endpoint, timeout_secs) = match provider_type {
            OracleProvider::Ollama => (default_ollama_model(), default_ollama_endpoint(), default_timeout_secs()),
            OracleProvider::OpenAI => (default_openai_model(), default_openai_endpoint(), default_timeout_secs()),
            OracleProvider::Anthropic => (default_anthropic_model(), default_anthropic_endpoint(), default_anthropic_timeout_secs()),
            OracleProvider::LMStudio => (default_lmstudio_model(), default_lmstudio_endpoint(), default_timeout_secs()),
        };

        Self {
            provider_type: provider_type.to_lowercase_string(),
            model,
            api_key: String::new(),
            endpoint,
            timeout_secs,
        }
    }
}

/// Oracle service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleConfig {
    /// Provider to use
    #[serde(default)]
    pub provider: OracleProvider,

    /// Available providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Settings shared by all providers
    #[serde(default)]
    pub common: OracleCommonConfig,
}

/// Common oracle settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OracleCommonConfig {
    /// Retry count for failed or malformed calls
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Base retry delay in milliseconds, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Temperature parameter for text generation (0.0 to 1.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens the oracle may generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for OracleCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Breakdown pipeline configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BreakdownConfig {
    /// Maximum chunk size in characters, overlap included
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,

    /// Characters repeated from the previous chunk at each seam
    #[serde(default)]
    pub overlap_chars: usize,

    /// Size of the prefix sample sent to the roster scan
    #[serde(default = "default_roster_sample_chars")]
    pub roster_sample_chars: usize,

    /// Whether to run the roster scan before chunk extraction
    #[serde(default = "default_true")]
    pub enable_roster_scan: bool,

    /// Max concurrent oracle calls per batch
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Overall deadline for the extraction phase, `None` for no deadline
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: Option<u64>,

    /// Content summaries longer than this are truncated
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// How duplicate scene variants combine their character lists
    #[serde(default)]
    pub character_merge: CharacterMergePolicy,
}

impl BreakdownConfig {
    /// Overall deadline as a duration
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: default_max_chunk_chars(),
            overlap_chars: 0,
            roster_sample_chars: default_roster_sample_chars(),
            enable_roster_scan: true,
            concurrent_requests: default_concurrent_requests(),
            deadline_secs: default_deadline_secs(),
            summary_max_chars: default_summary_max_chars(),
            character_merge: CharacterMergePolicy::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

fn default_concurrent_requests() -> usize {
    3
}

fn default_max_chunk_chars() -> usize {
    6000
}

fn default_roster_sample_chars() -> usize {
    8000
}

fn default_deadline_secs() -> Option<u64> {
    Some(600)
}

fn default_summary_max_chars() -> usize {
    60
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_anthropic_timeout_secs() -> u64 {
    180
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base, multiplied by the attempt number
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_endpoint() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_lmstudio_endpoint() -> String {
    // LM Studio default server (OpenAI compatible) runs on port 1234 under /v1
    "http://localhost:1234/v1".to_string()
}

fn default_ollama_model() -> String {
    "llama3".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_lmstudio_model() -> String {
    // Placeholder; users should set to the loaded model name in LM Studio
    "local-model".to_string()
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.oracle.provider.requires_api_key() && self.oracle.get_api_key().is_empty() {
            return Err(anyhow!(
                "API key is required for {} provider",
                self.oracle.provider.display_name()
            ));
        }

        let breakdown = &self.breakdown;
        if breakdown.max_chunk_chars == 0 {
            return Err(anyhow!("max_chunk_chars must be greater than 0"));
        }
        if breakdown.overlap_chars >= breakdown.max_chunk_chars {
            return Err(anyhow!(
                "overlap_chars ({}) must be smaller than max_chunk_chars ({})",
                breakdown.overlap_chars,
                breakdown.max_chunk_chars
            ));
        }
        if breakdown.concurrent_requests == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }
        if breakdown.enable_roster_scan && breakdown.roster_sample_chars == 0 {
            return Err(anyhow!("roster_sample_chars must be greater than 0 when the roster scan is enabled"));
        }
        if breakdown.summary_max_chars == 0 {
            return Err(anyhow!("summary_max_chars must be greater than 0"));
        }

        Ok(())
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            oracle: OracleConfig::default(),
            breakdown: BreakdownConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl OracleConfig {
    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &OracleProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter()
            .find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            OracleProvider::Ollama => default_ollama_model(),
            OracleProvider::OpenAI => default_openai_model(),
            OracleProvider::Anthropic => default_anthropic_model(),
            OracleProvider::LMStudio => default_lmstudio_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            OracleProvider::Ollama => default_ollama_endpoint(),
            OracleProvider::OpenAI => default_openai_endpoint(),
            OracleProvider::Anthropic => default_anthropic_endpoint(),
            OracleProvider::LMStudio => default_lmstudio_endpoint(),
        }
    }

    /// Get the HTTP timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) if provider_config.timeout_secs > 0 => provider_config.timeout_secs,
            _ if self.provider == OracleProvider::Anthropic => default_anthropic_timeout_secs(),
            _ => default_timeout_secs(),
        }
    }

    /// Set the model of the active provider, adding an entry when none exists
    pub fn set_model(&mut self, model: impl Into<String>) {
        let provider_str = self.provider.to_lowercase_string();
        let model = model.into();
        match self.available_providers.iter_mut().find(|p| p.provider_type == provider_str) {
            Some(provider_config) => provider_config.model = model,
            None => {
                let mut provider_config = ProviderConfig::new(self.provider.clone());
                provider_config.model = model;
                self.available_providers.push(provider_config);
            }
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            provider: OracleProvider::default(),
            available_providers: vec![
                ProviderConfig::new(OracleProvider::Ollama),
                ProviderConfig::new(OracleProvider::OpenAI),
                ProviderConfig::new(OracleProvider::Anthropic),
                ProviderConfig::new(OracleProvider::LMStudio),
            ],
            common: OracleCommonConfig::default(),
        }
    }
}
