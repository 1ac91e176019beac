/*!
 * The extraction oracle capability.
 *
 * The pipeline only needs "text in, raw answer out". `LlmOracle` provides
 * that on top of the HTTP provider clients; tests substitute a scripted
 * oracle from `providers::mock`.
 */

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use std::sync::Arc;
use url::Url;

use crate::app_config::{OracleConfig, OracleProvider};
use crate::errors::ProviderError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::ollama::{GenerationRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

use super::prompts::{ExtractionRequest, PromptBuilder};

/// Anything that can answer an extraction request with raw text
#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    /// Send one request and return the oracle's raw answer
    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: ExtractionOracle + ?Sized> ExtractionOracle for Arc<T> {
    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ProviderError> {
        (**self).extract(request).await
    }
}

/// Parse endpoint URL into host and port
fn parse_endpoint(endpoint: &str) -> Result<(String, u16)> {
    if endpoint.is_empty() {
        return Err(anyhow!("Endpoint cannot be empty"));
    }

    // If it doesn't start with http/https, assume it's just host:port
    let url_str = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{}", endpoint)
    };

    let url = Url::parse(&url_str)
        .context(format!("Failed to parse endpoint URL: {}", endpoint))?;

    let host = url.host_str()
        .ok_or_else(|| anyhow!("Invalid host in endpoint: {}", endpoint))?;
    let port = url.port_or_known_default().unwrap_or(11434);

    Ok((format!("{}://{}", url.scheme(), host), port))
}

/// Provider client variants
#[derive(Debug)]
enum Backend {
    Ollama(Ollama),
    /// OpenAI and LM Studio
    OpenAI(OpenAI),
    Anthropic(Anthropic),
}

/// Extraction oracle backed by an LLM provider
#[derive(Debug)]
pub struct LlmOracle {
    backend: Backend,
    prompts: PromptBuilder,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl LlmOracle {
    /// Build an oracle for the active provider of the configuration
    pub fn from_config(config: &OracleConfig) -> Result<Self> {
        let endpoint = config.get_endpoint();
        let timeout_secs = config.get_timeout_secs();
        let model = config.get_model();

        let backend = match config.provider {
            OracleProvider::Ollama => {
                let (host, port) = parse_endpoint(&endpoint)?;
                Backend::Ollama(Ollama::new(host, port, timeout_secs))
            }
            OracleProvider::OpenAI | OracleProvider::LMStudio => Backend::OpenAI(OpenAI::new(
                config.get_api_key(),
                endpoint,
                model.clone(),
                timeout_secs,
            )),
            OracleProvider::Anthropic => Backend::Anthropic(Anthropic::new(
                config.get_api_key(),
                endpoint,
                model.clone(),
                timeout_secs,
            )),
        };

        debug!("Created {} oracle with model {}", config.provider.display_name(), model);

        Ok(Self {
            backend,
            prompts: PromptBuilder::new(),
            model,
            temperature: config.common.temperature,
            max_tokens: config.common.max_tokens,
        })
    }

    /// Replace the prompt templates
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    /// Check that the provider is reachable
    pub async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.backend {
            Backend::Ollama(client) => client.test_connection().await,
            Backend::OpenAI(client) => client.test_connection().await,
            Backend::Anthropic(client) => client.test_connection().await,
        }
    }
}

#[async_trait]
impl ExtractionOracle for LlmOracle {
    async fn extract(&self, request: &ExtractionRequest) -> Result<String, ProviderError> {
        let (system, user) = self.prompts.build(request);

        match &self.backend {
            Backend::Ollama(client) => {
                let generation = GenerationRequest::new(self.model.clone(), user)
                    .system(system)
                    .temperature(self.temperature)
                    .format("json");
                let response = client.complete(generation).await?;
                Ok(Ollama::extract_text(&response))
            }
            Backend::OpenAI(client) => {
                let chat = OpenAIRequest::new(self.model.clone())
                    .add_message("system", system)
                    .add_message("user", user)
                    .temperature(self.temperature)
                    .max_tokens(self.max_tokens);
                let response = client.complete(chat).await?;
                Ok(OpenAI::extract_text(&response))
            }
            Backend::Anthropic(client) => {
                let message = AnthropicRequest::new(self.model.clone(), self.max_tokens)
                    .system(system)
                    .add_message("user", user)
                    .temperature(self.temperature);
                let response = client.complete(message).await?;
                Ok(Anthropic::extract_text(&response))
            }
        }
    }
}
