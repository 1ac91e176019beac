/*!
 * Provider implementations for the LLM services backing the extraction oracle.
 *
 * This module contains client implementations for various LLM providers:
 * - Ollama: Local LLM server
 * - OpenAI: OpenAI API integration (also used for LM Studio)
 * - Anthropic: Anthropic API integration
 * - Mock: scripted oracle for tests
 *
 * Clients send exactly one HTTP request per call. Retrying is left to the
 * extraction orchestrator, which owns the per-chunk retry budget.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// An HTTP client for one LLM service.
///
/// `LlmOracle` builds a provider-specific request from the rendered prompts,
/// sends it with `complete` and reads the generated text back with
/// `extract_text`; the response parser never sees provider types.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider-specific request body
    type Request: Send + Sync;

    /// Provider-specific response body
    type Response: Send + Sync;

    /// Send one request; non-success statuses map to `ProviderError`
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Minimal round trip to check the service is reachable before a run
    async fn test_connection(&self) -> Result<(), ProviderError>;

    /// Generated text of a response, concatenated when split into parts
    fn extract_text(response: &Self::Response) -> String;
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;
