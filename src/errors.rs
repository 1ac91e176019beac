/*!
 * Error types for the scenebreak application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status to the matching provider error
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() || error.is_timeout() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }
}

/// Errors that can occur while breaking a screenplay down into scenes
#[derive(Error, Debug, Clone)]
pub enum BreakdownError {
    /// No usable text was supplied
    #[error("Input text is empty")]
    InputEmpty,

    /// The gating sample was classified as something other than a script
    #[error("Input does not look like a script: {0}")]
    NotAScript(String),

    /// The oracle call failed after all retries
    #[error("Oracle call failed: {0}")]
    OracleCall(#[from] ProviderError),

    /// The oracle answered with something that does not fit the expected shape
    #[error("Oracle response could not be parsed: {0}")]
    OracleSchema(String),

    /// Every chunk exhausted its retries or was skipped
    #[error("All {total} chunks failed ({failed} failed, {skipped} skipped)")]
    AllChunksFailed {
        /// Number of chunks submitted
        total: usize,
        /// Chunks that exhausted their retries
        failed: usize,
        /// Chunks skipped as non-script or cut off by the deadline
        skipped: usize,
    },

    /// Segmenter or pipeline settings are unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BreakdownError {
    /// Whether a chunk call that failed with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::OracleCall(_) | Self::OracleSchema(_))
    }
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from the breakdown pipeline
    #[error("Breakdown error: {0}")]
    Breakdown(#[from] BreakdownError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
