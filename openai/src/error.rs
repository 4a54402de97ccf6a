//! Error types for the OpenAI client

use thiserror::Error;

/// Errors that can occur when calling an OpenAI-compatible API
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// Missing `OPENAI_API_KEY` environment variable
    #[error("Missing OPENAI_API_KEY environment variable")]
    MissingApiKey,

    /// The underlying HTTP client could not be built
    #[error("HTTP client construction failed: {0}")]
    ClientBuild(String),

    /// HTTP request failed (connect, timeout, TLS)
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Response body was not the expected JSON
    #[error("Response parsing failed: {0}")]
    ResponseParseFailed(String),

    /// Rate limited - too many requests
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Unauthorized - invalid API key
    #[error("Unauthorized - invalid API key")]
    Unauthorized,

    /// API returned an error status
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API, or the raw body
        message: String,
    },
}
