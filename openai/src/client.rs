//! OpenAI API client implementation

use crate::error::OpenAiError;
use crate::types::{ChatRequest, ChatResponse, ImageGenerationRequest, ImageGenerationResponse};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Public OpenAI endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible API client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client from `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::MissingApiKey` if `OPENAI_API_KEY` is not set
    pub fn from_env() -> Result<Self, OpenAiError> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| OpenAiError::MissingApiKey)?;
        let client = Self::new(api_key);

        Ok(match std::env::var("OPENAI_BASE_URL") {
            Ok(url) if !url.trim().is_empty() => client.with_base_url(url),
            _ => client,
        })
    }

    /// Create a client against the public endpoint
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at another OpenAI-compatible base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `OpenAiError::ClientBuild` if the HTTP client cannot be built
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, OpenAiError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OpenAiError::ClientBuild(e.to_string()))?;
        Ok(self)
    }

    /// Base URL requests are sent to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.api_url
    }

    /// `POST /chat/completions`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, non-2xx statuses or bodies that
    /// are not a chat completion
    pub async fn chat_completions(&self, request: &ChatRequest) -> Result<ChatResponse, OpenAiError> {
        tracing::debug!(model = %request.model, messages = request.messages.len(), "Calling chat completions");
        self.post("chat/completions", request).await
    }

    /// `POST /images/generations`
    ///
    /// # Errors
    ///
    /// Returns errors for network failures, non-2xx statuses or bodies that
    /// are not an image generation response
    pub async fn image_generations(
        &self,
        request: &ImageGenerationRequest,
    ) -> Result<ImageGenerationResponse, OpenAiError> {
        tracing::debug!(model = %request.model, size = %request.size, "Calling image generations");
        self.post("images/generations", request).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, OpenAiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(format!("{}/{path}", self.api_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| OpenAiError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| OpenAiError::ResponseParseFailed(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(OpenAiError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(OpenAiError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(OpenAiError::ApiError {
                    status: status.as_u16(),
                    message: error_message(&body),
                })
            },
        }
    }
}

/// `error.message` from an OpenAI error body, or the raw body
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(ToString::to_string))
        .unwrap_or_else(|| body.to_string())
}
