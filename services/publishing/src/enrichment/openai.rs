//! Enrichment capabilities backed by an OpenAI-compatible API.

use super::{CompletionRequest, GeneratedImage, ImageGeneration, ImageRequest, TextCompletion};
use crate::error::UpstreamError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bookpress_openai::{
    ChatMessage, ChatRequest, ImageGenerationRequest, ImageResponseFormat, OpenAiClient,
};

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// Default image model
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// [`TextCompletion`] through `POST /chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiCompletion {
    client: OpenAiClient,
    model: String,
}

impl OpenAiCompletion {
    /// Creates a completion capability using `model`
    #[must_use]
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl TextCompletion for OpenAiCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError> {
        let chat = ChatRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::system(request.instruction),
                ChatMessage::user(request.prompt),
            ],
        );

        let response = self.client.chat_completions(&chat).await?;
        response
            .first_content()
            .map(ToString::to_string)
            .ok_or_else(|| UpstreamError::Unparseable("response has no choices".to_string()))
    }
}

/// [`ImageGeneration`] through `POST /images/generations`
#[derive(Debug, Clone)]
pub struct OpenAiImages {
    client: OpenAiClient,
    model: String,
}

impl OpenAiImages {
    /// Creates an image capability using `model`
    #[must_use]
    pub fn new(client: OpenAiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageGeneration for OpenAiImages {
    async fn generate(&self, request: ImageRequest) -> Result<GeneratedImage, UpstreamError> {
        let body = ImageGenerationRequest {
            model: self.model.clone(),
            prompt: request.prompt,
            n: request.count,
            size: request.size,
            response_format: Some(ImageResponseFormat::Url),
        };

        let response = self.client.image_generations(&body).await?;
        let Some(image) = response.data.into_iter().next() else {
            return Err(UpstreamError::Unparseable("response has no images".to_string()));
        };

        match (image.url, image.b64_json) {
            (Some(url), _) => Ok(GeneratedImage::Url(url)),
            (None, Some(encoded)) => STANDARD
                .decode(encoded.as_bytes())
                .map(GeneratedImage::Bytes)
                .map_err(|e| UpstreamError::Unparseable(e.to_string())),
            (None, None) => Err(UpstreamError::Unparseable(
                "image has neither url nor b64_json".to_string(),
            )),
        }
    }
}
