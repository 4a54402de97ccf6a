//! Content enrichment pipeline.
//!
//! Derives the four publishing artifacts from raw manuscript text:
//!
//! ```text
//!  body ──▶ cover prompt ──▶ cover image URL   (image never fails)
//!  body ──▶ category                           (normalised onto a closed set)
//!  body ──▶ summary
//! ```
//!
//! Each step issues exactly one call to an injected capability. Prompt,
//! category and summary failures propagate; the image step degrades to
//! [`DEFAULT_COVER_URL`].

mod category;
pub mod openai;

pub use category::Category;

use crate::error::UpstreamError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Instruction sent with every text completion
pub const SYSTEM_INSTRUCTION: &str = "You are an AI assistant helping with book publishing.";

/// Cover used whenever image generation fails
pub const DEFAULT_COVER_URL: &str = "https://static.bookpress.dev/images/default-cover.jpg";

/// Default requested image size
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

const COVER_EXCERPT_CHARS: usize = 500;
const CATEGORY_EXCERPT_CHARS: usize = 1000;
const SUMMARY_EXCERPT_CHARS: usize = 2000;
const SUMMARY_MAX_CHARS: usize = 300;

// ============================================================================
// Capabilities
// ============================================================================

/// One text completion call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// System instruction
    pub instruction: String,
    /// User prompt
    pub prompt: String,
}

/// One image generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    /// Image description
    pub prompt: String,
    /// Size such as `1024x1024`
    pub size: String,
    /// Number of images
    pub count: u32,
}

/// Output of an image generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedImage {
    /// Hosted image
    Url(String),
    /// Inline image bytes
    Bytes(Vec<u8>),
}

/// Text-completion capability
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// Complete `request.prompt` under `request.instruction`
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` for transport, status or payload failures.
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError>;
}

/// Image-generation capability
#[async_trait]
pub trait ImageGeneration: Send + Sync {
    /// Generate one image for `request.prompt`
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` for transport, status or payload failures.
    async fn generate(&self, request: ImageRequest) -> Result<GeneratedImage, UpstreamError>;
}

// ============================================================================
// Result
// ============================================================================

/// The four artifacts derived from one manuscript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    /// Prompt used for the cover image
    pub cover_prompt: String,
    /// Generated cover URL, or [`DEFAULT_COVER_URL`]
    pub cover_image_url: String,
    /// Genre
    pub category: Category,
    /// Short summary
    pub summary: String,
}

// ============================================================================
// Pipeline
// ============================================================================

/// Runs the enrichment steps against injected capabilities
#[derive(Clone)]
pub struct Enricher {
    text: Arc<dyn TextCompletion>,
    images: Arc<dyn ImageGeneration>,
    image_size: String,
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("image_size", &self.image_size)
            .finish_non_exhaustive()
    }
}

impl Enricher {
    /// Creates an enricher requesting [`DEFAULT_IMAGE_SIZE`] covers
    #[must_use]
    pub fn new(text: Arc<dyn TextCompletion>, images: Arc<dyn ImageGeneration>) -> Self {
        Self {
            text,
            images,
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
        }
    }

    /// Request covers of another size
    #[must_use]
    pub fn with_image_size(mut self, size: impl Into<String>) -> Self {
        self.image_size = size.into();
        self
    }

    async fn complete(&self, prompt: String) -> Result<String, UpstreamError> {
        let answer = self
            .text
            .complete(CompletionRequest {
                instruction: SYSTEM_INSTRUCTION.to_string(),
                prompt,
            })
            .await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(UpstreamError::Unparseable("empty completion".to_string()));
        }
        Ok(answer.to_string())
    }

    /// Ask for an image-generation prompt describing the book cover
    ///
    /// Uses the first 500 characters of `body`.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the completion fails or is empty.
    pub async fn generate_cover_prompt(&self, body: &str) -> Result<String, UpstreamError> {
        let prompt = format!(
            "Write a short English prompt for an image-generation model that describes a \
             book cover for the following text. Answer with the prompt only.\n\n{}",
            excerpt(body, COVER_EXCERPT_CHARS)
        );
        self.complete(prompt).await
    }

    /// Generate the cover image; never fails
    ///
    /// Returns the hosted `http(s)` URL, a `data:` URL for inline bytes, or
    /// [`DEFAULT_COVER_URL`] on any failure.
    pub async fn generate_cover_image(&self, prompt: &str) -> String {
        let request = ImageRequest {
            prompt: prompt.to_string(),
            size: self.image_size.clone(),
            count: 1,
        };

        match self.images.generate(request).await {
            Ok(GeneratedImage::Url(url)) if is_http_url(&url) => url,
            Ok(GeneratedImage::Bytes(bytes)) if !bytes.is_empty() => {
                format!("data:image/png;base64,{}", STANDARD.encode(bytes))
            },
            Ok(GeneratedImage::Url(url)) => {
                tracing::warn!(url = %url, "Image generation returned an unusable URL, using default cover");
                metrics::counter!("publishing.cover.fallback").increment(1);
                DEFAULT_COVER_URL.to_string()
            },
            Ok(GeneratedImage::Bytes(_)) => {
                tracing::warn!("Image generation returned no bytes, using default cover");
                metrics::counter!("publishing.cover.fallback").increment(1);
                DEFAULT_COVER_URL.to_string()
            },
            Err(error) => {
                tracing::warn!(error = %error, "Image generation failed, using default cover");
                metrics::counter!("publishing.cover.fallback").increment(1);
                DEFAULT_COVER_URL.to_string()
            },
        }
    }

    /// Classify the text into one [`Category`]
    ///
    /// Uses the first 1000 characters of `body`. Unrecognised answers map to
    /// [`Category::Novel`].
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the completion fails or is empty.
    pub async fn classify_category(&self, body: &str) -> Result<Category, UpstreamError> {
        let labels = Category::ALL.map(Category::label).join(", ");
        let prompt = format!(
            "Classify the following text into exactly one of these categories: {labels}. \
             Answer with the category name only.\n\n{}",
            excerpt(body, CATEGORY_EXCERPT_CHARS)
        );
        let answer = self.complete(prompt).await?;
        let category = Category::from_response(&answer);
        tracing::debug!(answer = %answer, category = %category, "Category classified");
        Ok(category)
    }

    /// Summarise the text in at most 300 characters (not enforced)
    ///
    /// Uses the first 2000 characters of `body`.
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the completion fails or is empty.
    pub async fn summarize(&self, body: &str) -> Result<String, UpstreamError> {
        let prompt = format!(
            "Summarize the following text in at most {SUMMARY_MAX_CHARS} characters.\n\n{}",
            excerpt(body, SUMMARY_EXCERPT_CHARS)
        );
        self.complete(prompt).await
    }

    /// Run every step
    ///
    /// Prompt then image runs as one chain, concurrently with classification
    /// and summarisation.
    ///
    /// # Errors
    ///
    /// Returns the first `UpstreamError` of the prompt, category or summary step.
    pub async fn enrich(&self, body: &str) -> Result<EnrichmentResult, UpstreamError> {
        let cover = async {
            let prompt = self.generate_cover_prompt(body).await?;
            let url = self.generate_cover_image(&prompt).await;
            Ok::<_, UpstreamError>((prompt, url))
        };

        let ((cover_prompt, cover_image_url), category, summary) =
            tokio::try_join!(cover, self.classify_category(body), self.summarize(body))?;

        Ok(EnrichmentResult {
            cover_prompt,
            cover_image_url,
            category,
            summary,
        })
    }
}

/// First `max_chars` characters of `text`, never splitting a character
#[must_use]
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(index, _)| &text[..index])
}

fn is_http_url(url: &str) -> bool {
    let url = url.trim();
    (url.starts_with("https://") && url.len() > "https://".len())
        || (url.starts_with("http://") && url.len() > "http://".len())
}
