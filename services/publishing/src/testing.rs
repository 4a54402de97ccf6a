//! Scripted AI capabilities for tests.
//!
//! Used by this crate's tests and by the platform's end-to-end tests, so they
//! are compiled unconditionally.

use crate::authors::StaticAuthorDirectory;
use crate::documents::DocumentProducer;
use crate::enrichment::{
    CompletionRequest, Enricher, GeneratedImage, ImageGeneration, ImageRequest, TextCompletion,
};
use crate::error::{RenderError, StorageError, UpstreamError};
use crate::pipeline::PublishingPipeline;
use crate::render::{ImageFetcher, Renderer};
use crate::storage::Storage;
use crate::store::InMemoryBookStore;
use async_trait::async_trait;
use bookpress_contracts::AuthorId;
use bookpress_core::environment::{Clock, SystemClock};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

type Outcome<T> = Result<T, UpstreamError>;

/// [`TextCompletion`] answering by prompt substring
///
/// Rules are checked in insertion order; the first rule whose needle occurs in
/// the prompt answers. An empty needle matches every prompt. A prompt with no
/// matching rule fails with `UpstreamError::Unparseable`.
///
/// ```
/// use bookpress_publishing::testing::ScriptedCompletion;
///
/// let text = ScriptedCompletion::new()
///     .respond("Classify", "essay")
///     .respond("", "anything else");
/// assert!(text.requests().is_empty());
/// ```
#[derive(Clone, Default)]
pub struct ScriptedCompletion {
    rules: Arc<Mutex<Vec<(String, Outcome<String>)>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedCompletion {
    /// Creates a completion with no rules
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer prompts containing `needle` with `answer`
    #[must_use]
    pub fn respond(self, needle: &str, answer: &str) -> Self {
        self.push(needle, Ok(answer.to_string()))
    }

    /// Fail prompts containing `needle` with `error`
    #[must_use]
    pub fn fail(self, needle: &str, error: UpstreamError) -> Self {
        self.push(needle, Err(error))
    }

    fn push(self, needle: &str, outcome: Outcome<String>) -> Self {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((needle.to_string(), outcome));
        self
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TextCompletion for ScriptedCompletion {
    async fn complete(&self, request: CompletionRequest) -> Result<String, UpstreamError> {
        let outcome = self
            .rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
            .map(|(_, outcome)| outcome.clone());

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        outcome.unwrap_or_else(|| Err(UpstreamError::Unparseable("no scripted answer".to_string())))
    }
}

/// [`ImageGeneration`] returning one fixed outcome
#[derive(Clone)]
pub struct ScriptedImages {
    outcome: Outcome<GeneratedImage>,
    requests: Arc<Mutex<Vec<ImageRequest>>>,
}

impl ScriptedImages {
    fn with(outcome: Outcome<GeneratedImage>) -> Self {
        Self {
            outcome,
            requests: Arc::default(),
        }
    }

    /// Always return a hosted URL
    #[must_use]
    pub fn url(url: impl Into<String>) -> Self {
        Self::with(Ok(GeneratedImage::Url(url.into())))
    }

    /// Always return inline bytes
    #[must_use]
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::with(Ok(GeneratedImage::Bytes(bytes)))
    }

    /// Always fail
    #[must_use]
    pub fn failing(error: UpstreamError) -> Self {
        Self::with(Err(error))
    }

    /// Every request received so far
    #[must_use]
    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ImageGeneration for ScriptedImages {
    async fn generate(&self, request: ImageRequest) -> Result<GeneratedImage, UpstreamError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        self.outcome.clone()
    }
}

/// [`ImageFetcher`] that never reaches anything
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineImageFetcher;

#[async_trait]
impl ImageFetcher for OfflineImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        if url.starts_with("data:") {
            return crate::render::cover::decode_data_url(url);
        }
        Err(RenderError::ImageFetch(format!("offline: {url}")))
    }
}

/// Completion answering the cover prompt, category and summary steps
#[must_use]
pub fn enrichment_script(category: &str, summary: &str) -> ScriptedCompletion {
    ScriptedCompletion::new()
        .respond("Write a short English prompt", "A lighthouse at dusk, watercolor")
        .respond("Classify the following text", category)
        .respond("Summarize the following text", summary)
}

/// A [`PublishingPipeline`] wired to scripted capabilities and temp storage
///
/// Author `a-1` resolves to "Mina Park"; every other author is unknown.
pub struct TestPipeline {
    /// The pipeline
    pub pipeline: PublishingPipeline,
    /// Records it persisted
    pub books: InMemoryBookStore,
    /// Where documents are written
    pub storage: Storage,
    /// Text capability, for inspecting requests
    pub text: ScriptedCompletion,
    /// Image capability, for inspecting requests
    pub images: ScriptedImages,
}

impl TestPipeline {
    /// Pipeline storing under `root` with the system clock
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage tree cannot be created.
    pub async fn new(
        root: impl Into<PathBuf>,
        text: ScriptedCompletion,
        images: ScriptedImages,
    ) -> Result<Self, StorageError> {
        Self::with_clock(root, text, images, Arc::new(SystemClock)).await
    }

    /// Pipeline storing under `root` with `clock`
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the storage tree cannot be created.
    pub async fn with_clock(
        root: impl Into<PathBuf>,
        text: ScriptedCompletion,
        images: ScriptedImages,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StorageError> {
        let storage = Storage::init(root).await?;
        let books = InMemoryBookStore::new();
        let authors = StaticAuthorDirectory::new().with_author(AuthorId::from("a-1"), "Mina Park");
        let documents = DocumentProducer::new(
            Renderer::new(Arc::new(OfflineImageFetcher)),
            storage.clone(),
        );
        let pipeline = PublishingPipeline::new(
            Enricher::new(Arc::new(text.clone()), Arc::new(images.clone())),
            Arc::new(authors),
            documents,
            Arc::new(books.clone()),
            clock,
        );

        Ok(Self {
            pipeline,
            books,
            storage,
            text,
            images,
        })
    }
}
