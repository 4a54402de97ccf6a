//! One publish request, end to end.
//!
//! ```text
//! validate ─▶ enrich ─▶ author lookup ─▶ render + store ─▶ persist record
//! ```
//!
//! Announcing the record is left to the reducer so it can be retried
//! independently of the (expensive) steps above.

use crate::authors::{AuthorDirectory, resolve_author_name};
use crate::documents::DocumentProducer;
use crate::enrichment::Enricher;
use crate::error::{PublishError, ValidationError};
use crate::render::RenderInput;
use crate::store::{BookRecord, DocumentStore};
use bookpress_contracts::{AuthorId, BookId, ManuscriptEvent, ManuscriptId};
use bookpress_core::environment::Clock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Base URL used for document links when none is configured
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

/// Immutable input of a publish request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManuscriptText {
    /// Manuscript id
    pub manuscript_id: ManuscriptId,
    /// Book title
    pub title: String,
    /// Full text
    pub body: String,
    /// Author
    pub author_id: AuthorId,
}

impl ManuscriptText {
    /// Input of a `PublishingRequested` event; other events yield `None`
    #[must_use]
    pub fn from_event(event: ManuscriptEvent) -> Option<Self> {
        match event {
            ManuscriptEvent::PublishingRequested {
                manuscript_id,
                title,
                content,
                author_id,
            } => Some(Self {
                manuscript_id,
                title,
                body: content,
                author_id,
            }),
            ManuscriptEvent::ManuscriptRegistered { .. } | ManuscriptEvent::ManuscriptEdited { .. } => {
                None
            },
        }
    }

    /// Rejects manuscripts that can never be published
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyContent` for a blank body.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.body.trim().is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(())
    }
}

/// Collaborators of a publish request
#[derive(Clone)]
pub struct PublishingPipeline {
    enricher: Enricher,
    authors: Arc<dyn AuthorDirectory>,
    documents: DocumentProducer,
    books: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
}

impl std::fmt::Debug for PublishingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishingPipeline")
            .field("enricher", &self.enricher)
            .field("documents", &self.documents)
            .field("public_base_url", &self.public_base_url)
            .finish_non_exhaustive()
    }
}

impl PublishingPipeline {
    /// Creates a pipeline linking documents under [`DEFAULT_PUBLIC_BASE_URL`]
    #[must_use]
    pub fn new(
        enricher: Enricher,
        authors: Arc<dyn AuthorDirectory>,
        documents: DocumentProducer,
        books: Arc<dyn DocumentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            enricher,
            authors,
            documents,
            books,
            clock,
            public_base_url: DEFAULT_PUBLIC_BASE_URL.to_string(),
        }
    }

    /// Link documents under another base URL
    #[must_use]
    pub fn with_public_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.public_base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Public URL of document `document_id`
    #[must_use]
    pub fn web_url(&self, document_id: &str) -> String {
        format!("{}/pdfs/{document_id}", self.public_base_url)
    }

    /// Run every step and persist the resulting record
    ///
    /// # Errors
    ///
    /// - `PublishError::Validation`: blank body
    /// - `PublishError::Upstream`: prompt, category or summary generation failed
    /// - `PublishError::DocumentStore`: the record could not be persisted
    pub async fn publish(&self, manuscript: &ManuscriptText) -> Result<BookRecord, PublishError> {
        let manuscript_id = &manuscript.manuscript_id;
        manuscript.validate()?;

        tracing::info!(
            manuscript_id = %manuscript_id,
            body_chars = manuscript.body.chars().count(),
            "Enrichment started"
        );
        let enrichment = self.enricher.enrich(&manuscript.body).await?;
        tracing::info!(
            manuscript_id = %manuscript_id,
            category = %enrichment.category,
            summary_chars = enrichment.summary.chars().count(),
            "Enrichment completed"
        );

        let author_name = resolve_author_name(self.authors.as_ref(), &manuscript.author_id).await;

        let document = self
            .documents
            .produce(&RenderInput {
                title: manuscript.title.clone(),
                image_url: Some(enrichment.cover_image_url.clone()),
                summary: enrichment.summary.clone(),
                body: manuscript.body.clone(),
            })
            .await;

        let record = BookRecord {
            book_id: BookId::generate(),
            manuscript_id: manuscript_id.clone(),
            title: manuscript.title.clone(),
            author_id: manuscript.author_id.clone(),
            author_name,
            category: enrichment.category.label().to_string(),
            summary: enrichment.summary,
            image_ref: enrichment.cover_image_url,
            web_url: self.web_url(&document.document_id),
            document_id: document.document_id,
            document_ref: document.path,
            page_count: document.page_count,
            published_at: self.clock.now(),
        };

        if let Err(error) = self.books.upsert(record.clone()).await {
            if let Err(cleanup) = self.documents.storage().remove_document(&record.document_id).await {
                tracing::warn!(
                    document_id = %record.document_id,
                    error = %cleanup,
                    "Removing unpersisted document failed"
                );
            }
            return Err(error.into());
        }
        tracing::info!(
            manuscript_id = %manuscript_id,
            book_id = %record.book_id,
            document_id = %record.document_id,
            "Book record persisted"
        );

        Ok(record)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::enrichment::DEFAULT_COVER_URL;
    use crate::error::UpstreamError;
    use crate::testing::{ScriptedCompletion, ScriptedImages, TestPipeline, enrichment_script};
    use crate::authors::StaticAuthorDirectory;
    use crate::error::DocumentStoreError;
    use crate::render::Renderer;
    use crate::storage::Storage;
    use crate::testing::OfflineImageFetcher;
    use bookpress_testing::test_clock;
    use std::future::Future;
    use std::pin::Pin;

    struct UnavailableStore;

    impl DocumentStore for UnavailableStore {
        fn upsert(
            &self,
            _record: BookRecord,
        ) -> Pin<Box<dyn Future<Output = Result<(), DocumentStoreError>> + Send + '_>> {
            Box::pin(async { Err(DocumentStoreError::Unavailable("connection refused".to_string())) })
        }

        fn find_by_manuscript(
            &self,
            _manuscript_id: &ManuscriptId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>
        {
            Box::pin(async { Ok(None) })
        }

        fn find_by_book(
            &self,
            _book_id: &BookId,
        ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>
        {
            Box::pin(async { Ok(None) })
        }
    }

    fn file_count(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn failed_persistence_removes_the_written_document() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();
        let pipeline = PublishingPipeline::new(
            Enricher::new(
                Arc::new(enrichment_script("essay", "Short.")),
                Arc::new(ScriptedImages::url("https://img.example.com/c.png")),
            ),
            Arc::new(StaticAuthorDirectory::new()),
            DocumentProducer::new(Renderer::new(Arc::new(OfflineImageFetcher)), storage.clone()),
            Arc::new(UnavailableStore),
            Arc::new(test_clock()),
        );

        let result = pipeline.publish(&manuscript("a-1", "The tide came in.")).await;

        assert!(matches!(result, Err(PublishError::DocumentStore(_))));
        assert_eq!(file_count(&storage.pdfs_dir()), 0);
        assert_eq!(file_count(&storage.web_dir()), 0);
    }

    fn manuscript(author: &str, body: &str) -> ManuscriptText {
        ManuscriptText {
            manuscript_id: ManuscriptId::from("m-1"),
            title: "Tides".to_string(),
            body: body.to_string(),
            author_id: AuthorId::from(author),
        }
    }

    #[tokio::test]
    async fn publish_persists_a_complete_record() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = TestPipeline::with_clock(
            dir.path(),
            enrichment_script("Essay", "A quiet book about the sea."),
            ScriptedImages::url("https://img.example.com/c.png"),
            Arc::new(test_clock()),
        )
        .await
        .unwrap();

        let record = fixture
            .pipeline
            .publish(&manuscript("a-1", "The tide came in."))
            .await
            .unwrap();

        assert_eq!(record.author_name, "Mina Park");
        assert_eq!(record.category, "essay");
        assert_eq!(record.summary, "A quiet book about the sea.");
        assert_eq!(record.image_ref, "https://img.example.com/c.png");
        assert_eq!(record.published_at, test_clock().now());
        assert_eq!(
            record.web_url,
            format!("http://localhost:8080/pdfs/{}", record.document_id)
        );
        assert_eq!(record.page_count, 3);
        assert!(std::path::Path::new(&record.document_ref).is_file());
        assert_eq!(fixture.books.records(), vec![record]);
        assert_eq!(fixture.text.requests().len(), 3);
        assert_eq!(fixture.images.requests().len(), 1);
    }

    #[tokio::test]
    async fn image_failure_uses_the_default_cover() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = TestPipeline::new(
            dir.path(),
            enrichment_script("poetry", "Verses."),
            ScriptedImages::failing(UpstreamError::RateLimited),
        )
        .await
        .unwrap();

        let record = fixture
            .pipeline
            .publish(&manuscript("a-404", "Roses."))
            .await
            .unwrap();

        assert_eq!(record.image_ref, DEFAULT_COVER_URL);
        assert_eq!(record.author_name, crate::authors::UNKNOWN_AUTHOR);
        assert_eq!(record.category, "poetry");
    }

    #[tokio::test]
    async fn summary_failure_aborts_without_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let text = ScriptedCompletion::new()
            .fail("Summarize", UpstreamError::Unauthorized)
            .respond("", "essay");
        let fixture = TestPipeline::new(
            dir.path(),
            text,
            ScriptedImages::url("https://img.example.com/c.png"),
        )
        .await
        .unwrap();

        let error = fixture
            .pipeline
            .publish(&manuscript("a-1", "The tide came in."))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            PublishError::Upstream(UpstreamError::Unauthorized)
        ));
        assert!(fixture.books.is_empty());
        assert_eq!(
            std::fs::read_dir(fixture.storage.pdfs_dir()).unwrap().count(),
            0
        );
    }

    #[tokio::test]
    async fn blank_body_is_rejected_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = TestPipeline::new(
            dir.path(),
            enrichment_script("essay", "Short."),
            ScriptedImages::url("https://img.example.com/c.png"),
        )
        .await
        .unwrap();

        let error = fixture
            .pipeline
            .publish(&manuscript("a-1", "   "))
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            PublishError::Validation(ValidationError::EmptyContent)
        ));
        assert!(fixture.text.requests().is_empty());
    }

    #[test]
    fn only_publishing_requests_become_input() {
        let edited = ManuscriptEvent::ManuscriptEdited {
            manuscript_id: ManuscriptId::from("m-1"),
            title: "Tides".to_string(),
            content: "Text".to_string(),
            author_id: AuthorId::from("a-1"),
        };
        assert!(ManuscriptText::from_event(edited).is_none());

        let requested = ManuscriptEvent::PublishingRequested {
            manuscript_id: ManuscriptId::from("m-1"),
            title: "Tides".to_string(),
            content: "Text".to_string(),
            author_id: AuthorId::from("a-1"),
        };
        let text = ManuscriptText::from_event(requested).unwrap();
        assert_eq!(text.body, "Text");
    }

    #[tokio::test]
    async fn web_url_trims_the_configured_base() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = TestPipeline::new(
            dir.path(),
            ScriptedCompletion::new(),
            ScriptedImages::url("https://img.example.com/c.png"),
        )
        .await
        .unwrap();

        let pipeline = fixture
            .pipeline
            .with_public_base_url("https://books.example.com/");
        assert_eq!(
            pipeline.web_url("book_1234abcd"),
            "https://books.example.com/pdfs/book_1234abcd"
        );
    }
}
