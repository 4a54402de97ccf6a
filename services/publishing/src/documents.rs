//! Render and store one document per publish request.
//!
//! [`DocumentProducer::produce`] is total: a render or write failure turns
//! into the plain-text fallback, and a failed fallback write into the
//! sentinel path. It never returns an error.

use crate::render::{RenderInput, Renderer, fallback_text, render_html};
use crate::storage::{DocumentKind, SENTINEL_DOCUMENT_PATH, Storage, new_document_id};

/// The stored artifact of a publish request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// File stem, served at `/pdfs/{document_id}`
    pub document_id: String,
    /// Where the artifact was written
    pub path: String,
    /// PDF or fallback text
    pub kind: DocumentKind,
    /// Pages, 0 for the fallback
    pub page_count: u32,
    /// Artifact contents
    pub bytes: Vec<u8>,
}

/// Renders documents and writes them to [`Storage`]
#[derive(Debug, Clone)]
pub struct DocumentProducer {
    renderer: Renderer,
    storage: Storage,
}

impl DocumentProducer {
    /// Creates a producer
    #[must_use]
    pub const fn new(renderer: Renderer, storage: Storage) -> Self {
        Self { renderer, storage }
    }

    /// Storage the producer writes to
    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    /// Render, store and return the document for `input`
    pub async fn produce(&self, input: &RenderInput) -> RenderedDocument {
        let document = match self.renderer.render(input).await {
            Ok(pdf) => {
                let document_id = new_document_id(DocumentKind::Pdf);
                match self
                    .storage
                    .write_document(&document_id, DocumentKind::Pdf, &pdf.bytes)
                    .await
                {
                    Ok(path) => {
                        tracing::info!(
                            document_id = %document_id,
                            page_count = pdf.page_count,
                            "Document stored"
                        );
                        RenderedDocument {
                            document_id,
                            path: path.display().to_string(),
                            kind: DocumentKind::Pdf,
                            page_count: pdf.page_count,
                            bytes: pdf.bytes,
                        }
                    },
                    Err(error) => {
                        tracing::error!(error = %error, "Writing document failed, storing fallback");
                        self.produce_fallback(input).await
                    },
                }
            },
            Err(error) => {
                tracing::error!(error = %error, "Rendering failed, storing fallback");
                metrics::counter!("publishing.render.fallback").increment(1);
                self.produce_fallback(input).await
            },
        };

        match render_html(
            &input.title,
            input.image_url.as_deref(),
            &input.summary,
            &input.body,
        ) {
            Ok(html) => {
                if let Err(error) = self.storage.write_html(&document.document_id, &html).await {
                    tracing::warn!(error = %error, "Writing HTML rendition failed");
                }
            },
            Err(error) => tracing::warn!(error = %error, "Rendering HTML rendition failed"),
        }

        document
    }

    async fn produce_fallback(&self, input: &RenderInput) -> RenderedDocument {
        let text = fallback_text(
            &input.title,
            input.image_url.as_deref(),
            &input.summary,
            &input.body,
        );
        let document_id = new_document_id(DocumentKind::FallbackText);

        let path = match self
            .storage
            .write_document(&document_id, DocumentKind::FallbackText, text.as_bytes())
            .await
        {
            Ok(path) => path.display().to_string(),
            Err(error) => {
                tracing::error!(error = %error, "Writing fallback failed");
                SENTINEL_DOCUMENT_PATH.to_string()
            },
        };

        RenderedDocument {
            document_id,
            path,
            kind: DocumentKind::FallbackText,
            page_count: 0,
            bytes: text.into_bytes(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::render::{DocumentPlan, DocumentWriter, ImageFetcher};
    use async_trait::async_trait;
    use image::DynamicImage;
    use std::sync::Arc;

    struct NoImages;

    #[async_trait]
    impl ImageFetcher for NoImages {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::ImageFetch("offline".to_string()))
        }
    }

    struct BrokenWriter;

    impl DocumentWriter for BrokenWriter {
        fn write(
            &self,
            _title: &str,
            _plan: &DocumentPlan,
            _cover: Option<&DynamicImage>,
        ) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::Serialize("broken".to_string()))
        }
    }

    fn input() -> RenderInput {
        RenderInput {
            title: "Tides".to_string(),
            image_url: Some("https://img.example.com/c.png".to_string()),
            summary: "Short.".to_string(),
            body: "Once upon a time.".to_string(),
        }
    }

    #[tokio::test]
    async fn pdf_and_html_are_stored() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();
        let producer = DocumentProducer::new(Renderer::new(Arc::new(NoImages)), storage.clone());

        let document = producer.produce(&input()).await;

        assert_eq!(document.kind, DocumentKind::Pdf);
        assert!(document.document_id.starts_with("book_"));
        assert_eq!(document.page_count, 3);
        assert_eq!(std::fs::read(&document.path).unwrap(), document.bytes);
        assert!(storage.html_path(&document.document_id).is_file());
    }

    #[tokio::test]
    async fn render_failure_stores_the_fallback_text() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();
        let renderer = Renderer::new(Arc::new(NoImages)).with_writer(Arc::new(BrokenWriter));
        let producer = DocumentProducer::new(renderer, storage);

        let document = producer.produce(&input()).await;

        assert_eq!(document.kind, DocumentKind::FallbackText);
        assert_eq!(document.page_count, 0);
        assert!(document.document_id.starts_with("error_"));
        assert!(document.path.ends_with(".txt"));
        let stored = std::fs::read_to_string(&document.path).unwrap();
        assert_eq!(
            stored,
            fallback_text(
                "Tides",
                Some("https://img.example.com/c.png"),
                "Short.",
                "Once upon a time."
            )
        );
    }

    #[tokio::test]
    async fn unwritable_storage_reports_the_sentinel_path() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();
        std::fs::remove_dir_all(storage.pdfs_dir()).unwrap();
        let producer = DocumentProducer::new(Renderer::new(Arc::new(NoImages)), storage);

        let document = producer.produce(&input()).await;

        assert_eq!(document.kind, DocumentKind::FallbackText);
        assert_eq!(document.path, SENTINEL_DOCUMENT_PATH);
    }
}
