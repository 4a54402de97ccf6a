//! Paginated document renderer.
//!
//! ```text
//!  CoverPage ──▶ SummaryPage ──▶ ContentPages ──▶ Done (page numbers)
//! ```
//!
//! The cover image is fetched asynchronously; sanitising, layout and PDF
//! serialisation then run on a blocking thread. Image problems degrade to a
//! placeholder. Any other failure is returned as [`RenderError`] so the
//! caller can substitute the plain-text fallback.

pub mod cover;
pub mod fallback;
pub mod glyph;
pub mod html;
pub mod layout;
pub mod pdf;

pub use cover::{HttpImageFetcher, ImageFetcher};
pub use fallback::fallback_text;
pub use glyph::GlyphPolicy;
pub use html::render_html;
pub use layout::{DocumentPlan, LayoutCursor};
pub use pdf::{DocumentWriter, PdfWriter};

use crate::error::RenderError;
use image::DynamicImage;
use layout::{CoverArt, PlanInput};
use std::sync::Arc;

/// Everything that ends up in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderInput {
    /// Book title
    pub title: String,
    /// Cover image URL
    pub image_url: Option<String>,
    /// Summary text
    pub summary: String,
    /// Full body
    pub body: String,
}

/// A successfully serialised document
#[derive(Debug, Clone)]
pub struct RenderedPdf {
    /// PDF bytes
    pub bytes: Vec<u8>,
    /// Total pages
    pub page_count: u32,
    /// Layout that was drawn
    pub plan: DocumentPlan,
}

enum Cover {
    Missing,
    Unavailable,
    Loaded(DynamicImage),
}

/// Renders [`RenderInput`]s into paginated PDFs
#[derive(Clone)]
pub struct Renderer {
    fetcher: Arc<dyn ImageFetcher>,
    writer: Arc<dyn DocumentWriter>,
    glyphs: GlyphPolicy,
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("glyphs", &self.glyphs)
            .finish_non_exhaustive()
    }
}

impl Renderer {
    /// Renderer writing PDF with the default glyph policy
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            writer: Arc::new(PdfWriter),
            glyphs: GlyphPolicy::default(),
        }
    }

    /// Replace the document writer
    #[must_use]
    pub fn with_writer(mut self, writer: Arc<dyn DocumentWriter>) -> Self {
        self.writer = writer;
        self
    }

    /// Replace the glyph policy
    #[must_use]
    pub const fn with_glyph_policy(mut self, glyphs: GlyphPolicy) -> Self {
        self.glyphs = glyphs;
        self
    }

    /// Render a document
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if the document could not be built or
    /// serialised. Image failures are not errors.
    pub async fn render(&self, input: &RenderInput) -> Result<RenderedPdf, RenderError> {
        let cover = self.load_cover(input.image_url.as_deref()).await;
        let writer = Arc::clone(&self.writer);
        let glyphs = self.glyphs;
        let input = input.clone();

        tokio::task::spawn_blocking(move || render_document(&input, &cover, writer.as_ref(), glyphs))
            .await
            .map_err(|e| RenderError::Serialize(format!("render task failed: {e}")))?
    }

    async fn load_cover(&self, url: Option<&str>) -> Cover {
        let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
            return Cover::Missing;
        };

        let loaded = match self.fetcher.fetch(url).await {
            Ok(bytes) => cover::decode_image(&bytes),
            Err(error) => Err(error),
        };

        match loaded {
            Ok(image) => Cover::Loaded(image),
            Err(error) => {
                tracing::warn!(url = %url, error = %error, "Cover image unavailable, using placeholder");
                metrics::counter!("publishing.render.image_placeholder").increment(1);
                Cover::Unavailable
            },
        }
    }
}

fn render_document(
    input: &RenderInput,
    cover: &Cover,
    writer: &dyn DocumentWriter,
    glyphs: GlyphPolicy,
) -> Result<RenderedPdf, RenderError> {
    let title = glyphs.sanitize(&input.title);
    let summary = glyphs.sanitize(&input.summary);
    let body = glyphs.sanitize(&input.body);

    let (art, image) = match cover {
        Cover::Missing => (CoverArt::Missing, None),
        Cover::Unavailable => (CoverArt::Unavailable, None),
        Cover::Loaded(image) => (
            CoverArt::Image {
                width_px: image.width(),
                height_px: image.height(),
            },
            Some(image),
        ),
    };

    let plan = layout::plan_document(&PlanInput {
        title: &title,
        summary: &summary,
        body: &body,
        cover: art,
    });
    let bytes = writer.write(&title, &plan, image)?;

    Ok(RenderedPdf {
        bytes,
        page_count: plan.page_count(),
        plan,
    })
}
