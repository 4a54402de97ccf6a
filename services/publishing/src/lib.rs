//! # BookPress Publishing
//!
//! Turns a manuscript into a published book.
//!
//! ```text
//! PublishingRequested ─▶ PublishingReducer ─▶ PublishingPipeline
//!                                               ├─ Enricher        (AI prompt, cover, category, summary)
//!                                               ├─ AuthorDirectory (name, falls back to "unknown author")
//!                                               ├─ DocumentProducer(PDF or text fallback, HTML rendition)
//!                                               └─ DocumentStore   (BookRecord upsert)
//!                    ◀─ BookPersisted ──────────┘
//!                    ─▶ Published.v1 on `publishing-events`
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use bookpress_publishing::{PublishingAction, PublishingReducer, PublishingState};
//! use bookpress_runtime::Store;
//!
//! let store = Store::new(PublishingState::new(), PublishingReducer::new(), env);
//! store.send(PublishingAction::RequestPublishing { manuscript }).await?;
//! ```

pub mod authors;
pub mod documents;
pub mod enrichment;
pub mod error;
pub mod pipeline;
pub mod reducer;
pub mod render;
pub mod server;
pub mod storage;
pub mod store;
pub mod testing;

pub use authors::{
    AuthorDirectory, AuthorRoster, HttpAuthorDirectory, StaticAuthorDirectory, UNKNOWN_AUTHOR,
};
pub use documents::{DocumentProducer, RenderedDocument};
pub use enrichment::{Category, Enricher, EnrichmentResult};
pub use error::{
    DocumentStoreError, PublishError, RenderError, StorageError, UpstreamError, ValidationError,
};
pub use pipeline::{ManuscriptText, PublishingPipeline};
pub use reducer::{
    Publication, PublicationStatus, PublishingAction, PublishingEnvironment, PublishingReducer,
    PublishingSettings, PublishingState,
};
pub use render::{RenderInput, Renderer};
pub use server::document_router;
pub use storage::{DocumentKind, Storage};
pub use store::{BookRecord, DocumentStore, InMemoryBookStore};
