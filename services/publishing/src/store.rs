//! Book records and the document store they are persisted to.

use crate::error::DocumentStoreError;
use bookpress_contracts::{AuthorId, BookId, ManuscriptId, PublishingEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

/// One published book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Book id (UUID v4)
    pub book_id: BookId,
    /// Source manuscript, the upsert key
    pub manuscript_id: ManuscriptId,
    /// Title
    pub title: String,
    /// Author id
    pub author_id: AuthorId,
    /// Author display name
    pub author_name: String,
    /// Category label
    pub category: String,
    /// Summary
    pub summary: String,
    /// Cover image URL
    pub image_ref: String,
    /// Document id under `/pdfs`
    pub document_id: String,
    /// Stored document path
    pub document_ref: String,
    /// Public document URL
    pub web_url: String,
    /// Pages, 0 for the text fallback
    pub page_count: u32,
    /// Publication time
    pub published_at: DateTime<Utc>,
}

impl BookRecord {
    /// The `Published` announcement for this record
    #[must_use]
    pub fn published_event(&self) -> PublishingEvent {
        PublishingEvent::Published {
            book_id: self.book_id.clone(),
            manuscript_id: self.manuscript_id.clone(),
            title: self.title.clone(),
            author_id: self.author_id.clone(),
            author_name: self.author_name.clone(),
            category: self.category.clone(),
            summary: self.summary.clone(),
            image_url: self.image_ref.clone(),
            document_ref: self.document_ref.clone(),
            web_url: self.web_url.clone(),
            page_count: self.page_count,
            published_at: self.published_at,
        }
    }
}

/// Persistence of [`BookRecord`]s, keyed by manuscript
///
/// Returns boxed futures so the store can be held as `Arc<dyn DocumentStore>`.
pub trait DocumentStore: Send + Sync {
    /// Insert or replace the record of `record.manuscript_id`
    ///
    /// # Errors
    ///
    /// Returns `DocumentStoreError` if the store is unavailable.
    fn upsert(
        &self,
        record: BookRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), DocumentStoreError>> + Send + '_>>;

    /// Record of `manuscript_id`, if published
    ///
    /// # Errors
    ///
    /// Returns `DocumentStoreError` if the store is unavailable.
    fn find_by_manuscript(
        &self,
        manuscript_id: &ManuscriptId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>;

    /// Record of `book_id`
    ///
    /// # Errors
    ///
    /// Returns `DocumentStoreError` if the store is unavailable.
    fn find_by_book(
        &self,
        book_id: &BookId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>;
}

/// In-process [`DocumentStore`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryBookStore {
    records: Arc<RwLock<HashMap<ManuscriptId, BookRecord>>>,
}

impl InMemoryBookStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing was stored yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored record
    #[must_use]
    pub fn records(&self) -> Vec<BookRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

impl DocumentStore for InMemoryBookStore {
    fn upsert(
        &self,
        record: BookRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), DocumentStoreError>> + Send + '_>> {
        Box::pin(async move {
            self.records
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(record.manuscript_id.clone(), record);
            Ok(())
        })
    }

    fn find_by_manuscript(
        &self,
        manuscript_id: &ManuscriptId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>
    {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(manuscript_id)
            .cloned();
        Box::pin(async move { Ok(record) })
    }

    fn find_by_book(
        &self,
        book_id: &BookId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<BookRecord>, DocumentStoreError>> + Send + '_>>
    {
        let record = self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|record| &record.book_id == book_id)
            .cloned();
        Box::pin(async move { Ok(record) })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
pub(crate) mod tests {
    use super::*;

    pub(crate) fn record(manuscript: &str, book: &str) -> BookRecord {
        BookRecord {
            book_id: BookId::from(book),
            manuscript_id: ManuscriptId::from(manuscript),
            title: "Tides".to_string(),
            author_id: AuthorId::from("a-1"),
            author_name: "Mina Park".to_string(),
            category: "essay".to_string(),
            summary: "Short.".to_string(),
            image_ref: "https://img.example.com/c.png".to_string(),
            document_id: "book_1234abcd".to_string(),
            document_ref: "storage/pdfs/book_1234abcd.pdf".to_string(),
            web_url: "http://localhost:8080/pdfs/book_1234abcd".to_string(),
            page_count: 3,
            published_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[tokio::test]
    async fn upsert_replaces_by_manuscript() {
        let store = InMemoryBookStore::new();

        store.upsert(record("m-1", "b-1")).await.unwrap();
        store.upsert(record("m-1", "b-2")).await.unwrap();
        store.upsert(record("m-2", "b-3")).await.unwrap();

        assert_eq!(store.len(), 2);
        let latest = store
            .find_by_manuscript(&ManuscriptId::from("m-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.book_id, BookId::from("b-2"));
        assert!(store.find_by_book(&BookId::from("b-1")).await.unwrap().is_none());
        assert!(store.find_by_book(&BookId::from("b-3")).await.unwrap().is_some());
    }

    #[test]
    fn published_event_mirrors_the_record() {
        let record = record("m-1", "b-1");
        let PublishingEvent::Published {
            book_id,
            image_url,
            page_count,
            ..
        } = record.published_event();
        assert_eq!(book_id, record.book_id);
        assert_eq!(image_url, record.image_ref);
        assert_eq!(page_count, 3);
    }
}
