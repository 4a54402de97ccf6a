//! Book catalog lookups used for pricing.

use async_trait::async_trait;
use bookpress_contracts::BookId;
use std::collections::HashSet;
use thiserror::Error;

/// Catalog lookup failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// The catalog could not be reached
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),
}

/// Source of book metadata that affects subscription prices
#[async_trait]
pub trait BookCatalog: Send + Sync {
    /// Whether `book_id` is a bestseller
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when the catalog cannot answer.
    async fn is_bestseller(&self, book_id: &BookId) -> Result<bool, CatalogError>;
}

/// Catalog backed by a fixed set of bestsellers
#[derive(Clone, Debug, Default)]
pub struct StaticBookCatalog {
    bestsellers: HashSet<BookId>,
}

impl StaticBookCatalog {
    /// Creates a catalog without bestsellers
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `book_id` as a bestseller
    #[must_use]
    pub fn with_bestseller(mut self, book_id: impl Into<BookId>) -> Self {
        self.bestsellers.insert(book_id.into());
        self
    }
}

impl FromIterator<BookId> for StaticBookCatalog {
    fn from_iter<I: IntoIterator<Item = BookId>>(iter: I) -> Self {
        Self {
            bestsellers: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BookCatalog for StaticBookCatalog {
    async fn is_bestseller(&self, book_id: &BookId) -> Result<bool, CatalogError> {
        Ok(self.bestsellers.contains(book_id))
    }
}
