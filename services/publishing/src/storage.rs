//! On-disk storage of generated documents.
//!
//! ```text
//! <root>/
//!   pdfs/   book_<id8>.pdf, error_<id8>.txt
//!   temp/
//!   web/    <document_id>.html
//! ```

use crate::error::StorageError;
use std::path::{Path, PathBuf};

/// Storage root used when none is configured
pub const DEFAULT_STORAGE_ROOT: &str = "./storage";

/// Document path reported when even the fallback artifact could not be written
pub const SENTINEL_DOCUMENT_PATH: &str = "/storage/pdfs/error.txt";

const PDFS_DIR: &str = "pdfs";
const TEMP_DIR: &str = "temp";
const WEB_DIR: &str = "web";

/// Kind of a stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Rendered PDF
    Pdf,
    /// Plain-text fallback artifact
    FallbackText,
}

impl DocumentKind {
    /// File extension
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::FallbackText => "txt",
        }
    }

    /// Served content type
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::FallbackText => "text/plain; charset=utf-8",
        }
    }

    const fn id_prefix(self) -> &'static str {
        match self {
            Self::Pdf => "book",
            Self::FallbackText => "error",
        }
    }
}

/// Fresh document id such as `book_1a2b3c4d`
#[must_use]
pub fn new_document_id(kind: DocumentKind) -> String {
    let uuid = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", kind.id_prefix(), &uuid[..8])
}

/// Whether `id` is safe to use as a file stem
#[must_use]
pub fn is_valid_document_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The storage directory tree
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    /// Create `pdfs/`, `temp/` and `web/` under `root`; idempotent
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if a directory cannot be created.
    pub async fn init(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let storage = Self { root: root.into() };
        for dir in [storage.pdfs_dir(), storage.temp_dir(), storage.web_dir()] {
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| StorageError::io(&dir, e))?;
        }
        tracing::info!(root = %storage.root.display(), "Storage initialised");
        Ok(storage)
    }

    /// Storage root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of documents
    #[must_use]
    pub fn pdfs_dir(&self) -> PathBuf {
        self.root.join(PDFS_DIR)
    }

    /// Scratch directory
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(TEMP_DIR)
    }

    /// Directory of HTML renditions
    #[must_use]
    pub fn web_dir(&self) -> PathBuf {
        self.root.join(WEB_DIR)
    }

    /// Path of document `id` of `kind`
    #[must_use]
    pub fn document_path(&self, id: &str, kind: DocumentKind) -> PathBuf {
        self.pdfs_dir().join(format!("{id}.{}", kind.extension()))
    }

    /// Path of the HTML rendition of `id`
    #[must_use]
    pub fn html_path(&self, id: &str) -> PathBuf {
        self.web_dir().join(format!("{id}.html"))
    }

    async fn write(path: PathBuf, bytes: &[u8]) -> Result<PathBuf, StorageError> {
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StorageError::io(&path, e))?;
        Ok(path)
    }

    /// Write document `id`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be written.
    pub async fn write_document(
        &self,
        id: &str,
        kind: DocumentKind,
        bytes: &[u8],
    ) -> Result<PathBuf, StorageError> {
        Self::write(self.document_path(id, kind), bytes).await
    }

    /// Write the HTML rendition of `id`
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be written.
    pub async fn write_html(&self, id: &str, html: &str) -> Result<PathBuf, StorageError> {
        Self::write(self.html_path(id), html.as_bytes()).await
    }

    /// Delete every file of document `id`; missing files are skipped
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` for the first file that exists but cannot
    /// be removed.
    pub async fn remove_document(&self, id: &str) -> Result<(), StorageError> {
        if !is_valid_document_id(id) {
            return Ok(());
        }
        let paths = [
            self.document_path(id, DocumentKind::Pdf),
            self.document_path(id, DocumentKind::FallbackText),
            self.html_path(id),
        ];
        for path in paths {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    return Err(StorageError::io(&path, e));
                }
            }
        }
        Ok(())
    }

    /// Find document `id`, preferring the PDF over the text fallback
    pub async fn find_document(&self, id: &str) -> Option<(PathBuf, DocumentKind)> {
        if !is_valid_document_id(id) {
            return None;
        }
        for kind in [DocumentKind::Pdf, DocumentKind::FallbackText] {
            let path = self.document_path(id, kind);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Some((path, kind));
            }
        }
        None
    }

    /// Find the HTML rendition of `id`
    pub async fn find_html(&self, id: &str) -> Option<PathBuf> {
        if !is_valid_document_id(id) {
            return None;
        }
        let path = self.html_path(id);
        tokio::fs::try_exists(&path)
            .await
            .unwrap_or(false)
            .then_some(path)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_creates_tree_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();

        let storage = Storage::init(dir.path()).await.unwrap();
        Storage::init(dir.path()).await.unwrap();

        assert!(storage.pdfs_dir().is_dir());
        assert!(storage.temp_dir().is_dir());
        assert!(storage.web_dir().is_dir());
    }

    #[tokio::test]
    async fn init_fails_when_root_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, b"x").unwrap();

        let result = Storage::init(&file).await;

        assert!(matches!(result, Err(StorageError::Io { .. })));
    }

    #[test]
    fn document_ids_have_prefix_and_eight_hex_chars() {
        let id = new_document_id(DocumentKind::Pdf);
        assert!(id.starts_with("book_"));
        assert_eq!(id.len(), "book_".len() + 8);
        assert!(is_valid_document_id(&id));
        assert!(new_document_id(DocumentKind::FallbackText).starts_with("error_"));
    }

    #[test]
    fn traversal_ids_are_invalid() {
        assert!(!is_valid_document_id("../etc/passwd"));
        assert!(!is_valid_document_id("a.pdf"));
        assert!(!is_valid_document_id(""));
        assert!(is_valid_document_id("book_1a2B-3"));
    }

    #[tokio::test]
    async fn find_document_prefers_pdf_then_text() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();

        storage
            .write_document("error_1", DocumentKind::FallbackText, b"fallback")
            .await
            .unwrap();
        assert_eq!(
            storage.find_document("error_1").await.map(|(_, kind)| kind),
            Some(DocumentKind::FallbackText)
        );

        storage
            .write_document("error_1", DocumentKind::Pdf, b"%PDF")
            .await
            .unwrap();
        assert_eq!(
            storage.find_document("error_1").await.map(|(_, kind)| kind),
            Some(DocumentKind::Pdf)
        );
        assert!(storage.find_document("missing").await.is_none());
    }

    #[tokio::test]
    async fn remove_document_deletes_every_rendition() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::init(dir.path()).await.unwrap();
        storage
            .write_document("book_1", DocumentKind::Pdf, b"%PDF")
            .await
            .unwrap();
        storage.write_html("book_1", "<h1>Tides</h1>").await.unwrap();

        storage.remove_document("book_1").await.unwrap();
        storage.remove_document("book_1").await.unwrap();

        assert!(storage.find_document("book_1").await.is_none());
        assert!(storage.find_html("book_1").await.is_none());
    }
}
