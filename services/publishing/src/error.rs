//! Error taxonomy of the publishing pipeline.
//!
//! Only [`ValidationError`] and [`UpstreamError`] from the text steps abort a
//! publish. Image failures degrade to the default cover, [`RenderError`]
//! degrades to the plain-text fallback artifact.

use bookpress_openai::OpenAiError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of an AI capability (text completion or image generation)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Connection, TLS or timeout failure
    #[error("Upstream request failed: {0}")]
    Transport(String),

    /// The provider throttled the request
    #[error("Upstream rate limited")]
    RateLimited,

    /// The provider rejected the credentials
    #[error("Upstream rejected credentials")]
    Unauthorized,

    /// Non-success status from the provider
    #[error("Upstream returned status {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Provider message
        message: String,
    },

    /// The response could not be used (malformed, empty, wrong shape)
    #[error("Unparseable upstream payload: {0}")]
    Unparseable(String),
}

impl From<OpenAiError> for UpstreamError {
    fn from(error: OpenAiError) -> Self {
        match error {
            OpenAiError::MissingApiKey => Self::Unauthorized,
            OpenAiError::ClientBuild(reason) | OpenAiError::RequestFailed(reason) => {
                Self::Transport(reason)
            },
            OpenAiError::ResponseParseFailed(reason) => Self::Unparseable(reason),
            OpenAiError::RateLimited => Self::RateLimited,
            OpenAiError::Unauthorized => Self::Unauthorized,
            OpenAiError::ApiError { status, message } => Self::Status { status, message },
        }
    }
}

/// Failure while producing the paginated document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A built-in font could not be registered
    #[error("Font unavailable: {0}")]
    Font(String),

    /// The cover image could not be downloaded
    #[error("Image fetch failed: {0}")]
    ImageFetch(String),

    /// The cover image bytes are not a supported image
    #[error("Image decode failed: {0}")]
    ImageDecode(String),

    /// The document could not be serialised
    #[error("Document serialisation failed: {0}")]
    Serialize(String),

    /// The HTML rendition template failed
    #[error("HTML template failed: {0}")]
    Template(String),
}

/// A publish request that can never succeed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Manuscript text is empty or whitespace
    #[error("Manuscript content is empty")]
    EmptyContent,
}

/// Failure of the storage directory tree
#[derive(Error, Debug)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("Storage I/O failed at {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure of the book record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentStoreError {
    /// The store could not be reached
    #[error("Document store unavailable: {0}")]
    Unavailable(String),
}

/// Any reason a publish request ends without a persisted book
#[derive(Error, Debug)]
pub enum PublishError {
    /// Rejected before any work
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Prompt, category or summary generation failed
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Storage tree unusable
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Book record could not be persisted
    #[error(transparent)]
    DocumentStore(#[from] DocumentStoreError),
}
