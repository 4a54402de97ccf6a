//! Author name lookup.

use async_trait::async_trait;
use bookpress_contracts::{AuthorEvent, AuthorId};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Name used when the author cannot be resolved
pub const UNKNOWN_AUTHOR: &str = "unknown author";

/// Author lookup failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorLookupError {
    /// The directory does not know the author
    #[error("Author not found: {0}")]
    NotFound(AuthorId),

    /// The directory could not be queried
    #[error("Author directory unavailable: {0}")]
    Unavailable(String),
}

/// Resolves author ids to display names
#[async_trait]
pub trait AuthorDirectory: Send + Sync {
    /// Display name of `author_id`
    ///
    /// # Errors
    ///
    /// Returns `AuthorLookupError` if the author is unknown or the directory
    /// cannot be reached.
    async fn author_name(&self, author_id: &AuthorId) -> Result<String, AuthorLookupError>;
}

/// Name of `author_id`, or [`UNKNOWN_AUTHOR`] on any failure
pub async fn resolve_author_name(directory: &dyn AuthorDirectory, author_id: &AuthorId) -> String {
    match directory.author_name(author_id).await {
        Ok(name) if !name.trim().is_empty() => name,
        Ok(_) => {
            tracing::warn!(author_id = %author_id, "Author has an empty name");
            UNKNOWN_AUTHOR.to_string()
        },
        Err(error) => {
            tracing::warn!(author_id = %author_id, error = %error, "Author lookup failed");
            UNKNOWN_AUTHOR.to_string()
        },
    }
}

/// Author service reachable over HTTP at `GET {base}/authors/{id}`
#[derive(Debug, Clone)]
pub struct HttpAuthorDirectory {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorResponse {
    author_name: String,
}

impl HttpAuthorDirectory {
    /// Directory at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl AuthorDirectory for HttpAuthorDirectory {
    async fn author_name(&self, author_id: &AuthorId) -> Result<String, AuthorLookupError> {
        let url = format!("{}/authors/{author_id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AuthorLookupError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(AuthorLookupError::NotFound(author_id.clone()));
        }

        response
            .error_for_status()
            .map_err(|e| AuthorLookupError::Unavailable(e.to_string()))?
            .json::<AuthorResponse>()
            .await
            .map(|body| body.author_name)
            .map_err(|e| AuthorLookupError::Unavailable(e.to_string()))
    }
}

/// Fixed in-process directory
#[derive(Debug, Clone, Default)]
pub struct StaticAuthorDirectory {
    names: HashMap<AuthorId, String>,
}

impl StaticAuthorDirectory {
    /// Empty directory; every lookup fails
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an author
    #[must_use]
    pub fn with_author(mut self, author_id: AuthorId, name: impl Into<String>) -> Self {
        self.names.insert(author_id, name.into());
        self
    }
}

#[async_trait]
impl AuthorDirectory for StaticAuthorDirectory {
    async fn author_name(&self, author_id: &AuthorId) -> Result<String, AuthorLookupError> {
        self.names
            .get(author_id)
            .cloned()
            .ok_or_else(|| AuthorLookupError::NotFound(author_id.clone()))
    }
}

/// Approved authors, kept current from `author-events`
///
/// Registered but unapproved authors stay unknown, so their books are
/// published under [`UNKNOWN_AUTHOR`]. Clones share the same roster.
#[derive(Debug, Clone, Default)]
pub struct AuthorRoster {
    approved: Arc<RwLock<HashMap<AuthorId, String>>>,
}

impl AuthorRoster {
    /// Empty roster
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Track one author event
    pub fn apply(&self, event: &AuthorEvent) {
        let mut approved = self.approved.write().unwrap_or_else(PoisonError::into_inner);
        match event {
            AuthorEvent::AuthorApproved {
                author_id,
                author_name,
            } => {
                approved.insert(author_id.clone(), author_name.clone());
            },
            AuthorEvent::AuthorDisapproved { author_id } => {
                approved.remove(author_id);
            },
            AuthorEvent::AuthorRegistered { .. } => {},
        }
    }

    /// Number of approved authors
    #[must_use]
    pub fn len(&self) -> usize {
        self.approved.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no author is approved
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuthorDirectory for AuthorRoster {
    async fn author_name(&self, author_id: &AuthorId) -> Result<String, AuthorLookupError> {
        self.approved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(author_id)
            .cloned()
            .ok_or_else(|| AuthorLookupError::NotFound(author_id.clone()))
    }
}
