//! Domain types of the author service.

use bookpress_contracts::AuthorId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Editorial decision on an author
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorStatus {
    /// Registered, not reviewed yet
    Pending,
    /// Name is printed on published books
    Approved,
    /// Books are published under "unknown author"
    Disapproved,
}

impl fmt::Display for AuthorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Approved => write!(f, "Approved"),
            Self::Disapproved => write!(f, "Disapproved"),
        }
    }
}

/// An author
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Author id
    pub id: AuthorId,
    /// Contact email
    pub email: String,
    /// Pen name
    pub author_name: String,
    /// Short biography
    pub introduction: String,
    /// Previous works
    pub featured_works: String,
    /// Editorial decision
    pub status: AuthorStatus,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Authors by id
#[derive(Clone, Debug, Default)]
pub struct AuthorState {
    /// All authors
    pub authors: HashMap<AuthorId, Author>,
    /// Last validation error, if any
    pub last_error: Option<String>,
}

impl AuthorState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Author `id`
    #[must_use]
    pub fn get(&self, id: &AuthorId) -> Option<&Author> {
        self.authors.get(id)
    }
}

/// Rejected author command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorError {
    /// Pen name is empty or whitespace
    #[error("Author name cannot be empty")]
    BlankName,

    /// Email has no `@`
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    /// The id is already taken
    #[error("Author {0} already exists")]
    AlreadyExists(AuthorId),

    /// No author with that id
    #[error("Author {0} not found")]
    NotFound(AuthorId),

    /// The decision is already in place
    #[error("Author {author_id} is already {status}")]
    Unchanged {
        /// Author id
        author_id: AuthorId,
        /// Current status
        status: AuthorStatus,
    },
}

/// Actions of the author aggregate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthorAction {
    // Commands
    /// Apply as an author
    RegisterAuthor {
        /// New id
        author_id: AuthorId,
        /// Contact email
        email: String,
        /// Pen name
        author_name: String,
        /// Short biography
        introduction: String,
        /// Previous works
        featured_works: String,
    },
    /// Let the author's name appear on books
    ApproveAuthor {
        /// Author id
        author_id: AuthorId,
    },
    /// Refuse or withdraw approval
    DisapproveAuthor {
        /// Author id
        author_id: AuthorId,
    },

    // Outcomes
    /// The event of a command reached the bus
    EventPublished {
        /// Author id
        author_id: AuthorId,
        /// Event type tag
        event_type: String,
    },
    /// A command was rejected
    ValidationFailed {
        /// Author id
        author_id: AuthorId,
        /// Why
        error: String,
    },
    /// The event of an accepted command could not be published
    PublicationFailed {
        /// Author id
        author_id: AuthorId,
        /// Bus error
        error: String,
    },
}

impl AuthorAction {
    /// Whether this action ends a command (for `send_and_wait_for`)
    #[must_use]
    pub fn is_outcome_for(&self, id: &AuthorId) -> bool {
        match self {
            Self::EventPublished { author_id, .. }
            | Self::ValidationFailed { author_id, .. }
            | Self::PublicationFailed { author_id, .. } => author_id == id,
            Self::RegisterAuthor { .. } | Self::ApproveAuthor { .. } | Self::DisapproveAuthor { .. } => {
                false
            },
        }
    }
}
