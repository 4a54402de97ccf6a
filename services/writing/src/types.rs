//! Domain types of the writing service.

use bookpress_contracts::{AuthorId, ManuscriptId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Where a manuscript stands
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManuscriptStatus {
    /// Editable
    Draft,
    /// Handed to publishing; no longer editable
    PublishingRequested,
}

impl fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::PublishingRequested => write!(f, "PublishingRequested"),
        }
    }
}

/// A manuscript
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manuscript {
    /// Manuscript id
    pub id: ManuscriptId,
    /// Working title
    pub title: String,
    /// Full text
    pub content: String,
    /// Author
    pub author_id: AuthorId,
    /// Lifecycle status
    pub status: ManuscriptStatus,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Manuscripts by id
#[derive(Clone, Debug, Default)]
pub struct ManuscriptState {
    /// All manuscripts
    pub manuscripts: HashMap<ManuscriptId, Manuscript>,
    /// Last validation error, if any
    pub last_error: Option<String>,
}

impl ManuscriptState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Manuscript `id`
    #[must_use]
    pub fn get(&self, id: &ManuscriptId) -> Option<&Manuscript> {
        self.manuscripts.get(id)
    }
}

/// Rejected manuscript command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManuscriptError {
    /// Title is empty or whitespace
    #[error("Manuscript title cannot be empty")]
    BlankTitle,

    /// The id is already taken
    #[error("Manuscript {0} already exists")]
    AlreadyExists(ManuscriptId),

    /// No manuscript with that id
    #[error("Manuscript {0} not found")]
    NotFound(ManuscriptId),

    /// The manuscript left the draft state
    #[error("Manuscript {0} was already requested for publishing")]
    AlreadyRequested(ManuscriptId),
}

/// Actions of the manuscript aggregate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ManuscriptAction {
    // Commands
    /// Create a draft
    RegisterManuscript {
        /// New id
        manuscript_id: ManuscriptId,
        /// Working title
        title: String,
        /// Full text
        content: String,
        /// Author
        author_id: AuthorId,
    },
    /// Change a draft
    EditManuscript {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// New title
        title: String,
        /// New text
        content: String,
    },
    /// Hand a manuscript to publishing
    RequestPublishing {
        /// Manuscript id
        manuscript_id: ManuscriptId,
    },

    // Outcomes
    /// The event of a command reached the bus
    EventPublished {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// Event type tag
        event_type: String,
    },
    /// A command was rejected
    ValidationFailed {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// Why
        error: String,
    },
    /// The event of an accepted command could not be published
    PublicationFailed {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// Bus error
        error: String,
    },
}

impl ManuscriptAction {
    /// Whether this action ends a command (for `send_and_wait_for`)
    #[must_use]
    pub fn is_outcome_for(&self, id: &ManuscriptId) -> bool {
        match self {
            Self::EventPublished { manuscript_id, .. }
            | Self::ValidationFailed { manuscript_id, .. }
            | Self::PublicationFailed { manuscript_id, .. } => manuscript_id == id,
            Self::RegisterManuscript { .. }
            | Self::EditManuscript { .. }
            | Self::RequestPublishing { .. } => false,
        }
    }
}
