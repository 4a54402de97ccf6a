//! Domain types of the review service.

use bookpress_contracts::{BookId, ReviewId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// A review of a book
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    /// Review id
    pub id: ReviewId,
    /// Reviewed book
    pub book_id: BookId,
    /// Reviewer
    pub user_id: UserId,
    /// Review text
    pub content: String,
    /// Last change
    pub updated_at: DateTime<Utc>,
}

/// Live reviews by id
#[derive(Clone, Debug, Default)]
pub struct ReviewState {
    /// Reviews that were not deleted
    pub reviews: HashMap<ReviewId, Review>,
    /// Last validation error, if any
    pub last_error: Option<String>,
}

impl ReviewState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Review `id`
    #[must_use]
    pub fn get(&self, id: &ReviewId) -> Option<&Review> {
        self.reviews.get(id)
    }

    /// Reviews of `book_id`, oldest change first
    #[must_use]
    pub fn for_book(&self, book_id: &BookId) -> Vec<&Review> {
        let mut reviews: Vec<&Review> = self
            .reviews
            .values()
            .filter(|review| &review.book_id == book_id)
            .collect();
        reviews.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
        reviews
    }
}

/// Rejected review command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    /// Review text is empty or whitespace
    #[error("Review content cannot be empty")]
    BlankContent,

    /// The id is already taken
    #[error("Review {0} already exists")]
    AlreadyExists(ReviewId),

    /// No review with that id
    #[error("Review {0} not found")]
    NotFound(ReviewId),

    /// Someone other than the reviewer tried to change the review
    #[error("Review {review_id} was not written by {user_id}")]
    NotReviewer {
        /// Review id
        review_id: ReviewId,
        /// User who sent the command
        user_id: UserId,
    },
}

/// Actions of the review aggregate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    // Commands
    /// Review a book
    RegisterReview {
        /// New id
        review_id: ReviewId,
        /// Reviewed book
        book_id: BookId,
        /// Reviewer
        user_id: UserId,
        /// Review text
        content: String,
    },
    /// Replace the text of a review
    EditReview {
        /// Review id
        review_id: ReviewId,
        /// User sending the command
        user_id: UserId,
        /// New text
        content: String,
    },
    /// Remove a review
    DeleteReview {
        /// Review id
        review_id: ReviewId,
        /// User sending the command
        user_id: UserId,
    },

    // Outcomes
    /// The event of a command reached the bus
    EventPublished {
        /// Review id
        review_id: ReviewId,
        /// Event type tag
        event_type: String,
    },
    /// A command was rejected
    ValidationFailed {
        /// Review id
        review_id: ReviewId,
        /// Why
        error: String,
    },
    /// The event of an accepted command could not be published
    PublicationFailed {
        /// Review id
        review_id: ReviewId,
        /// Bus error
        error: String,
    },
}

impl ReviewAction {
    /// Whether this action ends a command (for `send_and_wait_for`)
    #[must_use]
    pub fn is_outcome_for(&self, id: &ReviewId) -> bool {
        match self {
            Self::EventPublished { review_id, .. }
            | Self::ValidationFailed { review_id, .. }
            | Self::PublicationFailed { review_id, .. } => review_id == id,
            Self::RegisterReview { .. } | Self::EditReview { .. } | Self::DeleteReview { .. } => false,
        }
    }
}
