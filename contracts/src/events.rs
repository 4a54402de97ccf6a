//! Integration events exchanged between services.
//!
//! One enum per topic. Every variant has a versioned type tag; the payload is
//! the whole enum encoded with bincode, so a consumer decodes with the enum of
//! the topic it subscribed to and matches on the variant.

use crate::ids::{AuthorId, BookId, ManuscriptId, ReviewId, SubscriptionId, UserId};
use bookpress_core::event::{Event, EventError, SerializedEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Encode an event with `correlation_id` metadata.
///
/// # Errors
///
/// Returns `EventError::SerializationError` if the event cannot be encoded.
pub fn envelope<E: Event + Serialize>(
    event: &E,
    correlation_id: &str,
) -> Result<SerializedEvent, EventError> {
    SerializedEvent::from_event(
        event,
        Some(serde_json::json!({ "correlation_id": correlation_id })),
    )
}

/// Events on `manuscript-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManuscriptEvent {
    /// A new manuscript was created as a draft
    ManuscriptRegistered {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// Working title
        title: String,
        /// Full text
        content: String,
        /// Author
        author_id: AuthorId,
    },
    /// A draft's title or text changed
    ManuscriptEdited {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// New title
        title: String,
        /// New text
        content: String,
        /// Author
        author_id: AuthorId,
    },
    /// The author asked for the manuscript to be published
    PublishingRequested {
        /// Manuscript id
        manuscript_id: ManuscriptId,
        /// Title
        title: String,
        /// Full text to publish
        content: String,
        /// Author
        author_id: AuthorId,
    },
}

impl Event for ManuscriptEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ManuscriptRegistered { .. } => "ManuscriptRegistered.v1",
            Self::ManuscriptEdited { .. } => "ManuscriptEdited.v1",
            Self::PublishingRequested { .. } => "PublishingRequested.v1",
        }
    }
}

/// Events on `publishing-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublishingEvent {
    /// A book was generated, stored and persisted
    Published {
        /// New book id
        book_id: BookId,
        /// Source manuscript
        manuscript_id: ManuscriptId,
        /// Book title
        title: String,
        /// Author id
        author_id: AuthorId,
        /// Author display name ("unknown author" when lookup failed)
        author_name: String,
        /// Category label
        category: String,
        /// Short summary
        summary: String,
        /// Cover image URL
        image_url: String,
        /// Path of the stored document
        document_ref: String,
        /// Public URL of the document
        web_url: String,
        /// Pages in the document (0 for the text fallback)
        page_count: u32,
        /// Publication time
        published_at: DateTime<Utc>,
    },
}

impl Event for PublishingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::Published { .. } => "Published.v1",
        }
    }
}

/// Events on `user-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    /// A reader signed up
    UserRegistered {
        /// User id
        user_id: UserId,
        /// Contact email
        email: String,
        /// Display name
        user_name: String,
    },
    /// A reader bought the all-you-can-read pass
    SubscriptionBought {
        /// User id
        user_id: UserId,
    },
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::UserRegistered { .. } => "UserRegistered.v1",
            Self::SubscriptionBought { .. } => "SubscriptionBought.v1",
        }
    }
}

/// Events on `subscription-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    /// A reader subscribed to a book
    SubscriptionApplied {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Book
        book_id: BookId,
        /// Reader
        user_id: UserId,
        /// Whether the reader holds a pass (no points charged)
        has_pass: bool,
        /// Window start
        starts_at: DateTime<Utc>,
        /// Window end (one month later)
        ends_at: DateTime<Utc>,
    },
    /// The subscription was rolled back for lack of points
    SubscriptionFailed {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Book
        book_id: BookId,
        /// Reader
        user_id: UserId,
    },
    /// The reader cancelled the subscription
    SubscriptionCanceled {
        /// Subscription id
        subscription_id: SubscriptionId,
        /// Book
        book_id: BookId,
        /// Reader
        user_id: UserId,
    },
}

impl Event for SubscriptionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::SubscriptionApplied { .. } => "SubscriptionApplied.v1",
            Self::SubscriptionFailed { .. } => "SubscriptionFailed.v1",
            Self::SubscriptionCanceled { .. } => "SubscriptionCanceled.v1",
        }
    }
}

/// Events on `point-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointEvent {
    /// Sign-up bonus credited
    RegisterPointGained {
        /// Account owner
        user_id: UserId,
        /// Balance after the credit
        balance: u32,
    },
    /// Points charged for a subscription
    PointDecreased {
        /// Account owner
        user_id: UserId,
        /// Subscription charged for
        subscription_id: SubscriptionId,
        /// Points deducted
        amount: u32,
        /// Balance after the charge
        balance: u32,
    },
    /// The balance could not cover a subscription
    OutOfPoint {
        /// Account owner
        user_id: UserId,
        /// Subscription that could not be paid
        subscription_id: SubscriptionId,
        /// Points that were needed
        required: u32,
        /// Current balance
        balance: u32,
    },
}

impl Event for PointEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::RegisterPointGained { .. } => "RegisterPointGained.v1",
            Self::PointDecreased { .. } => "PointDecreased.v1",
            Self::OutOfPoint { .. } => "OutOfPoint.v1",
        }
    }
}

/// Events on `author-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorEvent {
    /// An author applied to publish on the platform
    AuthorRegistered {
        /// Author id
        author_id: AuthorId,
        /// Contact email
        email: String,
        /// Pen name
        author_name: String,
        /// Short biography
        introduction: String,
        /// Previous works, free text
        featured_works: String,
    },
    /// An editor approved the author; the name now appears on books
    AuthorApproved {
        /// Author id
        author_id: AuthorId,
        /// Pen name
        author_name: String,
    },
    /// An editor withdrew or refused approval
    AuthorDisapproved {
        /// Author id
        author_id: AuthorId,
    },
}

impl Event for AuthorEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::AuthorRegistered { .. } => "AuthorRegistered.v1",
            Self::AuthorApproved { .. } => "AuthorApproved.v1",
            Self::AuthorDisapproved { .. } => "AuthorDisapproved.v1",
        }
    }
}

/// Events on `review-events`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReviewEvent {
    /// A reader reviewed a book
    ReviewRegistered {
        /// Review id
        review_id: ReviewId,
        /// Reviewed book
        book_id: BookId,
        /// Reviewer
        user_id: UserId,
        /// Review text
        content: String,
    },
    /// The reviewer changed the text
    ReviewEdited {
        /// Review id
        review_id: ReviewId,
        /// Reviewed book
        book_id: BookId,
        /// Reviewer
        user_id: UserId,
        /// New text
        content: String,
    },
    /// The reviewer removed the review
    ReviewDeleted {
        /// Review id
        review_id: ReviewId,
        /// Reviewed book
        book_id: BookId,
        /// Reviewer
        user_id: UserId,
    },
}

impl Event for ReviewEvent {
    fn event_type(&self) -> &'static str {
        match self {
            Self::ReviewRegistered { .. } => "ReviewRegistered.v1",
            Self::ReviewEdited { .. } => "ReviewEdited.v1",
            Self::ReviewDeleted { .. } => "ReviewDeleted.v1",
        }
    }
}
