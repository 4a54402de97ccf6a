//! # BookPress Contracts
//!
//! The vocabulary services share over the event bus: identifiers, event
//! enums and topic names. Nothing here has behavior beyond encoding.

pub mod events;
pub mod ids;
pub mod topics;

pub use events::{
    AuthorEvent, ManuscriptEvent, PointEvent, PublishingEvent, ReviewEvent, SubscriptionEvent,
    UserEvent, envelope,
};
pub use ids::{AuthorId, BookId, ManuscriptId, ReviewId, SubscriptionId, UserId};
