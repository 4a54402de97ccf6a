//! Application state shared across HTTP handlers.

use bookpress_author::{AuthorAction, AuthorEnvironment, AuthorReducer, AuthorState};
use bookpress_publishing::{PublishingAction, PublishingEnvironment, PublishingReducer, PublishingState};
use bookpress_review::{ReviewAction, ReviewEnvironment, ReviewReducer, ReviewState};
use bookpress_runtime::Store;
use bookpress_subscription::{
    PointAction, PointEnvironment, PointReducer, PointState, SubscriberAction,
    SubscriberEnvironment, SubscriberReducer, SubscriberState,
};
use bookpress_writing::{ManuscriptAction, ManuscriptEnvironment, ManuscriptReducer, ManuscriptState};
use std::sync::Arc;
use std::time::Duration;

/// Store of the manuscript aggregate
pub type WritingStore = Store<ManuscriptState, ManuscriptAction, ManuscriptEnvironment, ManuscriptReducer>;

/// Store of the publishing aggregate
pub type PublishingStore =
    Store<PublishingState, PublishingAction, PublishingEnvironment, PublishingReducer>;

/// Store of the subscriber aggregate
pub type SubscriberStore =
    Store<SubscriberState, SubscriberAction, SubscriberEnvironment, SubscriberReducer>;

/// Store of the point aggregate
pub type PointStore = Store<PointState, PointAction, PointEnvironment, PointReducer>;

/// Store of the author aggregate
pub type AuthorStore = Store<AuthorState, AuthorAction, AuthorEnvironment, AuthorReducer>;

/// Store of the review aggregate
pub type ReviewStore = Store<ReviewState, ReviewAction, ReviewEnvironment, ReviewReducer>;

/// State cloned into every request (all fields are `Arc`s)
#[derive(Clone)]
pub struct AppState {
    /// Manuscript commands
    pub manuscripts: Arc<WritingStore>,
    /// Reader and subscription commands
    pub subscribers: Arc<SubscriberStore>,
    /// Author registration and approval
    pub authors: Arc<AuthorStore>,
    /// Review commands
    pub reviews: Arc<ReviewStore>,
    /// How long a command waits for its outcome
    pub command_timeout: Duration,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(
        manuscripts: Arc<WritingStore>,
        subscribers: Arc<SubscriberStore>,
        authors: Arc<AuthorStore>,
        reviews: Arc<ReviewStore>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            manuscripts,
            subscribers,
            authors,
            reviews,
            command_timeout,
        }
    }
}
