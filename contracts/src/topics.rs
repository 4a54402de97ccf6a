//! Event bus topic names.

/// Manuscript lifecycle (writing service)
pub const MANUSCRIPT_EVENTS: &str = "manuscript-events";

/// Book publication announcements (publishing service)
pub const PUBLISHING_EVENTS: &str = "publishing-events";

/// Subscriber registration and pass purchases
pub const USER_EVENTS: &str = "user-events";

/// Subscription lifecycle
pub const SUBSCRIPTION_EVENTS: &str = "subscription-events";

/// Point balance changes
pub const POINT_EVENTS: &str = "point-events";

/// Author registration and approval
pub const AUTHOR_EVENTS: &str = "author-events";

/// Book reviews
pub const REVIEW_EVENTS: &str = "review-events";
