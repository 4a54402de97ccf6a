//! # BookPress Subscription
//!
//! Readers, their book subscriptions and the points that pay for them.
//!
//! The two aggregates only talk through the bus:
//!
//! ```text
//! SubscriberReducer ── UserRegistered.v1 ──────▶ PointReducer   (+1000 points)
//!                   ── SubscriptionApplied.v1 ─▶ PointReducer   (1000, or 1500 for a bestseller;
//!                                                                 free with a pass)
//!                   ◀─ OutOfPoint.v1 ───────────                 ─▶ SubscriptionFailed.v1
//! ```

pub mod catalog;
pub mod point;
mod publish;
pub mod subscriber;

pub use catalog::{BookCatalog, CatalogError, StaticBookCatalog};
pub use point::{
    BESTSELLER_PRICE, PointAccount, PointAction, PointEnvironment, PointReducer, PointState,
    SIGN_UP_POINTS, STANDARD_PRICE,
};
pub use subscriber::{
    Subscriber, SubscriberAction, SubscriberEnvironment, SubscriberError, SubscriberReducer,
    SubscriberState, Subscription,
};
