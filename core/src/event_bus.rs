//! Event bus abstraction for cross-service communication.
//!
//! The writing, publishing and subscription services never call each other
//! directly. They publish [`SerializedEvent`]s to topics and subscribe to the
//! topics they care about.
//!
//! ```text
//!  writing ──manuscript-events──▶ publishing ──publishing-events──▶ (catalog, readers)
//!  subscription ◀──user-events / subscription-events──▶ subscription
//! ```
//!
//! # Delivery
//!
//! - **At-least-once**: subscribers may see an event more than once
//! - **Ordered per topic**: events on one topic arrive in publish order
//! - **Fan-out**: every subscriber receives its own copy
//!
//! Topics follow the pattern `{aggregate}-events`.
//!
//! # Implementations
//!
//! - `LocalEventBus` in `bookpress-runtime`: in-process broadcast, used by the platform binary
//! - `InMemoryEventBus` in `bookpress-testing`: records publishes and injects failures

use crate::event::SerializedEvent;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur during event bus operations.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// Failed to connect to the event bus
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Failed to publish an event to a topic
    #[error("Publish failed for topic '{topic}': {reason}")]
    PublishFailed {
        /// The topic that failed
        topic: String,
        /// The reason for failure
        reason: String,
    },

    /// Failed to subscribe to topics
    #[error("Subscription failed for topics {topics:?}: {reason}")]
    SubscriptionFailed {
        /// The topics that failed to subscribe
        topics: Vec<String>,
        /// The reason for failure
        reason: String,
    },

    /// Failed to deserialize an event
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Topic name is empty or malformed
    #[error("Invalid topic: {0}")]
    InvalidTopic(String),

    /// A subscriber fell behind and events were dropped
    #[error("Subscriber lagged, {0} events skipped")]
    Lagged(u64),

    /// Generic error for other failures
    #[error("Event bus error: {0}")]
    Other(String),
}

/// Stream of events from a subscription.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<SerializedEvent, EventBusError>> + Send>>;

/// Publish/subscribe transport shared by all services.
///
/// Methods return boxed futures instead of using `async fn` so the bus can be
/// held as `Arc<dyn EventBus>` inside effects.
///
/// # Examples
///
/// ```rust,ignore
/// use futures::StreamExt;
///
/// let mut stream = event_bus.subscribe(&["manuscript-events"]).await?;
/// while let Some(result) = stream.next().await {
///     match result {
///         Ok(event) if event.event_type == "PublishingRequested.v1" => start_publishing(event)?,
///         Ok(_) => {}
///         Err(e) => tracing::error!("Event stream error: {}", e),
///     }
/// }
/// ```
pub trait EventBus: Send + Sync {
    /// Publish an event to a topic.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::PublishFailed`] if the bus rejects the event.
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Subscribe to one or more topics and receive a merged stream of events.
    ///
    /// Only events published after the subscription was created are delivered.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::SubscriptionFailed`] or
    /// [`EventBusError::InvalidTopic`] if the subscription cannot be created.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}
