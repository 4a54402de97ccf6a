//! Event handlers that feed bus events into aggregate stores.
//!
//! Services never call each other. A handler decodes an event from one topic,
//! translates it into an action of another aggregate and sends it to that
//! aggregate's store. Events the target does not react to are skipped.

use async_trait::async_trait;
use bookpress_contracts::AuthorEvent;
use bookpress_core::event::{Event, SerializedEvent};
use bookpress_core::reducer::Reducer;
use bookpress_publishing::AuthorRoster;
use bookpress_runtime::Store;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Error returned by a handler; logged by the consumer, never fatal
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Handler for events delivered by an [`EventConsumer`](super::EventConsumer).
///
/// Errors are logged by the consumer, which keeps processing subsequent
/// events.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Handle one event
    ///
    /// # Errors
    ///
    /// Returns an error if the event cannot be decoded or the target store
    /// rejects the action.
    async fn handle(&self, event: &SerializedEvent) -> Result<(), HandlerError>;
}

/// Translates events of type `Ev` into actions of one store
pub struct StoreForwarder<Ev, S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    store: Arc<Store<S, A, E, R>>,
    translate: fn(Ev) -> Option<A>,
}

impl<Ev, S, A, E, R> StoreForwarder<Ev, S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Forward events accepted by `translate` to `store`
    #[must_use]
    pub const fn new(store: Arc<Store<S, A, E, R>>, translate: fn(Ev) -> Option<A>) -> Self {
        Self { store, translate }
    }
}

#[async_trait]
impl<Ev, S, A, E, R> EventHandler for StoreForwarder<Ev, S, A, E, R>
where
    Ev: Event + DeserializeOwned,
    R: Reducer<State = S, Action = A, Environment = E> + Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
    S: Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    async fn handle(&self, event: &SerializedEvent) -> Result<(), HandlerError> {
        let decoded: Ev = event.decode()?;
        let event_type = decoded.event_type();

        let Some(action) = (self.translate)(decoded) else {
            tracing::trace!(event_type, "Event not relevant to this store");
            return Ok(());
        };

        tracing::debug!(
            event_type,
            correlation_id = event.correlation_id().unwrap_or_default(),
            "Forwarding event to store"
        );
        metrics::counter!("consumer.events.forwarded", "type" => event_type).increment(1);
        self.store.send(action).await?;
        Ok(())
    }
}

/// Keeps the publishing [`AuthorRoster`] current from `author-events`
#[derive(Debug, Clone)]
pub struct RosterUpdater {
    roster: AuthorRoster,
}

impl RosterUpdater {
    /// Update `roster`
    #[must_use]
    pub const fn new(roster: AuthorRoster) -> Self {
        Self { roster }
    }
}

#[async_trait]
impl EventHandler for RosterUpdater {
    async fn handle(&self, event: &SerializedEvent) -> Result<(), HandlerError> {
        let decoded: AuthorEvent = event.decode()?;
        tracing::debug!(event_type = decoded.event_type(), "Updating author roster");
        self.roster.apply(&decoded);
        Ok(())
    }
}
