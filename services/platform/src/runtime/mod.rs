//! Event consumption: a reconnecting bus consumer and the handlers that route
//! events between aggregates.

mod consumer;
mod handlers;

pub use consumer::{DEFAULT_RETRY_DELAY, EventConsumer};
pub use handlers::{EventHandler, HandlerError, RosterUpdater, StoreForwarder};
