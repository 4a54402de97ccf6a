//! Domain events and their wire format.
//!
//! Every fact that crosses a service boundary (a manuscript was registered, a
//! book was published, points were deducted) is an [`Event`]. Events are
//! encoded with `bincode` into a [`SerializedEvent`], which is what the event
//! bus carries between services.
//!
//! # Example
//!
//! ```
//! use bookpress_core::event::Event;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum ShelfEvent {
//!     BookShelved { book_id: String },
//!     BookRemoved { book_id: String },
//! }
//!
//! impl Event for ShelfEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             ShelfEvent::BookShelved { .. } => "BookShelved.v1",
//!             ShelfEvent::BookRemoved { .. } => "BookRemoved.v1",
//!         }
//!     }
//! }
//! ```

use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for event encoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to bytes.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize event from bytes.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),

    /// The event type tag is not one this consumer understands.
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),
}

/// An immutable fact published by one service and consumed by others.
///
/// `event_type()` returns a stable, versioned identifier such as
/// `"BookPublished.v1"`. Consumers route on this tag before decoding the
/// payload, so it must never change for an existing schema.
pub trait Event: Send + Sync + 'static {
    /// Returns the versioned event type identifier.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    fn to_bytes(&self) -> Result<Vec<u8>, EventError>
    where
        Self: Serialize,
    {
        bincode::serialize(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }

    /// Deserialize an event from bincode bytes.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the bytes are corrupt or
    /// belong to another event schema.
    ///
    /// # Examples
    ///
    /// ```
    /// use bookpress_core::event::Event;
    /// # use serde::{Serialize, Deserialize};
    /// # #[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
    /// # enum ShelfEvent {
    /// #     BookShelved { book_id: String },
    /// # }
    /// # impl Event for ShelfEvent {
    /// #     fn event_type(&self) -> &'static str { "BookShelved.v1" }
    /// # }
    ///
    /// let original = ShelfEvent::BookShelved {
    ///     book_id: "book-1".to_string(),
    /// };
    ///
    /// let bytes = original.to_bytes().unwrap();
    /// assert_eq!(ShelfEvent::from_bytes(&bytes).unwrap(), original);
    /// ```
    fn from_bytes(bytes: &[u8]) -> Result<Self, EventError>
    where
        Self: DeserializeOwned + Sized,
    {
        bincode::deserialize(bytes).map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

/// An encoded event as carried by the event bus.
#[derive(Clone, Debug)]
pub struct SerializedEvent {
    /// The event type identifier (e.g., "ManuscriptRegistered.v1").
    pub event_type: String,

    /// The bincode-serialized event data.
    pub data: Vec<u8>,

    /// Optional JSON metadata.
    ///
    /// Services put a `correlation_id` here (the manuscript or user id the
    /// event belongs to) so log lines on both sides of the bus line up.
    pub metadata: Option<serde_json::Value>,
}

impl SerializedEvent {
    /// Create a new serialized event.
    #[must_use]
    pub const fn new(
        event_type: String,
        data: Vec<u8>,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            event_type,
            data,
            metadata,
        }
    }

    /// Encode an [`Event`] into its wire format.
    ///
    /// # Errors
    ///
    /// Returns `EventError::SerializationError` if the event cannot be serialized.
    pub fn from_event<E: Event + Serialize>(
        event: &E,
        metadata: Option<serde_json::Value>,
    ) -> Result<Self, EventError> {
        Ok(Self {
            event_type: event.event_type().to_string(),
            data: event.to_bytes()?,
            metadata,
        })
    }

    /// Decode the payload into a concrete event type.
    ///
    /// # Errors
    ///
    /// Returns `EventError::DeserializationError` if the payload does not
    /// match `E`.
    pub fn decode<E: Event + DeserializeOwned>(&self) -> Result<E, EventError> {
        E::from_bytes(&self.data)
    }

    /// The `correlation_id` metadata field, if present.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("correlation_id"))
            .and_then(serde_json::Value::as_str)
    }
}

impl fmt::Display for SerializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SerializedEvent {{ type: {}, size: {} bytes }}",
            self.event_type,
            self.data.len()
        )
    }
}
