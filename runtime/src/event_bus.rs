//! In-process event bus backed by tokio broadcast channels.
//!
//! One broadcast channel per topic, created lazily on first publish or
//! subscribe. Subscribing to several topics merges their channels into a
//! single [`EventStream`]. Events published to a topic nobody listens to are
//! dropped, matching a broker without retention.

use bookpress_core::event::SerializedEvent;
use bookpress_core::event_bus::{EventBus, EventBusError, EventStream};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;

/// Default per-topic channel capacity
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// Event bus that delivers events between services in the same process.
#[derive(Clone)]
pub struct LocalEventBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<SerializedEvent>>>>,
    capacity: usize,
}

impl LocalEventBus {
    /// Create a bus with [`DEFAULT_TOPIC_CAPACITY`] per topic
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TOPIC_CAPACITY)
    }

    /// Create a bus with a custom per-topic capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<SerializedEvent> {
        let mut topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Number of live subscriptions on a topic
    #[must_use]
    pub fn subscriber_count(&self, topic: &str) -> usize {
        let topics = self.topics.lock().unwrap_or_else(PoisonError::into_inner);
        topics.get(topic).map_or(0, broadcast::Sender::receiver_count)
    }
}

impl Default for LocalEventBus {
    fn default() -> Self {
        Self::new()
    }
}

fn topic_stream(
    mut rx: broadcast::Receiver<SerializedEvent>,
) -> impl futures::Stream<Item = Result<SerializedEvent, EventBusError>> + Send {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                    yield Err(EventBusError::Lagged(skipped));
                },
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

impl EventBus for LocalEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            if topic.is_empty() {
                return Err(EventBusError::InvalidTopic(topic));
            }
            let sender = self.sender(&topic);
            match sender.send(event) {
                Ok(receivers) => {
                    tracing::trace!(topic = %topic, receivers, "Event delivered");
                },
                Err(_) => {
                    tracing::debug!(topic = %topic, "Event published with no subscribers");
                },
            }
            metrics::counter!("event_bus.published", "topic" => topic).increment(1);
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(ToString::to_string).collect();
        Box::pin(async move {
            if topics.is_empty() {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "no topics given".to_string(),
                });
            }
            if let Some(empty) = topics.iter().find(|t| t.is_empty()) {
                return Err(EventBusError::InvalidTopic(empty.clone()));
            }

            let streams = topics
                .iter()
                .map(|topic| topic_stream(self.sender(topic).subscribe()).boxed())
                .collect::<Vec<_>>();

            let merged: EventStream = Box::pin(stream::select_all(streams));
            Ok(merged)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use std::time::Duration;

    fn event(kind: &str) -> SerializedEvent {
        SerializedEvent::new(kind.to_string(), vec![1, 2, 3], None)
    }

    #[tokio::test]
    async fn delivers_to_every_subscriber() {
        let bus = LocalEventBus::new();
        let mut first = bus.subscribe(&["manuscript-events"]).await.unwrap();
        let mut second = bus.subscribe(&["manuscript-events"]).await.unwrap();
        assert_eq!(bus.subscriber_count("manuscript-events"), 2);

        bus.publish("manuscript-events", &event("A.v1")).await.unwrap();

        assert_eq!(first.next().await.unwrap().unwrap().event_type, "A.v1");
        assert_eq!(second.next().await.unwrap().unwrap().event_type, "A.v1");
    }

    #[tokio::test]
    async fn merges_multiple_topics() {
        let bus = LocalEventBus::new();
        let mut stream = bus.subscribe(&["user-events", "point-events"]).await.unwrap();

        bus.publish("user-events", &event("User.v1")).await.unwrap();
        bus.publish("point-events", &event("Point.v1")).await.unwrap();
        bus.publish("other-events", &event("Other.v1")).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let next = tokio::time::timeout(Duration::from_secs(1), stream.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            seen.push(next.event_type);
        }
        seen.sort();
        assert_eq!(seen, vec!["Point.v1".to_string(), "User.v1".to_string()]);
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let bus = LocalEventBus::new();
        assert!(bus.publish("lonely-events", &event("X.v1")).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_empty_topics() {
        let bus = LocalEventBus::new();
        assert!(matches!(
            bus.publish("", &event("X.v1")).await,
            Err(EventBusError::InvalidTopic(_))
        ));
        assert!(matches!(
            bus.subscribe(&[]).await,
            Err(EventBusError::SubscriptionFailed { .. })
        ));
    }
}
