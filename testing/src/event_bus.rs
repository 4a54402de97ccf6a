use bookpress_core::event::SerializedEvent;
use bookpress_core::event_bus::{EventBus, EventBusError, EventStream};
use bookpress_runtime::LocalEventBus;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Event bus for tests.
///
/// Every successful publish is recorded and also delivered to live
/// subscribers, so it works both for asserting on reducer output and for
/// driving consumers end to end.
///
/// # Example
///
/// ```
/// use bookpress_testing::InMemoryEventBus;
///
/// let bus = InMemoryEventBus::new();
/// bus.fail_next_publishes(1);
/// assert_eq!(bus.published_count(), 0);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryEventBus {
    delivery: LocalEventBus,
    published: Arc<Mutex<Vec<(String, SerializedEvent)>>>,
    attempts: Arc<AtomicUsize>,
    fail_next: Arc<AtomicUsize>,
    fail_all: Arc<AtomicBool>,
}

impl InMemoryEventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` publishes fail with `PublishFailed`
    pub fn fail_next_publishes(&self, count: usize) {
        self.fail_next.store(count, Ordering::SeqCst);
    }

    /// Make every publish fail until switched off again
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_all.store(unavailable, Ordering::SeqCst);
    }

    /// All recorded publications in publish order
    #[must_use]
    pub fn published(&self) -> Vec<(String, SerializedEvent)> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded events for one topic
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<SerializedEvent> {
        self.published()
            .into_iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, event)| event)
            .collect()
    }

    /// Recorded event type tags for one topic
    #[must_use]
    pub fn event_types(&self, topic: &str) -> Vec<String> {
        self.published_to(topic)
            .into_iter()
            .map(|event| event.event_type)
            .collect()
    }

    /// Number of successful publications
    #[must_use]
    pub fn published_count(&self) -> usize {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of publish calls, failed ones included
    #[must_use]
    pub fn publish_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn should_fail(&self) -> bool {
        if self.fail_all.load(Ordering::SeqCst) {
            return true;
        }
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        event: &SerializedEvent,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let event = event.clone();
        Box::pin(async move {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.should_fail() {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "injected failure".to_string(),
                });
            }

            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((topic.clone(), event.clone()));
            self.delivery.publish(&topic, &event).await
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        self.delivery.subscribe(topics)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use futures::StreamExt;

    fn event(kind: &str) -> SerializedEvent {
        SerializedEvent::new(kind.to_string(), Vec::new(), None)
    }

    #[tokio::test]
    async fn records_publications_per_topic() {
        let bus = InMemoryEventBus::new();
        bus.publish("a-events", &event("A.v1")).await.unwrap();
        bus.publish("b-events", &event("B.v1")).await.unwrap();
        bus.publish("a-events", &event("A2.v1")).await.unwrap();

        assert_eq!(bus.published_count(), 3);
        assert_eq!(bus.event_types("a-events"), vec!["A.v1", "A2.v1"]);
        assert_eq!(bus.published_to("b-events").len(), 1);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed() {
        let bus = InMemoryEventBus::new();
        bus.fail_next_publishes(1);

        assert!(bus.publish("a-events", &event("A.v1")).await.is_err());
        assert!(bus.publish("a-events", &event("A.v1")).await.is_ok());
        assert_eq!(bus.publish_attempts(), 2);
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn unavailable_bus_rejects_everything() {
        let bus = InMemoryEventBus::new();
        bus.set_unavailable(true);
        for _ in 0..3 {
            assert!(bus.publish("a-events", &event("A.v1")).await.is_err());
        }
        bus.set_unavailable(false);
        assert!(bus.publish("a-events", &event("A.v1")).await.is_ok());
    }

    #[tokio::test]
    async fn subscribers_receive_successful_publications() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.subscribe(&["a-events"]).await.unwrap();

        bus.fail_next_publishes(1);
        let _ = bus.publish("a-events", &event("Dropped.v1")).await;
        bus.publish("a-events", &event("Kept.v1")).await.unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap().event_type, "Kept.v1");
    }
}
