//! Event bus consumer with automatic reconnection.
//!
//! ```text
//! loop {
//!     subscribe (retry after delay on failure)
//!     loop {
//!         next event ─▶ handler (errors logged, processing continues)
//!         shutdown signal ─▶ exit
//!     }
//!     stream ended ─▶ wait, resubscribe
//! }
//! ```

use super::EventHandler;
use bookpress_core::event::SerializedEvent;
use bookpress_core::event_bus::EventBus;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Default wait before resubscribing
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Consumes topics of an event bus and hands each event to a handler.
///
/// Runs until the shutdown channel fires or closes.
pub struct EventConsumer {
    /// Consumer name (for logging)
    name: String,

    /// Topics to subscribe to
    topics: Vec<String>,

    /// Event bus to consume from
    event_bus: Arc<dyn EventBus>,

    /// Handler for processing events
    handler: Arc<dyn EventHandler>,

    /// Shutdown signal receiver
    shutdown: broadcast::Receiver<()>,

    /// Wait before resubscribing after a failure
    retry_delay: Duration,
}

impl EventConsumer {
    /// Create a consumer with the default retry delay.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        topics: Vec<String>,
        event_bus: Arc<dyn EventBus>,
        handler: Arc<dyn EventHandler>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            name: name.into(),
            topics,
            event_bus,
            handler,
            shutdown,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set a custom retry delay.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Spawn the consumer as a background task.
    #[must_use]
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&mut self) {
        info!(consumer = %self.name, "Event consumer started");

        loop {
            let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();

            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Event consumer received shutdown signal");
                    break;
                }
                subscribe_result = self.event_bus.subscribe(&topics) => {
                    match subscribe_result {
                        Ok(mut stream) => {
                            info!(consumer = %self.name, topics = ?self.topics, "Subscribed to event bus");

                            if self.process_stream(&mut stream).await {
                                break;
                            }

                            warn!(consumer = %self.name, "Event stream ended, reconnecting in {:?}", self.retry_delay);
                            tokio::time::sleep(self.retry_delay).await;
                        }
                        Err(e) => {
                            error!(
                                consumer = %self.name,
                                error = %e,
                                "Failed to subscribe to event bus, retrying in {:?}",
                                self.retry_delay
                            );
                            tokio::time::sleep(self.retry_delay).await;
                        }
                    }
                }
            }
        }

        info!(consumer = %self.name, "Event consumer stopped");
    }

    /// Process events until the stream ends (`false`) or shutdown (`true`).
    async fn process_stream<St, E>(&mut self, stream: &mut St) -> bool
    where
        St: futures::Stream<Item = Result<SerializedEvent, E>> + Unpin + Send,
        E: std::error::Error,
    {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Event consumer received shutdown signal during processing");
                    return true;
                }
                event_result = stream.next() => {
                    match event_result {
                        Some(Ok(event)) => {
                            if let Err(e) = self.handler.handle(&event).await {
                                error!(
                                    consumer = %self.name,
                                    event_type = %event.event_type,
                                    error = %e,
                                    "Failed to handle event"
                                );
                            }
                        }
                        Some(Err(e)) => {
                            error!(consumer = %self.name, error = %e, "Error receiving event from stream");
                        }
                        None => {
                            warn!(consumer = %self.name, "Event stream ended");
                            return false;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use crate::runtime::HandlerError;
    use async_trait::async_trait;
    use bookpress_runtime::LocalEventBus;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, event: &SerializedEvent) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(event.event_type.clone());
            if event.event_type == "Broken.v1" {
                return Err("broken".into());
            }
            Ok(())
        }
    }

    async fn wait_for_subscriber(bus: &LocalEventBus, topic: &str) {
        while bus.subscriber_count(topic) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn handler_errors_do_not_stop_the_consumer() {
        let bus = Arc::new(LocalEventBus::new());
        let recorder = Arc::new(Recorder::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = EventConsumer::new(
            "test",
            vec!["t".to_string()],
            Arc::clone(&bus) as Arc<dyn EventBus>,
            Arc::clone(&recorder) as Arc<dyn EventHandler>,
            shutdown_rx,
        )
        .spawn();
        wait_for_subscriber(&bus, "t").await;

        for event_type in ["Broken.v1", "Fine.v1"] {
            let event = SerializedEvent::new(event_type.to_string(), Vec::new(), None);
            bus.publish("t", &event).await.unwrap();
        }
        while recorder.seen.lock().unwrap().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();
        assert_eq!(*recorder.seen.lock().unwrap(), vec!["Broken.v1", "Fine.v1"]);
    }
}
