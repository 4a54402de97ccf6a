//! Shared announcement effect.

use bookpress_contracts::envelope;
use bookpress_core::effect::Effect;
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::publish_event;
use serde::Serialize;
use std::sync::Arc;

/// Publish `event` on `topic`, feeding back `published` or `failed(reason)`
pub(crate) fn announce<A, E, F>(
    bus: Arc<dyn EventBus>,
    topic: &str,
    event: &E,
    correlation_id: &str,
    published: A,
    failed: F,
) -> Effect<A>
where
    A: Send + 'static,
    E: Event + Serialize,
    F: FnOnce(String) -> A + Send + 'static,
{
    match envelope(event, correlation_id) {
        Ok(serialized) => publish_event! {
            bus: bus,
            topic: topic,
            event: serialized,
            on_success: || Some(published),
            on_error: |error| Some(failed(error.to_string()))
        },
        Err(error) => Effect::emit(failed(error.to_string())),
    }
}
