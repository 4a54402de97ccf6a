//! Declarative macros for building effects with less boilerplate.

/// Create an `Effect::PublishEvent`
///
/// # Example
///
/// ```rust,ignore
/// use bookpress_core::publish_event;
///
/// publish_event! {
///     bus: env.event_bus,
///     topic: "publishing-events",
///     event: serialized_event,
///     on_success: || Some(PublishingAction::Published { manuscript_id }),
///     on_error: |error| Some(PublishingAction::AnnouncementFailed { error: error.to_string() })
/// }
/// ```
#[macro_export]
macro_rules! publish_event {
    (
        bus: $bus:expr,
        topic: $topic:expr,
        event: $event:expr,
        on_success: || $success_body:expr,
        on_error: |$error_param:ident| $error_body:expr
    ) => {
        $crate::effect::Effect::PublishEvent($crate::effect::EventPublication {
            event_bus: ::std::sync::Arc::clone(&$bus),
            topic: ::std::string::ToString::to_string(&$topic),
            event: $event,
            on_success: ::std::boxed::Box::new(move || $success_body),
            on_error: ::std::boxed::Box::new(move |$error_param| $error_body),
        })
    };
}

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use bookpress_core::async_effect;
///
/// async_effect! {
///     let summary = ai.complete(&prompt).await.ok()?;
///     Some(Action::Summarized { summary })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use bookpress_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: PublishingAction::RetryAnnouncement { manuscript_id }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
