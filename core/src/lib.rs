//! # BookPress Core
//!
//! Core traits and types shared by every BookPress service.
//!
//! Services are written as reducers: pure functions that take the current
//! state and an action, mutate the state and return effect descriptions. The
//! runtime crate executes those effects and feeds the resulting actions back.
//!
//! ## Core Concepts
//!
//! - **State**: Domain state owned by one aggregate (manuscripts, publications, points)
//! - **Action**: Every input to a reducer (commands, events, effect results)
//! - **Reducer**: `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: A description of a side effect, never its execution
//! - **Environment**: Injected collaborators (clock, AI capabilities, event bus)
//!
//! ## Example
//!
//! ```ignore
//! use bookpress_core::*;
//!
//! impl Reducer for ManuscriptReducer {
//!     type State = ManuscriptState;
//!     type Action = ManuscriptAction;
//!     type Environment = ManuscriptEnvironment;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ManuscriptState,
//!         action: ManuscriptAction,
//!         env: &ManuscriptEnvironment,
//!     ) -> SmallVec<[Effect<ManuscriptAction>; 4]> {
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Event trait and serialized event wire format
pub mod event;

/// Event bus abstraction for cross-service communication
pub mod event_bus;

/// Declarative macros for building effects
pub mod effect_macros;

/// Reducer module - The core trait for business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They hold all business rules and are deterministic and testable without a runtime.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// Most actions produce zero to two effects, so effects are returned in a
    /// `SmallVec` that stays on the stack for the common case.
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// 1. Validates the action
        /// 2. Updates state in place
        /// 3. Returns effect descriptions to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects are values returned from reducers. The Store runtime executes them
/// and feeds any produced action back into the reducer.
pub mod effect {
    use crate::event::SerializedEvent;
    use crate::event_bus::{EventBus, EventBusError};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::time::Duration;

    /// Callback invoked after an event was accepted by the bus
    pub type OnPublished<Action> = Box<dyn FnOnce() -> Option<Action> + Send>;

    /// Callback invoked after publication failed and retries are exhausted
    pub type OnPublishFailed<Action> = Box<dyn FnOnce(EventBusError) -> Option<Action> + Send>;

    /// Publication of one event to one topic
    ///
    /// The runtime retries the publish with its `RetryPolicy` before calling
    /// `on_error`, so reducers only see the final outcome.
    pub struct EventPublication<Action> {
        /// Bus to publish on
        pub event_bus: Arc<dyn EventBus>,
        /// Destination topic (e.g. `publishing-events`)
        pub topic: String,
        /// The event to publish
        pub event: SerializedEvent,
        /// Action to dispatch when the bus accepted the event
        pub on_success: OnPublished<Action>,
        /// Action to dispatch when every attempt failed
        pub on_error: OnPublishFailed<Action>,
    }

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Publish an event on the event bus (retried by the runtime)
        PublishEvent(EventPublication<Action>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::PublishEvent(publication) => f
                    .debug_struct("Effect::PublishEvent")
                    .field("topic", &publication.topic)
                    .field("event_type", &publication.event.event_type)
                    .finish_non_exhaustive(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Wrap an already-known action so it goes through the effect feedback loop
        ///
        /// Useful for terminal actions decided synchronously by a reducer that
        /// observers (`send_and_wait_for`) still need to see.
        #[must_use]
        pub fn emit(action: Action) -> Effect<Action>
        where
            Action: Send + 'static,
        {
            Effect::Future(Box::pin(async move { Some(action) }))
        }

        /// Returns `true` for `Effect::None`
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
