//! Given-When-Then harness for reducers.
//!
//! Runs a reducer synchronously, without a Store, and checks the resulting
//! state and effect descriptions.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use bookpress_core::{effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent reducer test
///
/// # Example
///
/// ```ignore
/// use bookpress_testing::ReducerTest;
///
/// ReducerTest::new(ManuscriptReducer)
///     .with_env(test_environment())
///     .given_state(ManuscriptState::default())
///     .when_action(ManuscriptAction::RegisterManuscript { .. })
///     .then_state(|state| assert_eq!(state.manuscripts.len(), 1))
///     .then_effects(|effects| {
///         assert_eq!(
///             assertions::published_event_types(effects),
///             vec!["ManuscriptRegistered.v1"],
///         );
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Reduce an action before the one under test (Given)
    ///
    /// Effects of these actions are discarded.
    #[must_use]
    pub fn given_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the action under test (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the reducer and every assertion
    ///
    /// # Panics
    ///
    /// Panics if state, environment or action were not provided, or if an
    /// assertion fails.
    #[allow(clippy::panic)] // Test harness
    #[allow(clippy::expect_used)] // Test harness
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");
        assert!(
            !self.actions.is_empty(),
            "Action must be set with when_action()"
        );

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
pub mod assertions {
    use bookpress_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is present.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// `(topic, event_type)` of every `PublishEvent`, nested effects included
    #[must_use]
    pub fn published_events<A>(effects: &[Effect<A>]) -> Vec<(String, String)> {
        let mut found = Vec::new();
        for effect in effects {
            match effect {
                Effect::PublishEvent(publication) => {
                    found.push((
                        publication.topic.clone(),
                        publication.event.event_type.clone(),
                    ));
                },
                Effect::Parallel(inner) | Effect::Sequential(inner) => {
                    found.extend(published_events(inner));
                },
                Effect::None | Effect::Delay { .. } | Effect::Future(_) => {},
            }
        }
        found
    }

    /// Event type tags of every `PublishEvent`, nested effects included
    #[must_use]
    pub fn published_event_types<A>(effects: &[Effect<A>]) -> Vec<String> {
        published_events(effects)
            .into_iter()
            .map(|(_, event_type)| event_type)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookpress_core::event::SerializedEvent;
    use bookpress_core::event_bus::EventBus;
    use bookpress_core::{SmallVec, publish_event, smallvec};
    use std::sync::Arc;

    #[derive(Clone, Debug, Default)]
    struct ShelfState {
        books: u32,
    }

    #[derive(Clone, Debug)]
    enum ShelfAction {
        Add,
        Remove,
        Announce,
    }

    struct ShelfReducer;

    #[derive(Clone)]
    struct ShelfEnv {
        bus: Arc<dyn EventBus>,
    }

    impl Reducer for ShelfReducer {
        type State = ShelfState;
        type Action = ShelfAction;
        type Environment = ShelfEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                ShelfAction::Add => {
                    state.books += 1;
                    smallvec![Effect::None]
                },
                ShelfAction::Remove => {
                    state.books = state.books.saturating_sub(1);
                    smallvec![Effect::None]
                },
                ShelfAction::Announce => {
                    let event = SerializedEvent::new("Shelved.v1".to_string(), Vec::new(), None);
                    smallvec![Effect::Parallel(vec![publish_event! {
                        bus: env.bus,
                        topic: "shelf-events",
                        event: event,
                        on_success: || None,
                        on_error: |_error| None
                    }])]
                },
            }
        }
    }

    fn env() -> ShelfEnv {
        ShelfEnv {
            bus: Arc::new(crate::InMemoryEventBus::new()),
        }
    }

    #[test]
    fn given_actions_are_applied_before_the_action_under_test() {
        ReducerTest::new(ShelfReducer)
            .with_env(env())
            .given_state(ShelfState::default())
            .given_action(ShelfAction::Add)
            .given_action(ShelfAction::Add)
            .when_action(ShelfAction::Remove)
            .then_state(|state| assert_eq!(state.books, 1))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn published_events_looks_inside_parallel_effects() {
        ReducerTest::new(ShelfReducer)
            .with_env(env())
            .given_state(ShelfState::default())
            .when_action(ShelfAction::Announce)
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_events(effects),
                    vec![("shelf-events".to_string(), "Shelved.v1".to_string())]
                );
            })
            .run();
    }
}
