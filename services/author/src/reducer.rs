//! Author reducer.
//!
//! Registration validates the email and pen name. Approval and disapproval
//! toggle the editorial decision; repeating the current decision is rejected
//! so each published event marks a real change.

use crate::types::{Author, AuthorAction, AuthorError, AuthorState, AuthorStatus};
use bookpress_contracts::{AuthorEvent, AuthorId, envelope, topics};
use bookpress_core::environment::Clock;
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::{SmallVec, effect::Effect, publish_event, reducer::Reducer, smallvec};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Environment of the author reducer
#[derive(Clone)]
pub struct AuthorEnvironment {
    /// Clock for change timestamps
    pub clock: Arc<dyn Clock>,
    /// Bus for author events
    pub event_bus: Arc<dyn EventBus>,
}

impl AuthorEnvironment {
    /// Creates a new author environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { clock, event_bus }
    }
}

/// Reducer of the author aggregate
#[derive(Clone, Debug, Default)]
pub struct AuthorReducer;

impl AuthorReducer {
    /// Creates a new author reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    pub fn apply_event(state: &mut AuthorState, event: &AuthorEvent, at: DateTime<Utc>) {
        match event {
            AuthorEvent::AuthorRegistered {
                author_id,
                email,
                author_name,
                introduction,
                featured_works,
            } => {
                state.authors.insert(
                    author_id.clone(),
                    Author {
                        id: author_id.clone(),
                        email: email.clone(),
                        author_name: author_name.clone(),
                        introduction: introduction.clone(),
                        featured_works: featured_works.clone(),
                        status: AuthorStatus::Pending,
                        updated_at: at,
                    },
                );
            },
            AuthorEvent::AuthorApproved { author_id, .. } => {
                Self::set_status(state, author_id, AuthorStatus::Approved, at);
            },
            AuthorEvent::AuthorDisapproved { author_id } => {
                Self::set_status(state, author_id, AuthorStatus::Disapproved, at);
            },
        }
        state.last_error = None;
    }

    fn set_status(state: &mut AuthorState, author_id: &AuthorId, status: AuthorStatus, at: DateTime<Utc>) {
        if let Some(author) = state.authors.get_mut(author_id) {
            author.status = status;
            author.updated_at = at;
        }
    }

    fn validate_register(
        state: &AuthorState,
        author_id: &AuthorId,
        email: &str,
        author_name: &str,
    ) -> Result<(), AuthorError> {
        if author_name.trim().is_empty() {
            return Err(AuthorError::BlankName);
        }
        if email.trim().is_empty() || !email.contains('@') {
            return Err(AuthorError::InvalidEmail(email.to_string()));
        }
        if state.authors.contains_key(author_id) {
            return Err(AuthorError::AlreadyExists(author_id.clone()));
        }
        Ok(())
    }

    /// The author, if their decision would change to `target`
    fn validate_decision<'a>(
        state: &'a AuthorState,
        author_id: &AuthorId,
        target: AuthorStatus,
    ) -> Result<&'a Author, AuthorError> {
        let author = state
            .get(author_id)
            .ok_or_else(|| AuthorError::NotFound(author_id.clone()))?;
        if author.status == target {
            return Err(AuthorError::Unchanged {
                author_id: author_id.clone(),
                status: target,
            });
        }
        Ok(author)
    }

    fn reject(
        state: &mut AuthorState,
        author_id: AuthorId,
        error: &AuthorError,
    ) -> SmallVec<[Effect<AuthorAction>; 4]> {
        tracing::warn!(author_id = %author_id, error = %error, "Author command rejected");
        state.last_error = Some(error.to_string());
        smallvec![Effect::emit(AuthorAction::ValidationFailed {
            author_id,
            error: error.to_string(),
        })]
    }

    fn commit(
        state: &mut AuthorState,
        event: AuthorEvent,
        env: &AuthorEnvironment,
    ) -> SmallVec<[Effect<AuthorAction>; 4]> {
        Self::apply_event(state, &event, env.clock.now());

        let author_id = match &event {
            AuthorEvent::AuthorRegistered { author_id, .. }
            | AuthorEvent::AuthorApproved { author_id, .. }
            | AuthorEvent::AuthorDisapproved { author_id } => author_id.clone(),
        };
        let event_type = event.event_type().to_string();
        tracing::info!(author_id = %author_id, event_type = %event_type, "Author changed");
        metrics::counter!("author.events", "type" => event_type.clone()).increment(1);

        let serialized = match envelope(&event, author_id.as_str()) {
            Ok(serialized) => serialized,
            Err(error) => {
                return smallvec![Effect::emit(AuthorAction::PublicationFailed {
                    author_id,
                    error: error.to_string(),
                })];
            },
        };

        let failed_id = author_id.clone();
        smallvec![publish_event! {
            bus: env.event_bus,
            topic: topics::AUTHOR_EVENTS,
            event: serialized,
            on_success: || Some(AuthorAction::EventPublished { author_id, event_type }),
            on_error: |error| Some(AuthorAction::PublicationFailed {
                author_id: failed_id,
                error: error.to_string(),
            })
        }]
    }
}

impl Reducer for AuthorReducer {
    type State = AuthorState;
    type Action = AuthorAction;
    type Environment = AuthorEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            AuthorAction::RegisterAuthor {
                author_id,
                email,
                author_name,
                introduction,
                featured_works,
            } => {
                if let Err(error) = Self::validate_register(state, &author_id, &email, &author_name) {
                    return Self::reject(state, author_id, &error);
                }
                let event = AuthorEvent::AuthorRegistered {
                    author_id,
                    email,
                    author_name: author_name.trim().to_string(),
                    introduction,
                    featured_works,
                };
                Self::commit(state, event, env)
            },

            AuthorAction::ApproveAuthor { author_id } => {
                let author_name =
                    match Self::validate_decision(state, &author_id, AuthorStatus::Approved) {
                        Ok(author) => author.author_name.clone(),
                        Err(error) => return Self::reject(state, author_id, &error),
                    };
                Self::commit(state, AuthorEvent::AuthorApproved { author_id, author_name }, env)
            },

            AuthorAction::DisapproveAuthor { author_id } => {
                if let Err(error) = Self::validate_decision(state, &author_id, AuthorStatus::Disapproved) {
                    return Self::reject(state, author_id, &error);
                }
                Self::commit(state, AuthorEvent::AuthorDisapproved { author_id }, env)
            },

            // ========== Outcomes ==========
            AuthorAction::ValidationFailed { .. } | AuthorAction::EventPublished { .. } => {
                SmallVec::new()
            },

            AuthorAction::PublicationFailed { author_id, error } => {
                tracing::error!(author_id = %author_id, error = %error, "Author event was not published");
                metrics::counter!("author.events.publish_failed").increment(1);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use bookpress_testing::{InMemoryEventBus, ReducerTest, assertions, test_clock};

    fn env() -> AuthorEnvironment {
        AuthorEnvironment::new(Arc::new(test_clock()), Arc::new(InMemoryEventBus::new()))
    }

    fn register(id: &str, email: &str, name: &str) -> AuthorAction {
        AuthorAction::RegisterAuthor {
            author_id: AuthorId::from(id),
            email: email.to_string(),
            author_name: name.to_string(),
            introduction: "Writes about the sea.".to_string(),
            featured_works: "Tides".to_string(),
        }
    }

    fn a1() -> AuthorId {
        AuthorId::from("a-1")
    }

    #[test]
    fn registered_author_waits_for_approval() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .when_action(register("a-1", "mina@example.com", " Mina Park "))
            .then_state(|state| {
                let author = state.get(&a1()).unwrap();
                assert_eq!(author.status, AuthorStatus::Pending);
                assert_eq!(author.author_name, "Mina Park");
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_events(effects),
                    vec![("author-events".to_string(), "AuthorRegistered.v1".to_string())]
                );
            })
            .run();
    }

    #[test]
    fn invalid_registrations_are_rejected() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .when_action(register("a-1", "mina.example.com", "Mina Park"))
            .then_state(|state| {
                assert!(state.authors.is_empty());
                assert!(state.last_error.as_deref().unwrap().contains("Invalid email"));
            })
            .then_effects(|effects| assert!(assertions::published_events(effects).is_empty()))
            .run();

        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .when_action(register("a-1", "mina@example.com", "  "))
            .then_state(|state| {
                assert_eq!(state.last_error.as_deref(), Some("Author name cannot be empty"));
            })
            .run();

        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .given_action(register("a-1", "mina@example.com", "Mina Park"))
            .when_action(register("a-1", "other@example.com", "Other"))
            .then_state(|state| {
                assert_eq!(state.get(&a1()).unwrap().author_name, "Mina Park");
                assert!(state.last_error.as_deref().unwrap().contains("already exists"));
            })
            .run();
    }

    #[test]
    fn approval_carries_the_pen_name() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .given_action(register("a-1", "mina@example.com", "Mina Park"))
            .when_action(AuthorAction::ApproveAuthor { author_id: a1() })
            .then_state(|state| {
                assert_eq!(state.get(&a1()).unwrap().status, AuthorStatus::Approved);
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_event_types(effects),
                    vec!["AuthorApproved.v1".to_string()]
                );
            })
            .run();
    }

    #[test]
    fn approval_can_be_withdrawn() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .given_action(register("a-1", "mina@example.com", "Mina Park"))
            .given_action(AuthorAction::ApproveAuthor { author_id: a1() })
            .when_action(AuthorAction::DisapproveAuthor { author_id: a1() })
            .then_state(|state| {
                assert_eq!(state.get(&a1()).unwrap().status, AuthorStatus::Disapproved);
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_event_types(effects),
                    vec!["AuthorDisapproved.v1".to_string()]
                );
            })
            .run();
    }

    #[test]
    fn repeated_decision_is_rejected() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .given_action(register("a-1", "mina@example.com", "Mina Park"))
            .given_action(AuthorAction::ApproveAuthor { author_id: a1() })
            .when_action(AuthorAction::ApproveAuthor { author_id: a1() })
            .then_state(|state| {
                assert_eq!(state.last_error.as_deref(), Some("Author a-1 is already Approved"));
            })
            .then_effects(|effects| {
                assert!(assertions::published_events(effects).is_empty());
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn decision_on_unknown_author_is_rejected() {
        ReducerTest::new(AuthorReducer::new())
            .with_env(env())
            .given_state(AuthorState::new())
            .when_action(AuthorAction::DisapproveAuthor { author_id: a1() })
            .then_state(|state| {
                assert_eq!(state.last_error.as_deref(), Some("Author a-1 not found"));
            })
            .then_effects(|effects| assert!(assertions::published_events(effects).is_empty()))
            .run();
    }

    #[test]
    fn replaying_events_rebuilds_the_author() {
        let mut state = AuthorState::new();
        let at = test_clock().now();
        let events = [
            AuthorEvent::AuthorRegistered {
                author_id: a1(),
                email: "mina@example.com".to_string(),
                author_name: "Mina Park".to_string(),
                introduction: String::new(),
                featured_works: String::new(),
            },
            AuthorEvent::AuthorApproved {
                author_id: a1(),
                author_name: "Mina Park".to_string(),
            },
            AuthorEvent::AuthorDisapproved { author_id: a1() },
        ];

        for event in &events {
            AuthorReducer::apply_event(&mut state, event, at);
        }

        assert_eq!(state.get(&a1()).unwrap().status, AuthorStatus::Disapproved);
    }
}
