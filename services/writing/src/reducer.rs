//! Manuscript reducer.
//!
//! Commands are validated against the current state. A valid command is turned
//! into a [`ManuscriptEvent`], applied to state and published on
//! `manuscript-events`. Rejections are fed back as `ValidationFailed` so HTTP
//! handlers waiting on the store see them.

use crate::types::{
    Manuscript, ManuscriptAction, ManuscriptError, ManuscriptState, ManuscriptStatus,
};
use bookpress_contracts::{ManuscriptEvent, ManuscriptId, envelope, topics};
use bookpress_core::environment::Clock;
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::{SmallVec, effect::Effect, publish_event, reducer::Reducer, smallvec};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Environment of the manuscript reducer
#[derive(Clone)]
pub struct ManuscriptEnvironment {
    /// Clock for change timestamps
    pub clock: Arc<dyn Clock>,
    /// Bus for manuscript events
    pub event_bus: Arc<dyn EventBus>,
}

impl ManuscriptEnvironment {
    /// Creates a new manuscript environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { clock, event_bus }
    }
}

/// Reducer of the manuscript aggregate
#[derive(Clone, Debug, Default)]
pub struct ManuscriptReducer;

impl ManuscriptReducer {
    /// Creates a new manuscript reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    ///
    /// Deterministic; replaying the events of a manuscript rebuilds it.
    pub fn apply_event(state: &mut ManuscriptState, event: &ManuscriptEvent, at: DateTime<Utc>) {
        match event {
            ManuscriptEvent::ManuscriptRegistered {
                manuscript_id,
                title,
                content,
                author_id,
            } => {
                state.manuscripts.insert(
                    manuscript_id.clone(),
                    Manuscript {
                        id: manuscript_id.clone(),
                        title: title.clone(),
                        content: content.clone(),
                        author_id: author_id.clone(),
                        status: ManuscriptStatus::Draft,
                        updated_at: at,
                    },
                );
            },
            ManuscriptEvent::ManuscriptEdited {
                manuscript_id,
                title,
                content,
                ..
            } => {
                if let Some(manuscript) = state.manuscripts.get_mut(manuscript_id) {
                    manuscript.title.clone_from(title);
                    manuscript.content.clone_from(content);
                    manuscript.updated_at = at;
                }
            },
            ManuscriptEvent::PublishingRequested { manuscript_id, .. } => {
                if let Some(manuscript) = state.manuscripts.get_mut(manuscript_id) {
                    manuscript.status = ManuscriptStatus::PublishingRequested;
                    manuscript.updated_at = at;
                }
            },
        }
        state.last_error = None;
    }

    fn validate_register(
        state: &ManuscriptState,
        manuscript_id: &ManuscriptId,
        title: &str,
    ) -> Result<(), ManuscriptError> {
        if title.trim().is_empty() {
            return Err(ManuscriptError::BlankTitle);
        }
        if state.manuscripts.contains_key(manuscript_id) {
            return Err(ManuscriptError::AlreadyExists(manuscript_id.clone()));
        }
        Ok(())
    }

    fn validate_edit<'a>(
        state: &'a ManuscriptState,
        manuscript_id: &ManuscriptId,
        title: &str,
    ) -> Result<&'a Manuscript, ManuscriptError> {
        let manuscript = state
            .get(manuscript_id)
            .ok_or_else(|| ManuscriptError::NotFound(manuscript_id.clone()))?;
        if manuscript.status != ManuscriptStatus::Draft {
            return Err(ManuscriptError::AlreadyRequested(manuscript_id.clone()));
        }
        if title.trim().is_empty() {
            return Err(ManuscriptError::BlankTitle);
        }
        Ok(manuscript)
    }

    fn reject(
        state: &mut ManuscriptState,
        manuscript_id: ManuscriptId,
        error: &ManuscriptError,
    ) -> SmallVec<[Effect<ManuscriptAction>; 4]> {
        tracing::warn!(manuscript_id = %manuscript_id, error = %error, "Manuscript command rejected");
        state.last_error = Some(error.to_string());
        smallvec![Effect::emit(ManuscriptAction::ValidationFailed {
            manuscript_id,
            error: error.to_string(),
        })]
    }

    /// Applies `event` and publishes it
    fn commit(
        state: &mut ManuscriptState,
        event: ManuscriptEvent,
        env: &ManuscriptEnvironment,
    ) -> SmallVec<[Effect<ManuscriptAction>; 4]> {
        Self::apply_event(state, &event, env.clock.now());

        let manuscript_id = match &event {
            ManuscriptEvent::ManuscriptRegistered { manuscript_id, .. }
            | ManuscriptEvent::ManuscriptEdited { manuscript_id, .. }
            | ManuscriptEvent::PublishingRequested { manuscript_id, .. } => manuscript_id.clone(),
        };
        let event_type = event.event_type().to_string();
        tracing::info!(manuscript_id = %manuscript_id, event_type = %event_type, "Manuscript changed");
        metrics::counter!("writing.events", "type" => event_type.clone()).increment(1);

        let serialized = match envelope(&event, manuscript_id.as_str()) {
            Ok(serialized) => serialized,
            Err(error) => {
                return smallvec![Effect::emit(ManuscriptAction::PublicationFailed {
                    manuscript_id,
                    error: error.to_string(),
                })];
            },
        };

        let failed_id = manuscript_id.clone();
        smallvec![publish_event! {
            bus: env.event_bus,
            topic: topics::MANUSCRIPT_EVENTS,
            event: serialized,
            on_success: || Some(ManuscriptAction::EventPublished { manuscript_id, event_type }),
            on_error: |error| Some(ManuscriptAction::PublicationFailed {
                manuscript_id: failed_id,
                error: error.to_string(),
            })
        }]
    }
}

impl Reducer for ManuscriptReducer {
    type State = ManuscriptState;
    type Action = ManuscriptAction;
    type Environment = ManuscriptEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            ManuscriptAction::RegisterManuscript {
                manuscript_id,
                title,
                content,
                author_id,
            } => {
                if let Err(error) = Self::validate_register(state, &manuscript_id, &title) {
                    return Self::reject(state, manuscript_id, &error);
                }
                let event = ManuscriptEvent::ManuscriptRegistered {
                    manuscript_id,
                    title,
                    content,
                    author_id,
                };
                Self::commit(state, event, env)
            },

            ManuscriptAction::EditManuscript {
                manuscript_id,
                title,
                content,
            } => {
                let author_id = match Self::validate_edit(state, &manuscript_id, &title) {
                    Ok(manuscript) => manuscript.author_id.clone(),
                    Err(error) => return Self::reject(state, manuscript_id, &error),
                };
                let event = ManuscriptEvent::ManuscriptEdited {
                    manuscript_id,
                    title,
                    content,
                    author_id,
                };
                Self::commit(state, event, env)
            },

            // Repeated requests are allowed so an aborted publication can be retried
            ManuscriptAction::RequestPublishing { manuscript_id } => {
                let Some(manuscript) = state.get(&manuscript_id) else {
                    return Self::reject(
                        state,
                        manuscript_id.clone(),
                        &ManuscriptError::NotFound(manuscript_id),
                    );
                };
                let event = ManuscriptEvent::PublishingRequested {
                    manuscript_id: manuscript_id.clone(),
                    title: manuscript.title.clone(),
                    content: manuscript.content.clone(),
                    author_id: manuscript.author_id.clone(),
                };
                Self::commit(state, event, env)
            },

            // ========== Outcomes ==========
            ManuscriptAction::ValidationFailed { .. } | ManuscriptAction::EventPublished { .. } => {
                SmallVec::new()
            },

            ManuscriptAction::PublicationFailed {
                manuscript_id,
                error,
            } => {
                tracing::error!(manuscript_id = %manuscript_id, error = %error, "Manuscript event was not published");
                metrics::counter!("writing.events.publish_failed").increment(1);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use bookpress_contracts::AuthorId;
    use bookpress_testing::{InMemoryEventBus, ReducerTest, assertions, test_clock};

    fn env() -> ManuscriptEnvironment {
        ManuscriptEnvironment::new(Arc::new(test_clock()), Arc::new(InMemoryEventBus::new()))
    }

    fn register(id: &str, title: &str) -> ManuscriptAction {
        ManuscriptAction::RegisterManuscript {
            manuscript_id: ManuscriptId::from(id),
            title: title.to_string(),
            content: "Once upon a time.".to_string(),
            author_id: AuthorId::from("a-1"),
        }
    }

    fn m1() -> ManuscriptId {
        ManuscriptId::from("m-1")
    }

    #[test]
    fn register_creates_a_draft_and_publishes() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .when_action(register("m-1", "Tides"))
            .then_state(|state| {
                let manuscript = state.get(&m1()).unwrap();
                assert_eq!(manuscript.status, ManuscriptStatus::Draft);
                assert_eq!(manuscript.title, "Tides");
                assert_eq!(manuscript.updated_at, test_clock().now());
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_events(effects),
                    vec![(
                        "manuscript-events".to_string(),
                        "ManuscriptRegistered.v1".to_string()
                    )]
                );
            })
            .run();
    }

    #[test]
    fn blank_title_is_rejected() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .when_action(register("m-1", "   "))
            .then_state(|state| {
                assert!(state.manuscripts.is_empty());
                assert_eq!(
                    state.last_error.as_deref(),
                    Some("Manuscript title cannot be empty")
                );
            })
            .then_effects(|effects| {
                assert!(assertions::published_events(effects).is_empty());
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn duplicate_id_is_rejected() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .given_action(register("m-1", "Tides"))
            .when_action(register("m-1", "Other"))
            .then_state(|state| {
                assert_eq!(state.get(&m1()).unwrap().title, "Tides");
                assert!(state.last_error.as_deref().unwrap().contains("already exists"));
            })
            .run();
    }

    #[test]
    fn edit_changes_a_draft() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .given_action(register("m-1", "Tides"))
            .when_action(ManuscriptAction::EditManuscript {
                manuscript_id: m1(),
                title: "Tides, revised".to_string(),
                content: "New text.".to_string(),
            })
            .then_state(|state| {
                let manuscript = state.get(&m1()).unwrap();
                assert_eq!(manuscript.title, "Tides, revised");
                assert_eq!(manuscript.content, "New text.");
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_event_types(effects),
                    vec!["ManuscriptEdited.v1".to_string()]
                );
            })
            .run();
    }

    #[test]
    fn edit_of_unknown_manuscript_is_rejected() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .when_action(ManuscriptAction::EditManuscript {
                manuscript_id: m1(),
                title: "Tides".to_string(),
                content: "Text".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.last_error.as_deref(), Some("Manuscript m-1 not found"));
            })
            .then_effects(|effects| assert!(assertions::published_events(effects).is_empty()))
            .run();
    }

    #[test]
    fn requested_manuscript_can_no_longer_be_edited() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .given_action(register("m-1", "Tides"))
            .given_action(ManuscriptAction::RequestPublishing { manuscript_id: m1() })
            .when_action(ManuscriptAction::EditManuscript {
                manuscript_id: m1(),
                title: "Tides".to_string(),
                content: "Sneaky change".to_string(),
            })
            .then_state(|state| {
                let manuscript = state.get(&m1()).unwrap();
                assert_eq!(manuscript.status, ManuscriptStatus::PublishingRequested);
                assert_eq!(manuscript.content, "Once upon a time.");
                assert!(state.last_error.as_deref().unwrap().contains("already requested"));
            })
            .run();
    }

    #[test]
    fn publishing_request_carries_the_full_text() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .given_action(register("m-1", "Tides"))
            .when_action(ManuscriptAction::RequestPublishing { manuscript_id: m1() })
            .then_state(|state| {
                assert_eq!(
                    state.get(&m1()).unwrap().status,
                    ManuscriptStatus::PublishingRequested
                );
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_events(effects),
                    vec![(
                        "manuscript-events".to_string(),
                        "PublishingRequested.v1".to_string()
                    )]
                );
            })
            .run();
    }

    #[test]
    fn publishing_request_for_unknown_manuscript_is_rejected() {
        ReducerTest::new(ManuscriptReducer::new())
            .with_env(env())
            .given_state(ManuscriptState::new())
            .when_action(ManuscriptAction::RequestPublishing { manuscript_id: m1() })
            .then_state(|state| assert!(state.last_error.is_some()))
            .then_effects(|effects| {
                assert_eq!(effects.len(), 1);
                assert!(assertions::published_events(effects).is_empty());
            })
            .run();
    }

    #[test]
    fn replaying_events_rebuilds_the_manuscript() {
        let mut state = ManuscriptState::new();
        let at = test_clock().now();
        let events = [
            ManuscriptEvent::ManuscriptRegistered {
                manuscript_id: m1(),
                title: "Tides".to_string(),
                content: "v1".to_string(),
                author_id: AuthorId::from("a-1"),
            },
            ManuscriptEvent::ManuscriptEdited {
                manuscript_id: m1(),
                title: "Tides".to_string(),
                content: "v2".to_string(),
                author_id: AuthorId::from("a-1"),
            },
            ManuscriptEvent::PublishingRequested {
                manuscript_id: m1(),
                title: "Tides".to_string(),
                content: "v2".to_string(),
                author_id: AuthorId::from("a-1"),
            },
        ];

        for event in &events {
            ManuscriptReducer::apply_event(&mut state, event, at);
        }

        let manuscript = state.get(&m1()).unwrap();
        assert_eq!(manuscript.content, "v2");
        assert_eq!(manuscript.status, ManuscriptStatus::PublishingRequested);
    }
}
