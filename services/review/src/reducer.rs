//! Review reducer.

use crate::types::{Review, ReviewAction, ReviewError, ReviewState};
use bookpress_contracts::{ReviewEvent, ReviewId, UserId, envelope, topics};
use bookpress_core::environment::Clock;
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::{SmallVec, effect::Effect, publish_event, reducer::Reducer, smallvec};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Environment of the review reducer
#[derive(Clone)]
pub struct ReviewEnvironment {
    /// Clock for change timestamps
    pub clock: Arc<dyn Clock>,
    /// Bus for review events
    pub event_bus: Arc<dyn EventBus>,
}

impl ReviewEnvironment {
    /// Creates a new review environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { clock, event_bus }
    }
}

/// Reducer of the review aggregate
#[derive(Clone, Debug, Default)]
pub struct ReviewReducer;

impl ReviewReducer {
    /// Creates a new review reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    ///
    /// Deleted reviews leave the state entirely.
    pub fn apply_event(state: &mut ReviewState, event: &ReviewEvent, at: DateTime<Utc>) {
        match event {
            ReviewEvent::ReviewRegistered {
                review_id,
                book_id,
                user_id,
                content,
            } => {
                state.reviews.insert(
                    review_id.clone(),
                    Review {
                        id: review_id.clone(),
                        book_id: book_id.clone(),
                        user_id: user_id.clone(),
                        content: content.clone(),
                        updated_at: at,
                    },
                );
            },
            ReviewEvent::ReviewEdited {
                review_id, content, ..
            } => {
                if let Some(review) = state.reviews.get_mut(review_id) {
                    review.content.clone_from(content);
                    review.updated_at = at;
                }
            },
            ReviewEvent::ReviewDeleted { review_id, .. } => {
                state.reviews.remove(review_id);
            },
        }
        state.last_error = None;
    }

    /// The review, if `user_id` wrote it
    fn owned_review<'a>(
        state: &'a ReviewState,
        review_id: &ReviewId,
        user_id: &UserId,
    ) -> Result<&'a Review, ReviewError> {
        let review = state
            .get(review_id)
            .ok_or_else(|| ReviewError::NotFound(review_id.clone()))?;
        if &review.user_id != user_id {
            return Err(ReviewError::NotReviewer {
                review_id: review_id.clone(),
                user_id: user_id.clone(),
            });
        }
        Ok(review)
    }

    fn reject(
        state: &mut ReviewState,
        review_id: ReviewId,
        error: &ReviewError,
    ) -> SmallVec<[Effect<ReviewAction>; 4]> {
        tracing::warn!(review_id = %review_id, error = %error, "Review command rejected");
        state.last_error = Some(error.to_string());
        smallvec![Effect::emit(ReviewAction::ValidationFailed {
            review_id,
            error: error.to_string(),
        })]
    }

    fn commit(
        state: &mut ReviewState,
        event: ReviewEvent,
        env: &ReviewEnvironment,
    ) -> SmallVec<[Effect<ReviewAction>; 4]> {
        Self::apply_event(state, &event, env.clock.now());

        let review_id = match &event {
            ReviewEvent::ReviewRegistered { review_id, .. }
            | ReviewEvent::ReviewEdited { review_id, .. }
            | ReviewEvent::ReviewDeleted { review_id, .. } => review_id.clone(),
        };
        let event_type = event.event_type().to_string();
        tracing::info!(review_id = %review_id, event_type = %event_type, "Review changed");
        metrics::counter!("review.events", "type" => event_type.clone()).increment(1);

        let serialized = match envelope(&event, review_id.as_str()) {
            Ok(serialized) => serialized,
            Err(error) => {
                return smallvec![Effect::emit(ReviewAction::PublicationFailed {
                    review_id,
                    error: error.to_string(),
                })];
            },
        };

        let failed_id = review_id.clone();
        smallvec![publish_event! {
            bus: env.event_bus,
            topic: topics::REVIEW_EVENTS,
            event: serialized,
            on_success: || Some(ReviewAction::EventPublished { review_id, event_type }),
            on_error: |error| Some(ReviewAction::PublicationFailed {
                review_id: failed_id,
                error: error.to_string(),
            })
        }]
    }
}

impl Reducer for ReviewReducer {
    type State = ReviewState;
    type Action = ReviewAction;
    type Environment = ReviewEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            ReviewAction::RegisterReview {
                review_id,
                book_id,
                user_id,
                content,
            } => {
                if content.trim().is_empty() {
                    return Self::reject(state, review_id, &ReviewError::BlankContent);
                }
                if state.reviews.contains_key(&review_id) {
                    let error = ReviewError::AlreadyExists(review_id.clone());
                    return Self::reject(state, review_id, &error);
                }
                let event = ReviewEvent::ReviewRegistered {
                    review_id,
                    book_id,
                    user_id,
                    content,
                };
                Self::commit(state, event, env)
            },

            ReviewAction::EditReview {
                review_id,
                user_id,
                content,
            } => {
                let book_id = match Self::owned_review(state, &review_id, &user_id) {
                    Ok(review) => review.book_id.clone(),
                    Err(error) => return Self::reject(state, review_id, &error),
                };
                if content.trim().is_empty() {
                    return Self::reject(state, review_id, &ReviewError::BlankContent);
                }
                let event = ReviewEvent::ReviewEdited {
                    review_id,
                    book_id,
                    user_id,
                    content,
                };
                Self::commit(state, event, env)
            },

            ReviewAction::DeleteReview { review_id, user_id } => {
                let book_id = match Self::owned_review(state, &review_id, &user_id) {
                    Ok(review) => review.book_id.clone(),
                    Err(error) => return Self::reject(state, review_id, &error),
                };
                let event = ReviewEvent::ReviewDeleted {
                    review_id,
                    book_id,
                    user_id,
                };
                Self::commit(state, event, env)
            },

            // ========== Outcomes ==========
            ReviewAction::ValidationFailed { .. } | ReviewAction::EventPublished { .. } => {
                SmallVec::new()
            },

            ReviewAction::PublicationFailed { review_id, error } => {
                tracing::error!(review_id = %review_id, error = %error, "Review event was not published");
                metrics::counter!("review.events.publish_failed").increment(1);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use bookpress_contracts::BookId;
    use bookpress_testing::{InMemoryEventBus, ReducerTest, assertions, test_clock};

    fn env() -> ReviewEnvironment {
        ReviewEnvironment::new(Arc::new(test_clock()), Arc::new(InMemoryEventBus::new()))
    }

    fn r1() -> ReviewId {
        ReviewId::from("r-1")
    }

    fn reader() -> UserId {
        UserId::from("u-1")
    }

    fn register(content: &str) -> ReviewAction {
        ReviewAction::RegisterReview {
            review_id: r1(),
            book_id: BookId::from("b-1"),
            user_id: reader(),
            content: content.to_string(),
        }
    }

    #[test]
    fn review_is_registered_and_published() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .when_action(register("Loved the ending."))
            .then_state(|state| {
                let review = state.get(&r1()).unwrap();
                assert_eq!(review.content, "Loved the ending.");
                assert_eq!(state.for_book(&BookId::from("b-1")).len(), 1);
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_events(effects),
                    vec![("review-events".to_string(), "ReviewRegistered.v1".to_string())]
                );
            })
            .run();
    }

    #[test]
    fn blank_review_is_rejected() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .when_action(register("  \n"))
            .then_state(|state| {
                assert!(state.reviews.is_empty());
                assert_eq!(state.last_error.as_deref(), Some("Review content cannot be empty"));
            })
            .then_effects(|effects| {
                assert!(assertions::published_events(effects).is_empty());
                assertions::assert_has_future_effect(effects);
            })
            .run();
    }

    #[test]
    fn duplicate_review_id_is_rejected() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("First take."))
            .when_action(register("Second take."))
            .then_state(|state| {
                assert_eq!(state.get(&r1()).unwrap().content, "First take.");
                assert!(state.last_error.as_deref().unwrap().contains("already exists"));
            })
            .run();
    }

    #[test]
    fn reviewer_can_edit() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("Good."))
            .when_action(ReviewAction::EditReview {
                review_id: r1(),
                user_id: reader(),
                content: "Better on a second read.".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.get(&r1()).unwrap().content, "Better on a second read.");
            })
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_event_types(effects),
                    vec!["ReviewEdited.v1".to_string()]
                );
            })
            .run();
    }

    #[test]
    fn other_readers_cannot_edit_or_delete() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("Good."))
            .when_action(ReviewAction::EditReview {
                review_id: r1(),
                user_id: UserId::from("u-2"),
                content: "Vandalized".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.get(&r1()).unwrap().content, "Good.");
                assert_eq!(
                    state.last_error.as_deref(),
                    Some("Review r-1 was not written by u-2")
                );
            })
            .then_effects(|effects| assert!(assertions::published_events(effects).is_empty()))
            .run();

        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("Good."))
            .when_action(ReviewAction::DeleteReview {
                review_id: r1(),
                user_id: UserId::from("u-2"),
            })
            .then_state(|state| assert!(state.get(&r1()).is_some()))
            .run();
    }

    #[test]
    fn reviewer_can_delete() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("Good."))
            .when_action(ReviewAction::DeleteReview {
                review_id: r1(),
                user_id: reader(),
            })
            .then_state(|state| assert!(state.reviews.is_empty()))
            .then_effects(|effects| {
                assert_eq!(
                    assertions::published_event_types(effects),
                    vec!["ReviewDeleted.v1".to_string()]
                );
            })
            .run();
    }

    #[test]
    fn editing_a_deleted_review_is_rejected() {
        ReducerTest::new(ReviewReducer::new())
            .with_env(env())
            .given_state(ReviewState::new())
            .given_action(register("Good."))
            .given_action(ReviewAction::DeleteReview {
                review_id: r1(),
                user_id: reader(),
            })
            .when_action(ReviewAction::EditReview {
                review_id: r1(),
                user_id: reader(),
                content: "Back again".to_string(),
            })
            .then_state(|state| {
                assert_eq!(state.last_error.as_deref(), Some("Review r-1 not found"));
            })
            .run();
    }
}
