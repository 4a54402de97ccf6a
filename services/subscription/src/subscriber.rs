//! Subscriber aggregate: readers, their pass and their book subscriptions.
//!
//! Announces on `user-events` and `subscription-events`, and rolls back a
//! subscription when the point aggregate reports `OutOfPoint`.

use crate::publish::announce;
use bookpress_contracts::{
    BookId, PointEvent, SubscriptionEvent, SubscriptionId, UserEvent, UserId, topics,
};
use bookpress_core::environment::Clock;
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// State
// ============================================================================

/// A registered reader
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// User id
    pub user_id: UserId,
    /// Contact email
    pub email: String,
    /// Display name
    pub user_name: String,
    /// Holds the all-you-can-read pass
    pub has_pass: bool,
}

/// A reader's subscription to one book
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription id
    pub subscription_id: SubscriptionId,
    /// Book
    pub book_id: BookId,
    /// Reader
    pub user_id: UserId,
    /// Whether the reader may read the book
    pub active: bool,
    /// Window start, cleared on cancel or failure
    pub starts_at: Option<DateTime<Utc>>,
    /// Window end, cleared on cancel or failure
    pub ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    fn deactivate(&mut self) {
        self.active = false;
        self.starts_at = None;
        self.ends_at = None;
    }
}

/// State of the subscriber aggregate
#[derive(Clone, Debug, Default)]
pub struct SubscriberState {
    /// Readers by id
    pub subscribers: HashMap<UserId, Subscriber>,
    /// Subscriptions by id
    pub subscriptions: HashMap<SubscriptionId, Subscription>,
}

impl SubscriberState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Rejected subscriber command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    /// Email is blank or has no `@`
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    /// The user id is taken
    #[error("User {0} already exists")]
    UserExists(UserId),

    /// No such user
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// The subscription id is taken
    #[error("Subscription {0} already exists")]
    SubscriptionExists(SubscriptionId),

    /// No such subscription
    #[error("Subscription {0} not found")]
    SubscriptionNotFound(SubscriptionId),

    /// Nothing to cancel
    #[error("Subscription {0} is not active")]
    NotActive(SubscriptionId),
}

// ============================================================================
// Actions
// ============================================================================

/// Actions of the subscriber aggregate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubscriberAction {
    // Commands
    /// Sign a reader up
    RegisterUser {
        /// New user id
        user_id: UserId,
        /// Contact email
        email: String,
        /// Display name
        user_name: String,
    },
    /// Buy the all-you-can-read pass
    BuyPass {
        /// Buyer
        user_id: UserId,
    },
    /// Subscribe to a book for one month
    ApplySubscription {
        /// New subscription id
        subscription_id: SubscriptionId,
        /// Book
        book_id: BookId,
        /// Reader
        user_id: UserId,
    },
    /// Cancel a subscription
    CancelSubscription {
        /// Subscription id
        subscription_id: SubscriptionId,
    },

    // Saga input
    /// The point aggregate could not charge a subscription
    OutOfPoint {
        /// Subscription that could not be paid
        subscription_id: SubscriptionId,
    },

    // Outcomes
    /// The event of a command reached the bus
    EventPublished {
        /// User or subscription id the command was about
        subject: String,
        /// Event type tag
        event_type: String,
    },
    /// A command was rejected
    ValidationFailed {
        /// User or subscription id the command was about
        subject: String,
        /// Why
        error: String,
    },
    /// The event of an accepted command could not be published
    PublicationFailed {
        /// User or subscription id the command was about
        subject: String,
        /// Bus error
        error: String,
    },
}

impl SubscriberAction {
    /// Saga input for a point event, if the aggregate reacts to it
    #[must_use]
    pub fn from_point_event(event: PointEvent) -> Option<Self> {
        match event {
            PointEvent::OutOfPoint {
                subscription_id, ..
            } => Some(Self::OutOfPoint { subscription_id }),
            PointEvent::RegisterPointGained { .. } | PointEvent::PointDecreased { .. } => None,
        }
    }

    /// Whether this action ends the command about `subject`
    #[must_use]
    pub fn is_outcome_for(&self, subject: &str) -> bool {
        match self {
            Self::EventPublished { subject: s, .. }
            | Self::ValidationFailed { subject: s, .. }
            | Self::PublicationFailed { subject: s, .. } => s == subject,
            Self::RegisterUser { .. }
            | Self::BuyPass { .. }
            | Self::ApplySubscription { .. }
            | Self::CancelSubscription { .. }
            | Self::OutOfPoint { .. } => false,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment of the subscriber aggregate
#[derive(Clone)]
pub struct SubscriberEnvironment {
    /// Clock for subscription windows
    pub clock: Arc<dyn Clock>,
    /// Bus for user and subscription events
    pub event_bus: Arc<dyn EventBus>,
}

impl SubscriberEnvironment {
    /// Creates a new subscriber environment
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { clock, event_bus }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer of the subscriber aggregate
#[derive(Clone, Debug, Default)]
pub struct SubscriberReducer;

type Effects = SmallVec<[Effect<SubscriberAction>; 4]>;

impl SubscriberReducer {
    /// Creates a new subscriber reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reject(subject: String, error: &SubscriberError) -> Effects {
        tracing::warn!(subject = %subject, error = %error, "Subscriber command rejected");
        smallvec![Effect::emit(SubscriberAction::ValidationFailed {
            subject,
            error: error.to_string(),
        })]
    }

    fn announce<E: Event + Serialize>(
        env: &SubscriberEnvironment,
        topic: &str,
        event: &E,
        subject: String,
    ) -> Effects {
        let event_type = event.event_type().to_string();
        tracing::info!(subject = %subject, event_type = %event_type, "Subscriber changed");
        metrics::counter!("subscription.events", "type" => event_type.clone()).increment(1);

        let failed_subject = subject.clone();
        smallvec![announce(
            Arc::clone(&env.event_bus),
            topic,
            event,
            &subject.clone(),
            SubscriberAction::EventPublished {
                subject,
                event_type,
            },
            move |error| SubscriberAction::PublicationFailed {
                subject: failed_subject,
                error,
            },
        )]
    }

    fn register_user(
        state: &mut SubscriberState,
        user_id: UserId,
        email: String,
        user_name: String,
        env: &SubscriberEnvironment,
    ) -> Effects {
        let subject = user_id.to_string();
        if email.trim().is_empty() || !email.contains('@') {
            return Self::reject(subject, &SubscriberError::InvalidEmail(email));
        }
        if state.subscribers.contains_key(&user_id) {
            return Self::reject(subject, &SubscriberError::UserExists(user_id));
        }

        state.subscribers.insert(
            user_id.clone(),
            Subscriber {
                user_id: user_id.clone(),
                email: email.clone(),
                user_name: user_name.clone(),
                has_pass: false,
            },
        );
        let event = UserEvent::UserRegistered {
            user_id,
            email,
            user_name,
        };
        Self::announce(env, topics::USER_EVENTS, &event, subject)
    }

    fn buy_pass(state: &mut SubscriberState, user_id: UserId, env: &SubscriberEnvironment) -> Effects {
        let subject = user_id.to_string();
        let Some(subscriber) = state.subscribers.get_mut(&user_id) else {
            return Self::reject(subject, &SubscriberError::UserNotFound(user_id));
        };
        subscriber.has_pass = true;
        let event = UserEvent::SubscriptionBought { user_id };
        Self::announce(env, topics::USER_EVENTS, &event, subject)
    }

    fn apply_subscription(
        state: &mut SubscriberState,
        subscription_id: SubscriptionId,
        book_id: BookId,
        user_id: UserId,
        env: &SubscriberEnvironment,
    ) -> Effects {
        let subject = subscription_id.to_string();
        if state.subscriptions.contains_key(&subscription_id) {
            return Self::reject(subject, &SubscriberError::SubscriptionExists(subscription_id));
        }
        let Some(subscriber) = state.subscribers.get(&user_id) else {
            return Self::reject(subject, &SubscriberError::UserNotFound(user_id));
        };
        let has_pass = subscriber.has_pass;

        let starts_at = env.clock.now();
        let ends_at = starts_at
            .checked_add_months(Months::new(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        state.subscriptions.insert(
            subscription_id.clone(),
            Subscription {
                subscription_id: subscription_id.clone(),
                book_id: book_id.clone(),
                user_id: user_id.clone(),
                active: true,
                starts_at: Some(starts_at),
                ends_at: Some(ends_at),
            },
        );
        let event = SubscriptionEvent::SubscriptionApplied {
            subscription_id,
            book_id,
            user_id,
            has_pass,
            starts_at,
            ends_at,
        };
        Self::announce(env, topics::SUBSCRIPTION_EVENTS, &event, subject)
    }

    fn cancel_subscription(
        state: &mut SubscriberState,
        subscription_id: SubscriptionId,
        env: &SubscriberEnvironment,
    ) -> Effects {
        let subject = subscription_id.to_string();
        let Some(subscription) = state.subscriptions.get_mut(&subscription_id) else {
            return Self::reject(subject, &SubscriberError::SubscriptionNotFound(subscription_id));
        };
        if !subscription.active {
            return Self::reject(subject, &SubscriberError::NotActive(subscription_id));
        }

        subscription.deactivate();
        let event = SubscriptionEvent::SubscriptionCanceled {
            subscription_id,
            book_id: subscription.book_id.clone(),
            user_id: subscription.user_id.clone(),
        };
        Self::announce(env, topics::SUBSCRIPTION_EVENTS, &event, subject)
    }

    fn fail_subscription(
        state: &mut SubscriberState,
        subscription_id: SubscriptionId,
        env: &SubscriberEnvironment,
    ) -> Effects {
        let Some(subscription) = state.subscriptions.get_mut(&subscription_id) else {
            tracing::warn!(subscription_id = %subscription_id, "OutOfPoint for unknown subscription");
            return SmallVec::new();
        };

        subscription.deactivate();
        let subject = subscription_id.to_string();
        let event = SubscriptionEvent::SubscriptionFailed {
            subscription_id,
            book_id: subscription.book_id.clone(),
            user_id: subscription.user_id.clone(),
        };
        Self::announce(env, topics::SUBSCRIPTION_EVENTS, &event, subject)
    }
}

impl Reducer for SubscriberReducer {
    type State = SubscriberState;
    type Action = SubscriberAction;
    type Environment = SubscriberEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SubscriberAction::RegisterUser {
                user_id,
                email,
                user_name,
            } => Self::register_user(state, user_id, email, user_name, env),
            SubscriberAction::BuyPass { user_id } => Self::buy_pass(state, user_id, env),
            SubscriberAction::ApplySubscription {
                subscription_id,
                book_id,
                user_id,
            } => Self::apply_subscription(state, subscription_id, book_id, user_id, env),
            SubscriberAction::CancelSubscription { subscription_id } => {
                Self::cancel_subscription(state, subscription_id, env)
            },
            SubscriberAction::OutOfPoint { subscription_id } => {
                Self::fail_subscription(state, subscription_id, env)
            },
            SubscriberAction::EventPublished { .. } | SubscriberAction::ValidationFailed { .. } => {
                SmallVec::new()
            },
            SubscriberAction::PublicationFailed { subject, error } => {
                tracing::error!(subject = %subject, error = %error, "Subscriber event was not published");
                SmallVec::new()
            },
        }
    }
}
