//! Point aggregate: sign-up credit and per-subscription charges.
//!
//! A charge happens in two steps. `SubscriptionApplied` prices the book
//! through the [`BookCatalog`], then `ChargeSubscription` deducts the price or
//! reports `OutOfPoint`, which the subscriber aggregate turns into
//! `SubscriptionFailed`.

use crate::catalog::BookCatalog;
use crate::publish::announce;
use bookpress_contracts::{
    BookId, PointEvent, SubscriptionEvent, SubscriptionId, UserEvent, UserId, topics,
};
use bookpress_core::event::Event;
use bookpress_core::event_bus::EventBus;
use bookpress_core::{SmallVec, async_effect, effect::Effect, reducer::Reducer, smallvec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Points credited on sign-up
pub const SIGN_UP_POINTS: u32 = 1000;

/// Price of a bestseller subscription
pub const BESTSELLER_PRICE: u32 = 1500;

/// Price of any other subscription
pub const STANDARD_PRICE: u32 = 1000;

/// Subscription price for a book
#[must_use]
pub const fn price(is_bestseller: bool) -> u32 {
    if is_bestseller {
        BESTSELLER_PRICE
    } else {
        STANDARD_PRICE
    }
}

/// A reader's point balance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointAccount {
    /// Owner
    pub user_id: UserId,
    /// Current balance
    pub balance: u32,
}

/// State of the point aggregate
#[derive(Clone, Debug, Default)]
pub struct PointState {
    /// Accounts by owner
    pub accounts: HashMap<UserId, PointAccount>,
}

impl PointState {
    /// Creates an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of `user_id`; readers without an account have none
    #[must_use]
    pub fn balance(&self, user_id: &UserId) -> u32 {
        self.accounts.get(user_id).map_or(0, |account| account.balance)
    }
}

/// Actions of the point aggregate
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PointAction {
    // Saga input
    /// A reader signed up
    UserRegistered {
        /// New reader
        user_id: UserId,
    },
    /// A reader subscribed to a book
    SubscriptionApplied {
        /// Subscription
        subscription_id: SubscriptionId,
        /// Book
        book_id: BookId,
        /// Reader
        user_id: UserId,
        /// Pass holders are not charged
        has_pass: bool,
    },

    // Internal
    /// Charge a priced subscription
    ChargeSubscription {
        /// Subscription
        subscription_id: SubscriptionId,
        /// Reader
        user_id: UserId,
        /// Price in points
        amount: u32,
    },

    // Outcomes
    /// A point event reached the bus
    EventPublished {
        /// User or subscription id the event is about
        subject: String,
        /// Event type tag
        event_type: String,
    },
    /// A point event could not be published
    PublicationFailed {
        /// User or subscription id the event is about
        subject: String,
        /// Bus error
        error: String,
    },
}

impl PointAction {
    /// Saga input for a user event
    #[must_use]
    pub fn from_user_event(event: UserEvent) -> Option<Self> {
        match event {
            UserEvent::UserRegistered { user_id, .. } => Some(Self::UserRegistered { user_id }),
            UserEvent::SubscriptionBought { .. } => None,
        }
    }

    /// Saga input for a subscription event
    #[must_use]
    pub fn from_subscription_event(event: SubscriptionEvent) -> Option<Self> {
        match event {
            SubscriptionEvent::SubscriptionApplied {
                subscription_id,
                book_id,
                user_id,
                has_pass,
                ..
            } => Some(Self::SubscriptionApplied {
                subscription_id,
                book_id,
                user_id,
                has_pass,
            }),
            SubscriptionEvent::SubscriptionFailed { .. }
            | SubscriptionEvent::SubscriptionCanceled { .. } => None,
        }
    }
}

/// Environment of the point aggregate
#[derive(Clone)]
pub struct PointEnvironment {
    /// Bestseller lookups
    pub catalog: Arc<dyn BookCatalog>,
    /// Bus for point events
    pub event_bus: Arc<dyn EventBus>,
}

impl PointEnvironment {
    /// Creates a new point environment
    #[must_use]
    pub fn new(catalog: Arc<dyn BookCatalog>, event_bus: Arc<dyn EventBus>) -> Self {
        Self { catalog, event_bus }
    }
}

/// Reducer of the point aggregate
#[derive(Clone, Debug, Default)]
pub struct PointReducer;

type Effects = SmallVec<[Effect<PointAction>; 4]>;

impl PointReducer {
    /// Creates a new point reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn announce(env: &PointEnvironment, event: &PointEvent, subject: String) -> Effects {
        let event_type = event.event_type().to_string();
        metrics::counter!("points.events", "type" => event_type.clone()).increment(1);

        let failed_subject = subject.clone();
        smallvec![announce(
            Arc::clone(&env.event_bus),
            topics::POINT_EVENTS,
            event,
            &subject.clone(),
            PointAction::EventPublished {
                subject,
                event_type,
            },
            move |error| PointAction::PublicationFailed {
                subject: failed_subject,
                error,
            },
        )]
    }

    fn price_subscription(
        subscription_id: SubscriptionId,
        book_id: BookId,
        user_id: UserId,
        env: &PointEnvironment,
    ) -> Effects {
        let catalog = Arc::clone(&env.catalog);
        smallvec![async_effect! {
            let is_bestseller = match catalog.is_bestseller(&book_id).await {
                Ok(is_bestseller) => is_bestseller,
                Err(error) => {
                    tracing::warn!(book_id = %book_id, error = %error, "Catalog lookup failed, using standard price");
                    false
                },
            };
            Some(PointAction::ChargeSubscription {
                subscription_id,
                user_id,
                amount: price(is_bestseller),
            })
        }]
    }
}

impl Reducer for PointReducer {
    type State = PointState;
    type Action = PointAction;
    type Environment = PointEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            PointAction::UserRegistered { user_id } => {
                if state.accounts.contains_key(&user_id) {
                    tracing::debug!(user_id = %user_id, "Sign-up points already credited");
                    return SmallVec::new();
                }
                state.accounts.insert(
                    user_id.clone(),
                    PointAccount {
                        user_id: user_id.clone(),
                        balance: SIGN_UP_POINTS,
                    },
                );
                tracing::info!(user_id = %user_id, balance = SIGN_UP_POINTS, "Sign-up points credited");
                let subject = user_id.to_string();
                let event = PointEvent::RegisterPointGained {
                    user_id,
                    balance: SIGN_UP_POINTS,
                };
                Self::announce(env, &event, subject)
            },

            PointAction::SubscriptionApplied {
                subscription_id,
                book_id,
                user_id,
                has_pass,
            } => {
                if has_pass {
                    tracing::debug!(subscription_id = %subscription_id, "Pass holder, no charge");
                    return SmallVec::new();
                }
                Self::price_subscription(subscription_id, book_id, user_id, env)
            },

            PointAction::ChargeSubscription {
                subscription_id,
                user_id,
                amount,
            } => {
                let subject = subscription_id.to_string();
                let balance = state.balance(&user_id);

                let Some(remaining) = balance.checked_sub(amount) else {
                    tracing::warn!(
                        user_id = %user_id,
                        subscription_id = %subscription_id,
                        required = amount,
                        balance,
                        "Out of points"
                    );
                    let event = PointEvent::OutOfPoint {
                        user_id,
                        subscription_id,
                        required: amount,
                        balance,
                    };
                    return Self::announce(env, &event, subject);
                };

                if let Some(account) = state.accounts.get_mut(&user_id) {
                    account.balance = remaining;
                }
                tracing::info!(user_id = %user_id, amount, balance = remaining, "Points charged");
                let event = PointEvent::PointDecreased {
                    user_id,
                    subscription_id,
                    amount,
                    balance: remaining,
                };
                Self::announce(env, &event, subject)
            },

            PointAction::EventPublished { .. } => SmallVec::new(),
            PointAction::PublicationFailed { subject, error } => {
                tracing::error!(subject = %subject, error = %error, "Point event was not published");
                SmallVec::new()
            },
        }
    }
}
