//! Reader, pass and subscription endpoints.

use super::{Accepted, accepted};
use crate::server::{AppError, AppState};
use axum::Json;
use axum::extract::{Path, State};
use bookpress_contracts::{BookId, SubscriptionId, UserId};
use bookpress_subscription::SubscriberAction;
use serde::Deserialize;

/// Body of `POST /users`
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    /// Id to use; generated when absent
    pub user_id: Option<String>,
    /// Contact email
    pub email: String,
    /// Display name
    pub user_name: String,
}

/// Body of `POST /subscriptions`
#[derive(Debug, Deserialize)]
pub struct ApplySubscriptionRequest {
    /// Id to use; generated when absent
    pub subscription_id: Option<String>,
    /// Book to read
    pub book_id: String,
    /// Reader
    pub user_id: String,
}

async fn run(state: &AppState, subject: String, action: SubscriberAction) -> Result<Accepted, AppError> {
    let wanted = subject.clone();
    let outcome = state
        .subscribers
        .send_and_wait_for(action, move |a| a.is_outcome_for(&wanted), state.command_timeout)
        .await?;

    match outcome {
        SubscriberAction::EventPublished { event_type, .. } => Ok(accepted(subject, event_type)),
        SubscriberAction::ValidationFailed { error, .. } => Err(AppError::validation(error)),
        SubscriberAction::PublicationFailed { error, .. } => Err(AppError::unavailable(error)),
        other => Err(AppError::internal(format!("Unexpected outcome {other:?}"))),
    }
}

/// `POST /users`
///
/// # Errors
///
/// 422 for an invalid email or a taken id.
pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Accepted, AppError> {
    let user_id = request.user_id.map_or_else(UserId::generate, UserId::new);
    let subject = user_id.to_string();
    let action = SubscriberAction::RegisterUser {
        user_id,
        email: request.email,
        user_name: request.user_name,
    };
    run(&state, subject, action).await
}

/// `POST /users/:id/pass`
///
/// # Errors
///
/// 404 for an unknown user.
pub async fn buy_pass(State(state): State<AppState>, Path(id): Path<String>) -> Result<Accepted, AppError> {
    let user_id = UserId::new(id);
    let exists = state
        .subscribers
        .state(|s| s.subscribers.contains_key(&user_id))
        .await;
    if !exists {
        return Err(AppError::not_found("User", &user_id));
    }
    let subject = user_id.to_string();
    run(&state, subject, SubscriberAction::BuyPass { user_id }).await
}

/// `POST /subscriptions`
///
/// Accepted once `SubscriptionApplied` is on the bus. Payment happens
/// afterwards; an unpaid subscription is failed by the point saga.
///
/// # Errors
///
/// 422 for an unknown reader or a taken id.
pub async fn apply_subscription(
    State(state): State<AppState>,
    Json(request): Json<ApplySubscriptionRequest>,
) -> Result<Accepted, AppError> {
    let subscription_id = request
        .subscription_id
        .map_or_else(SubscriptionId::generate, SubscriptionId::new);
    let subject = subscription_id.to_string();
    let action = SubscriberAction::ApplySubscription {
        subscription_id,
        book_id: BookId::new(request.book_id),
        user_id: UserId::new(request.user_id),
    };
    run(&state, subject, action).await
}

/// `POST /subscriptions/:id/cancel`
///
/// # Errors
///
/// 404 for an unknown subscription, 422 if it is not active.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, AppError> {
    let subscription_id = SubscriptionId::new(id);
    let exists = state
        .subscribers
        .state(|s| s.subscriptions.contains_key(&subscription_id))
        .await;
    if !exists {
        return Err(AppError::not_found("Subscription", &subscription_id));
    }
    let subject = subscription_id.to_string();
    run(
        &state,
        subject,
        SubscriberAction::CancelSubscription { subscription_id },
    )
    .await
}
