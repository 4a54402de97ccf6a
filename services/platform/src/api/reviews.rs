//! Review endpoints.

use super::{Accepted, accepted};
use crate::server::{AppError, AppState};
use axum::Json;
use axum::extract::{Path, State};
use bookpress_contracts::{BookId, ReviewId, UserId};
use bookpress_review::ReviewAction;
use serde::Deserialize;

/// Body of `POST /reviews`
#[derive(Debug, Deserialize)]
pub struct RegisterReviewRequest {
    /// Id to use; generated when absent
    pub review_id: Option<String>,
    /// Reviewed book
    pub book_id: String,
    /// Reviewer
    pub user_id: String,
    /// Review text
    pub content: String,
}

/// Body of `PUT /reviews/:id`
#[derive(Debug, Deserialize)]
pub struct EditReviewRequest {
    /// Reviewer
    pub user_id: String,
    /// New text
    pub content: String,
}

/// Body of `DELETE /reviews/:id`
#[derive(Debug, Deserialize)]
pub struct DeleteReviewRequest {
    /// Reviewer
    pub user_id: String,
}

async fn run(state: &AppState, id: ReviewId, action: ReviewAction) -> Result<Accepted, AppError> {
    let wanted = id.clone();
    let outcome = state
        .reviews
        .send_and_wait_for(action, move |a| a.is_outcome_for(&wanted), state.command_timeout)
        .await?;

    match outcome {
        ReviewAction::EventPublished { event_type, .. } => Ok(accepted(id.to_string(), event_type)),
        ReviewAction::ValidationFailed { error, .. } => Err(AppError::validation(error)),
        ReviewAction::PublicationFailed { error, .. } => Err(AppError::unavailable(error)),
        other => Err(AppError::internal(format!("Unexpected outcome {other:?}"))),
    }
}

async fn ensure_exists(state: &AppState, id: &ReviewId) -> Result<(), AppError> {
    if state.reviews.state(|s| s.get(id).is_some()).await {
        Ok(())
    } else {
        Err(AppError::not_found("Review", id))
    }
}

/// `POST /reviews`
///
/// # Errors
///
/// 422 for blank content or a taken id.
pub async fn register_review(
    State(state): State<AppState>,
    Json(request): Json<RegisterReviewRequest>,
) -> Result<Accepted, AppError> {
    let review_id = request.review_id.map_or_else(ReviewId::generate, ReviewId::new);
    let action = ReviewAction::RegisterReview {
        review_id: review_id.clone(),
        book_id: BookId::new(request.book_id),
        user_id: UserId::new(request.user_id),
        content: request.content,
    };
    run(&state, review_id, action).await
}

/// `PUT /reviews/:id`
///
/// # Errors
///
/// 404 for an unknown review, 422 for blank content or another reader.
pub async fn edit_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EditReviewRequest>,
) -> Result<Accepted, AppError> {
    let review_id = ReviewId::new(id);
    ensure_exists(&state, &review_id).await?;
    let action = ReviewAction::EditReview {
        review_id: review_id.clone(),
        user_id: UserId::new(request.user_id),
        content: request.content,
    };
    run(&state, review_id, action).await
}

/// `DELETE /reviews/:id`
///
/// # Errors
///
/// 404 for an unknown review, 422 when sent by another reader.
pub async fn delete_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<DeleteReviewRequest>,
) -> Result<Accepted, AppError> {
    let review_id = ReviewId::new(id);
    ensure_exists(&state, &review_id).await?;
    let action = ReviewAction::DeleteReview {
        review_id: review_id.clone(),
        user_id: UserId::new(request.user_id),
    };
    run(&state, review_id, action).await
}
