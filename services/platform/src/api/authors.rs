//! Author registration and approval endpoints.

use super::{Accepted, accepted};
use crate::server::{AppError, AppState};
use axum::Json;
use axum::extract::{Path, State};
use bookpress_author::AuthorAction;
use bookpress_contracts::AuthorId;
use serde::Deserialize;

/// Body of `POST /authors`
#[derive(Debug, Deserialize)]
pub struct RegisterAuthorRequest {
    /// Id to use; generated when absent
    pub author_id: Option<String>,
    /// Contact email
    pub email: String,
    /// Pen name
    pub author_name: String,
    /// Short biography
    #[serde(default)]
    pub introduction: String,
    /// Previous works
    #[serde(default)]
    pub featured_works: String,
}

async fn run(state: &AppState, id: AuthorId, action: AuthorAction) -> Result<Accepted, AppError> {
    let wanted = id.clone();
    let outcome = state
        .authors
        .send_and_wait_for(action, move |a| a.is_outcome_for(&wanted), state.command_timeout)
        .await?;

    match outcome {
        AuthorAction::EventPublished { event_type, .. } => Ok(accepted(id.to_string(), event_type)),
        AuthorAction::ValidationFailed { error, .. } => Err(AppError::validation(error)),
        AuthorAction::PublicationFailed { error, .. } => Err(AppError::unavailable(error)),
        other => Err(AppError::internal(format!("Unexpected outcome {other:?}"))),
    }
}

async fn ensure_exists(state: &AppState, id: &AuthorId) -> Result<(), AppError> {
    if state.authors.state(|s| s.get(id).is_some()).await {
        Ok(())
    } else {
        Err(AppError::not_found("Author", id))
    }
}

/// `POST /authors`
///
/// # Errors
///
/// 422 for an invalid email, a blank name or a taken id.
pub async fn register_author(
    State(state): State<AppState>,
    Json(request): Json<RegisterAuthorRequest>,
) -> Result<Accepted, AppError> {
    let author_id = request.author_id.map_or_else(AuthorId::generate, AuthorId::new);
    let action = AuthorAction::RegisterAuthor {
        author_id: author_id.clone(),
        email: request.email,
        author_name: request.author_name,
        introduction: request.introduction,
        featured_works: request.featured_works,
    };
    run(&state, author_id, action).await
}

/// `POST /authors/:id/approve`
///
/// # Errors
///
/// 404 for an unknown author, 422 if already approved.
pub async fn approve_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, AppError> {
    let author_id = AuthorId::new(id);
    ensure_exists(&state, &author_id).await?;
    run(
        &state,
        author_id.clone(),
        AuthorAction::ApproveAuthor { author_id },
    )
    .await
}

/// `POST /authors/:id/disapprove`
///
/// # Errors
///
/// 404 for an unknown author, 422 if already disapproved.
pub async fn disapprove_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, AppError> {
    let author_id = AuthorId::new(id);
    ensure_exists(&state, &author_id).await?;
    run(
        &state,
        author_id.clone(),
        AuthorAction::DisapproveAuthor { author_id },
    )
    .await
}
