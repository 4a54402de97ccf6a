//! Manuscript endpoints.

use super::{Accepted, accepted};
use crate::server::{AppError, AppState};
use axum::Json;
use axum::extract::{Path, State};
use bookpress_contracts::{AuthorId, ManuscriptId};
use bookpress_writing::ManuscriptAction;
use serde::Deserialize;

/// Body of `POST /manuscripts`
#[derive(Debug, Deserialize)]
pub struct RegisterManuscriptRequest {
    /// Id to use; generated when absent
    pub manuscript_id: Option<String>,
    /// Working title
    pub title: String,
    /// Full text
    pub content: String,
    /// Author
    pub author_id: String,
}

/// Body of `PUT /manuscripts/:id`
#[derive(Debug, Deserialize)]
pub struct EditManuscriptRequest {
    /// New title
    pub title: String,
    /// New text
    pub content: String,
}

async fn run(state: &AppState, id: ManuscriptId, action: ManuscriptAction) -> Result<Accepted, AppError> {
    let wanted = id.clone();
    let outcome = state
        .manuscripts
        .send_and_wait_for(action, move |a| a.is_outcome_for(&wanted), state.command_timeout)
        .await?;

    match outcome {
        ManuscriptAction::EventPublished { event_type, .. } => Ok(accepted(id.to_string(), event_type)),
        ManuscriptAction::ValidationFailed { error, .. } => Err(AppError::validation(error)),
        ManuscriptAction::PublicationFailed { error, .. } => Err(AppError::unavailable(error)),
        other => Err(AppError::internal(format!("Unexpected outcome {other:?}"))),
    }
}

async fn ensure_exists(state: &AppState, id: &ManuscriptId) -> Result<(), AppError> {
    let exists = state.manuscripts.state(|s| s.get(id).is_some()).await;
    if exists {
        Ok(())
    } else {
        Err(AppError::not_found("Manuscript", id))
    }
}

/// `POST /manuscripts`
///
/// # Errors
///
/// 422 for a blank title or a taken id, 503 if the event bus is down.
pub async fn register_manuscript(
    State(state): State<AppState>,
    Json(request): Json<RegisterManuscriptRequest>,
) -> Result<Accepted, AppError> {
    let manuscript_id = request
        .manuscript_id
        .map_or_else(ManuscriptId::generate, ManuscriptId::new);
    let action = ManuscriptAction::RegisterManuscript {
        manuscript_id: manuscript_id.clone(),
        title: request.title,
        content: request.content,
        author_id: AuthorId::new(request.author_id),
    };
    run(&state, manuscript_id, action).await
}

/// `PUT /manuscripts/:id`
///
/// # Errors
///
/// 404 for an unknown manuscript, 422 once publishing was requested.
pub async fn edit_manuscript(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EditManuscriptRequest>,
) -> Result<Accepted, AppError> {
    let manuscript_id = ManuscriptId::new(id);
    ensure_exists(&state, &manuscript_id).await?;
    let action = ManuscriptAction::EditManuscript {
        manuscript_id: manuscript_id.clone(),
        title: request.title,
        content: request.content,
    };
    run(&state, manuscript_id, action).await
}

/// `POST /manuscripts/:id/publish`
///
/// Accepted once `PublishingRequested` is on the bus; the book itself is
/// produced asynchronously.
///
/// # Errors
///
/// 404 for an unknown manuscript.
pub async fn request_publishing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Accepted, AppError> {
    let manuscript_id = ManuscriptId::new(id);
    ensure_exists(&state, &manuscript_id).await?;
    let action = ManuscriptAction::RequestPublishing {
        manuscript_id: manuscript_id.clone(),
    };
    run(&state, manuscript_id, action).await
}
