//! File retrieval endpoints.
//!
//! # Routes
//!
//! - `GET /pdfs/:id` - stored PDF, else the text fallback
//! - `GET /books/status` - fixed liveness string
//! - `GET /books/:id` - HTML rendition

use crate::storage::Storage;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};

/// Body of `GET /books/status`
pub const STATUS_MESSAGE: &str = "Publishing service is running";

/// Router serving the documents under `storage`
pub fn document_router(storage: Storage) -> Router {
    Router::new()
        .route("/pdfs/:id", get(get_document))
        .route("/books/status", get(status))
        .route("/books/:id", get(get_html))
        .with_state(storage)
}

/// Serve `pdfs/{id}.pdf` inline, else `pdfs/{id}.txt`
pub async fn get_document(State(storage): State<Storage>, Path(id): Path<String>) -> Response {
    let Some((path, kind)) = storage.find_document(&id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, kind.content_type().to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("inline; filename=\"{id}.{}\"", kind.extension()),
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(path = %path.display(), error = %error, "Reading document failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Serve `web/{id}.html`
pub async fn get_html(State(storage): State<Storage>, Path(id): Path<String>) -> Response {
    let Some(path) = storage.find_html(&id).await else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read_to_string(&path).await {
        Ok(html) => axum::response::Html(html).into_response(),
        Err(error) => {
            tracing::error!(path = %path.display(), error = %error, "Reading HTML failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}

/// Fixed status string
#[allow(clippy::unused_async)]
pub async fn status() -> &'static str {
    STATUS_MESSAGE
}
