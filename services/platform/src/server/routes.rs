//! Router configuration.

use super::health::health_check;
use super::state::AppState;
use crate::api::{authors, manuscripts, readers, reviews};
use axum::{
    Router,
    routing::{get, post, put},
};
use bookpress_publishing::{Storage, document_router};
use tower_http::trace::TraceLayer;

/// Build the complete router: commands, document lookups and health.
pub fn build_router(state: AppState, storage: Storage) -> Router {
    let commands = Router::new()
        .route("/manuscripts", post(manuscripts::register_manuscript))
        .route("/manuscripts/:id", put(manuscripts::edit_manuscript))
        .route("/manuscripts/:id/publish", post(manuscripts::request_publishing))
        .route("/users", post(readers::register_user))
        .route("/users/:id/pass", post(readers::buy_pass))
        .route("/subscriptions", post(readers::apply_subscription))
        .route("/subscriptions/:id/cancel", post(readers::cancel_subscription))
        .route("/authors", post(authors::register_author))
        .route("/authors/:id/approve", post(authors::approve_author))
        .route("/authors/:id/disapprove", post(authors::disapprove_author))
        .route("/reviews", post(reviews::register_review))
        .route(
            "/reviews/:id",
            put(reviews::edit_review).delete(reviews::delete_review),
        )
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(commands)
        .merge(document_router(storage))
        .layer(TraceLayer::new_for_http())
}
