//! HTTP server: router, shared state and error responses.

mod error;
mod health;
mod routes;
mod state;

pub use error::AppError;
pub use health::{HealthResponse, health_check};
pub use routes::build_router;
pub use state::{
    AppState, AuthorStore, PointStore, PublishingStore, ReviewStore, SubscriberStore, WritingStore,
};
