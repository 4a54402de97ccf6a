//! Command endpoints.
//!
//! Every endpoint sends one command to an aggregate store and waits for its
//! outcome action: the announced event (202), a rejection (422) or a bus
//! failure (503).

pub mod authors;
pub mod manuscripts;
pub mod readers;
pub mod reviews;

use axum::Json;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// Body of a 202 response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAccepted {
    /// Id of the aggregate the command was about
    pub id: String,
    /// Type tag of the announced event
    pub event_type: String,
}

/// Response of an accepted command
pub type Accepted = (StatusCode, Json<CommandAccepted>);

pub(crate) fn accepted(id: impl Into<String>, event_type: String) -> Accepted {
    metrics::counter!("http.commands.accepted", "type" => event_type.clone()).increment(1);
    (
        StatusCode::ACCEPTED,
        Json(CommandAccepted {
            id: id.into(),
            event_type,
        }),
    )
}
