//! # BookPress Writing
//!
//! Manuscript aggregate. Authors register and edit drafts, then hand them to
//! publishing; every change is announced on `manuscript-events`.
//!
//! ```text
//! RegisterManuscript ─▶ ManuscriptRegistered.v1
//! EditManuscript     ─▶ ManuscriptEdited.v1      (drafts only)
//! RequestPublishing  ─▶ PublishingRequested.v1   (carries the full text)
//! ```

pub mod reducer;
pub mod types;

pub use reducer::{ManuscriptEnvironment, ManuscriptReducer};
pub use types::{Manuscript, ManuscriptAction, ManuscriptError, ManuscriptState, ManuscriptStatus};
