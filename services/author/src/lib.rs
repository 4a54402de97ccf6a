//! # BookPress Authors
//!
//! Author aggregate. Writers apply with a pen name, editors approve or
//! disapprove them, and every decision is announced on `author-events`.
//! Publishing only prints the names of approved authors.
//!
//! ```text
//! RegisterAuthor    ─▶ AuthorRegistered.v1
//! ApproveAuthor     ─▶ AuthorApproved.v1     (pending or disapproved authors)
//! DisapproveAuthor  ─▶ AuthorDisapproved.v1  (pending or approved authors)
//! ```

pub mod reducer;
pub mod types;

pub use reducer::{AuthorEnvironment, AuthorReducer};
pub use types::{Author, AuthorAction, AuthorError, AuthorState, AuthorStatus};
