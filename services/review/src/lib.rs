//! # BookPress Reviews
//!
//! Review aggregate. Readers write, edit and delete reviews of published
//! books; every change is announced on `review-events`. Only the reviewer can
//! change or remove a review.
//!
//! ```text
//! RegisterReview ─▶ ReviewRegistered.v1
//! EditReview     ─▶ ReviewEdited.v1
//! DeleteReview   ─▶ ReviewDeleted.v1
//! ```

pub mod reducer;
pub mod types;

pub use reducer::{ReviewEnvironment, ReviewReducer};
pub use types::{Review, ReviewAction, ReviewError, ReviewState};
