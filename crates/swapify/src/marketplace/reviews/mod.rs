//! Review subsystem: one review per participant per completed post.

mod service;
pub mod validation;

pub use service::{ReviewService, ReviewStats};
pub use validation::{ReviewChanges, ReviewDraft};
