//! Post lifecycle engine: creation, interest, selection, completion, and the
//! author-side edits that are only legal while a post is still open.

mod service;
pub mod validation;

pub use service::{CompletionOutcome, PostLifecycleService};
pub use validation::{PostChanges, PostDraft};
