use chrono::{DateTime, Utc};

use super::domain::{MatchEvent, Post, PostId, Review, ReviewId, User, UserId};

/// Post storage with single-document atomic, revision-checked writes.
pub trait PostRepository: Send + Sync {
    fn insert(&self, post: Post) -> Result<Post, RepositoryError>;
    fn fetch(&self, id: &PostId) -> Result<Option<Post>, RepositoryError>;
    /// Replace the stored post only if its revision still equals `expected_revision`.
    /// The store bumps the revision and returns the persisted copy.
    fn replace(&self, post: Post, expected_revision: u64) -> Result<Post, RepositoryError>;
    /// Remove the post only if its revision still equals `expected_revision`.
    fn remove(&self, id: &PostId, expected_revision: u64) -> Result<Post, RepositoryError>;
    fn scan(&self, filter: &dyn Fn(&Post) -> bool) -> Result<Vec<Post>, RepositoryError>;
    /// Atomically drop open posts whose expiry is at or before `now`.
    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<PostId>, RepositoryError>;
}

/// Identity store: the leaf dependency every other component reads from.
pub trait UserDirectory: Send + Sync {
    /// Fails with `Conflict` when the id or the email is already registered.
    fn insert(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    /// Atomic read-modify-write of one user record.
    fn modify(
        &self,
        id: &UserId,
        change: &mut dyn FnMut(&mut User),
    ) -> Result<User, RepositoryError>;
}

/// Review storage; `(reviewer, post)` is unique.
pub trait ReviewRepository: Send + Sync {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError>;
    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn replace(&self, review: Review) -> Result<Review, RepositoryError>;
    fn remove(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError>;
    fn for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>, RepositoryError>;
}

/// One store backing all three collections.
pub trait MarketplaceStore: PostRepository + UserDirectory + ReviewRepository {}

impl<T> MarketplaceStore for T where T: PostRepository + UserDirectory + ReviewRepository {}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record was modified concurrently")]
    Stale,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook announcing that a post's participants may now talk.
pub trait MatchNotifier: Send + Sync {
    fn publish(&self, event: MatchEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("match notification transport unavailable: {0}")]
    Transport(String),
}
