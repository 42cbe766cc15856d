//! Skill-exchange marketplace core.
//!
//! Components, leaves first: the identity store contract, the rating
//! aggregator, the post lifecycle engine, and the review subsystem. Storage
//! and the chat gateway are reached through the traits in [`repository`].

pub mod clock;
pub mod domain;
pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod memory;
pub mod rating;
pub mod repository;
pub mod reviews;
pub mod router;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::config::MarketplaceConfig;

pub use clock::{Clock, DefaultClock, ManualClock};
pub use domain::{
    Badge, Category, CreditPolicy, ExchangeTerms, Interest, MatchEvent, Page, PageRequest, Post,
    PostId, PostKind, PostStatus, Review, ReviewCategories, ReviewId, User, UserId, UserProfile,
};
pub use error::{ErrorKind, MarketplaceError};
pub use identity::{IdentityService, NewUser, UserStats};
pub use lifecycle::{CompletionOutcome, PostChanges, PostDraft, PostLifecycleService};
pub use memory::{InMemoryStore, RecordingNotifier};
pub use rating::RatingAggregator;
pub use repository::{
    MarketplaceStore, MatchNotifier, NotifyError, PostRepository, RepositoryError,
    ReviewRepository, UserDirectory,
};
pub use reviews::{ReviewChanges, ReviewDraft, ReviewService, ReviewStats};
pub use router::marketplace_router;

/// The three services wired against one store.
pub struct Marketplace<S, N> {
    pub identity: IdentityService<S, S, S>,
    pub lifecycle: PostLifecycleService<S, S, N>,
    pub reviews: ReviewService<S, S, S>,
}

impl<S, N> Marketplace<S, N>
where
    S: MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        config: MarketplaceConfig,
    ) -> Self {
        Self {
            identity: IdentityService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                clock.clone(),
            ),
            lifecycle: PostLifecycleService::new(
                store.clone(),
                store.clone(),
                notifier,
                clock.clone(),
                config,
            ),
            reviews: ReviewService::new(store.clone(), store.clone(), store, clock),
        }
    }
}
