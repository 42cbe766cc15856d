use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::validation::{self, ReviewChanges, ReviewDraft};
use crate::marketplace::clock::Clock;
use crate::marketplace::domain::{
    Page, PageRequest, PostStatus, Review, ReviewId, User, UserId,
};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::rating::RatingAggregator;
use crate::marketplace::repository::{
    PostRepository, RepositoryError, ReviewRepository, UserDirectory,
};

const DEFAULT_PAGE_SIZE: usize = 10;

static REVIEW_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_review_id() -> ReviewId {
    let id = REVIEW_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ReviewId(format!("rev-{id:06}"))
}

/// Distribution and per-aspect averages of a user's received reviews.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewStats {
    pub total_reviews: usize,
    pub average_rating: f64,
    pub rating_distribution: BTreeMap<u8, usize>,
    pub category_averages: BTreeMap<&'static str, f64>,
}

/// Validates and records post-completion feedback, then refreshes the
/// reviewee's aggregate rating.
pub struct ReviewService<P, R, U> {
    posts: Arc<P>,
    reviews: Arc<R>,
    users: Arc<U>,
    aggregator: RatingAggregator<R, U>,
    clock: Arc<dyn Clock>,
}

impl<P, R, U> ReviewService<P, R, U>
where
    P: PostRepository + 'static,
    R: ReviewRepository + 'static,
    U: UserDirectory + 'static,
{
    pub fn new(posts: Arc<P>, reviews: Arc<R>, users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        let aggregator = RatingAggregator::new(reviews.clone(), users.clone());
        Self {
            posts,
            reviews,
            users,
            aggregator,
            clock,
        }
    }

    pub fn create(
        &self,
        reviewer: &UserId,
        draft: ReviewDraft,
    ) -> Result<Review, MarketplaceError> {
        let rating = validation::rating(draft.rating)?;
        let comment = validation::comment(draft.comment)?;
        let kind = validation::kind(&draft.kind)?;
        let categories = validation::categories(draft.categories)?;
        let payment_amount = validation::payment_amount(kind, draft.payment_amount)?;

        self.active_user(reviewer)?;
        let post = self
            .posts
            .fetch(&draft.post)?
            .ok_or_else(|| MarketplaceError::not_found(format!("post {} not found", draft.post)))?;

        if !post.is_participant(reviewer) {
            warn!(reviewer = %reviewer, post_id = %post.id, "review by non-participant rejected");
            return Err(MarketplaceError::forbidden(
                "not authorized to review this post",
            ));
        }
        if post.status != PostStatus::Completed {
            return Err(MarketplaceError::InvalidState {
                action: "review",
                status: post.status,
            });
        }
        if post.counterpart_of(reviewer) != Some(&draft.reviewee) {
            return Err(MarketplaceError::validation("invalid reviewee"));
        }
        if kind != post.kind() {
            return Err(MarketplaceError::validation(format!(
                "review type must match the post type ({})",
                post.kind().label()
            )));
        }
        if self.users.fetch(&draft.reviewee)?.is_none() {
            return Err(MarketplaceError::not_found(format!(
                "user {} not found",
                draft.reviewee
            )));
        }

        let now = self.clock.utc();
        let review = Review {
            id: next_review_id(),
            reviewer: reviewer.clone(),
            reviewee: draft.reviewee,
            post: post.id,
            rating,
            comment,
            kind,
            payment_amount,
            categories,
            created_at: now,
            updated_at: now,
        };

        let stored = self.reviews.insert(review).map_err(|err| match err {
            RepositoryError::Conflict => MarketplaceError::conflict("already reviewed this post"),
            other => other.into(),
        })?;
        info!(
            review_id = %stored.id,
            reviewer = %stored.reviewer,
            reviewee = %stored.reviewee,
            rating = stored.rating,
            "review created"
        );

        self.aggregator.recompute(&stored.reviewee)?;
        Ok(stored)
    }

    /// Edit content fields; a changed rating refreshes the reviewee's aggregate.
    pub fn update(
        &self,
        review_id: &ReviewId,
        acting: &UserId,
        changes: ReviewChanges,
    ) -> Result<Review, MarketplaceError> {
        let mut review = self.owned_review(review_id, acting, "update")?;

        let previous_rating = review.rating;
        if let Some(value) = changes.rating {
            review.rating = validation::rating(value)?;
        }
        if let Some(raw) = changes.comment {
            review.comment = validation::comment(Some(raw))?;
        }
        if changes.categories.is_some() {
            review.categories = validation::categories(changes.categories)?;
        }
        if changes.payment_amount.is_some() {
            review.payment_amount =
                validation::payment_amount(review.kind, changes.payment_amount)?;
        }
        review.updated_at = self.clock.utc();

        let stored = self.reviews.replace(review).map_err(|err| match err {
            RepositoryError::NotFound => {
                MarketplaceError::not_found(format!("review {review_id} not found"))
            }
            other => other.into(),
        })?;
        info!(review_id = %stored.id, "review updated");

        if stored.rating != previous_rating {
            self.aggregator.recompute(&stored.reviewee)?;
        }
        Ok(stored)
    }

    pub fn delete(&self, review_id: &ReviewId, acting: &UserId) -> Result<Review, MarketplaceError> {
        let review = self.owned_review(review_id, acting, "delete")?;
        let removed = self
            .reviews
            .remove(&review.id)?
            .ok_or_else(|| MarketplaceError::not_found(format!("review {review_id} not found")))?;
        info!(review_id = %removed.id, "review deleted");

        self.aggregator.recompute(&removed.reviewee)?;
        Ok(removed)
    }

    /// Reviews received by `user`, newest first.
    pub fn reviews_for(
        &self,
        user: &UserId,
        request: PageRequest,
    ) -> Result<Page<Review>, MarketplaceError> {
        let mut reviews = self.reviews.for_reviewee(user)?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(request.paginate(reviews, DEFAULT_PAGE_SIZE))
    }

    pub fn stats(&self, user: &UserId) -> Result<ReviewStats, MarketplaceError> {
        let reviews = self.reviews.for_reviewee(user)?;

        let mut rating_distribution: BTreeMap<u8, usize> = (1..=5).map(|star| (star, 0)).collect();
        let mut sum = 0u32;
        let mut aspect_totals: BTreeMap<&'static str, (u32, u32)> = BTreeMap::new();

        for review in &reviews {
            sum += u32::from(review.rating);
            *rating_distribution.entry(review.rating).or_default() += 1;
            let Some(categories) = review.categories else {
                continue;
            };
            for (name, score) in categories.scores() {
                if let Some(score) = score {
                    let entry = aspect_totals.entry(name).or_default();
                    entry.0 += u32::from(score);
                    entry.1 += 1;
                }
            }
        }

        let average_rating = if reviews.is_empty() {
            0.0
        } else {
            f64::from(sum) / reviews.len() as f64
        };
        let category_averages = aspect_totals
            .into_iter()
            .map(|(name, (total, count))| (name, f64::from(total) / f64::from(count)))
            .collect();

        Ok(ReviewStats {
            total_reviews: reviews.len(),
            average_rating,
            rating_distribution,
            category_averages,
        })
    }

    fn owned_review(
        &self,
        review_id: &ReviewId,
        acting: &UserId,
        action: &'static str,
    ) -> Result<Review, MarketplaceError> {
        let review = self
            .reviews
            .fetch(review_id)?
            .ok_or_else(|| MarketplaceError::not_found(format!("review {review_id} not found")))?;
        if &review.reviewer != acting {
            warn!(action, actor = %acting, review_id = %review_id, "review ownership check failed");
            return Err(MarketplaceError::forbidden(format!(
                "not authorized to {action} this review"
            )));
        }
        Ok(review)
    }

    fn active_user(&self, id: &UserId) -> Result<User, MarketplaceError> {
        let user = self
            .users
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found(format!("user {id} not found")))?;
        if !user.active {
            warn!(user = %id, "inactive user rejected");
            return Err(MarketplaceError::forbidden("account is deactivated"));
        }
        Ok(user)
    }
}
