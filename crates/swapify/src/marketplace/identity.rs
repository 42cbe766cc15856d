use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::clock::Clock;
use super::domain::{Badge, Post, PostStatus, User, UserId, UserProfile};
use super::error::MarketplaceError;
use super::lifecycle::validation::clean_list;
use super::repository::{PostRepository, RepositoryError, ReviewRepository, UserDirectory};

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 50;

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("usr-{id:06}"))
}

/// Registration payload handed over by the (external) auth layer.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: String,
}

/// Activity summary for a profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_reviews: usize,
    pub average_rating: f64,
    pub posts_created: usize,
    pub posts_completed: usize,
    pub completion_rate: f64,
}

/// Front door to the identity store.
pub struct IdentityService<U, P, R> {
    users: Arc<U>,
    posts: Arc<P>,
    reviews: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<U, P, R> IdentityService<U, P, R>
where
    U: UserDirectory + 'static,
    P: PostRepository + 'static,
    R: ReviewRepository + 'static,
{
    pub fn new(users: Arc<U>, posts: Arc<P>, reviews: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            posts,
            reviews,
            clock,
        }
    }

    pub fn register(&self, new_user: NewUser) -> Result<User, MarketplaceError> {
        let name = new_user.name.trim().to_string();
        let name_len = name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&name_len) {
            return Err(MarketplaceError::validation(format!(
                "name must be {NAME_MIN}-{NAME_MAX} characters"
            )));
        }

        let email = new_user.email.trim().to_ascii_lowercase();
        if !is_plausible_email(&email) {
            return Err(MarketplaceError::validation("please enter a valid email"));
        }

        let user = User {
            id: next_user_id(),
            name,
            email,
            skills: clean_list(new_user.skills),
            location: new_user.location.trim().to_string(),
            rating: 0.0,
            total_ratings: 0,
            completed_exchanges: 0,
            badges: Badge::earned(0),
            active: true,
            created_at: self.clock.utc(),
        };

        let stored = self.users.insert(user).map_err(|err| match err {
            RepositoryError::Conflict => MarketplaceError::conflict("email is already registered"),
            other => other.into(),
        })?;

        info!(user_id = %stored.id, "user registered");
        Ok(stored)
    }

    pub fn user(&self, id: &UserId) -> Result<User, MarketplaceError> {
        self.users
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found(format!("user {id} not found")))
    }

    pub fn profile(&self, id: &UserId) -> Result<UserProfile, MarketplaceError> {
        Ok(self.user(id)?.profile())
    }

    /// Flip the active flag; inactive users cannot start lifecycle or review operations.
    pub fn set_active(&self, id: &UserId, active: bool) -> Result<User, MarketplaceError> {
        let updated = self
            .users
            .modify(id, &mut |user: &mut User| user.active = active)
            .map_err(|err| match err {
                RepositoryError::NotFound => {
                    MarketplaceError::not_found(format!("user {id} not found"))
                }
                other => other.into(),
            })?;
        info!(user_id = %id, active, "user activation changed");
        Ok(updated)
    }

    pub fn stats(&self, id: &UserId) -> Result<UserStats, MarketplaceError> {
        self.user(id)?;

        let reviews = self.reviews.for_reviewee(id)?;
        let posts_created = self
            .posts
            .scan(&|post: &Post| &post.author == id)?
            .len();
        let posts_completed = self
            .posts
            .scan(&|post: &Post| {
                post.status == PostStatus::Completed && post.selected_user.as_ref() == Some(id)
            })?
            .len();

        let average_rating = if reviews.is_empty() {
            0.0
        } else {
            let sum: u32 = reviews.iter().map(|review| u32::from(review.rating)).sum();
            f64::from(sum) / reviews.len() as f64
        };
        let completion_rate = if posts_created == 0 {
            0.0
        } else {
            posts_completed as f64 / posts_created as f64 * 100.0
        };

        Ok(UserStats {
            total_reviews: reviews.len(),
            average_rating,
            posts_created,
            posts_completed,
            completion_rate,
        })
    }
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'));

    let labels: Vec<&str> = domain.split('.').collect();
    let domain_ok = labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
        && labels
            .last()
            .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    local_ok && domain_ok
}

#[cfg(test)]
mod tests {
    use super::is_plausible_email;

    #[test]
    fn email_shape_check() {
        assert!(is_plausible_email("asha.k+swap@example.co.in"));
        assert!(!is_plausible_email("asha@localhost"));
        assert!(!is_plausible_email("@example.com"));
        assert!(!is_plausible_email("asha@@example.com"));
        assert!(!is_plausible_email("asha@example.c0m"));
    }
}
