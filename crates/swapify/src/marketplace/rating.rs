use std::sync::Arc;

use tracing::info;

use super::domain::{Review, User, UserId};
use super::error::MarketplaceError;
use super::repository::{RepositoryError, ReviewRepository, UserDirectory};

/// Mean of `ratings` rounded half-up to one decimal place.
///
/// Integer arithmetic keeps the rounding exact: tenths = floor((20 * sum + n) / (2 * n)).
pub fn rounded_average(ratings: impl IntoIterator<Item = u8>) -> (f64, u32) {
    let (sum, count) = ratings
        .into_iter()
        .fold((0u64, 0u64), |(sum, count), rating| {
            (sum + u64::from(rating), count + 1)
        });
    if count == 0 {
        return (0.0, 0);
    }
    let tenths = (20 * sum + count) / (2 * count);
    (tenths as f64 / 10.0, u32::try_from(count).unwrap_or(u32::MAX))
}

/// Recomputes a reviewee's cached rating from the full review set.
///
/// The review set is queried inside the user's atomic update, so the last
/// writer always sees every review inserted before it took the record.
pub struct RatingAggregator<R, U> {
    reviews: Arc<R>,
    users: Arc<U>,
}

impl<R, U> RatingAggregator<R, U>
where
    R: ReviewRepository + 'static,
    U: UserDirectory + 'static,
{
    pub fn new(reviews: Arc<R>, users: Arc<U>) -> Self {
        Self { reviews, users }
    }

    pub fn recompute(&self, reviewee: &UserId) -> Result<User, MarketplaceError> {
        let mut query: Result<(), RepositoryError> = Ok(());
        let user = self.users.modify(reviewee, &mut |user: &mut User| {
            match self.reviews.for_reviewee(&user.id) {
                Ok(reviews) => {
                    let (rating, total) =
                        rounded_average(reviews.iter().map(|review: &Review| review.rating));
                    user.rating = rating;
                    user.total_ratings = total;
                }
                Err(err) => query = Err(err),
            }
        })?;
        query?;

        info!(
            user = %reviewee,
            rating = user.rating,
            total_ratings = user.total_ratings,
            "rating recomputed"
        );
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::rounded_average;

    #[test]
    fn averages_round_half_up() {
        assert_eq!(rounded_average([5, 3]), (4.0, 2));
        assert_eq!(rounded_average([5, 4, 4]), (4.3, 3));
        // 4.25 -> 4.3
        assert_eq!(rounded_average([5, 5, 4, 3]), (4.3, 4));
        // 4.75 -> 4.8
        assert_eq!(rounded_average([5, 5, 5, 4]), (4.8, 4));
        // 1.666.. -> 1.7
        assert_eq!(rounded_average([1, 2, 2]), (1.7, 3));
    }

    #[test]
    fn no_reviews_means_zero() {
        assert_eq!(rounded_average(Vec::new()), (0.0, 0));
    }
}
