use super::common::*;

use crate::marketplace::domain::{PageRequest, PostKind, ReviewCategories};
use crate::marketplace::{ErrorKind, MarketplaceError, ReviewChanges};

#[test]
fn paid_exchange_reviews_update_both_aggregates() {
    let harness = harness();
    let (post, author, candidate) = harness.completed_post(paid_draft(1500));

    let mut from_author = review_draft(&post, &candidate, 5);
    from_author.payment_amount = Some(1500);
    let review = harness
        .market
        .reviews
        .create(&author, from_author)
        .expect("author reviews");
    assert_eq!(review.kind, PostKind::Paid);
    assert_eq!(review.payment_amount, Some(1500));

    harness
        .market
        .reviews
        .create(&candidate, review_draft(&post, &author, 4))
        .expect("candidate reviews");

    let candidate_user = harness.user(&candidate);
    assert_eq!(candidate_user.rating, 5.0);
    assert_eq!(candidate_user.total_ratings, 1);
    let author_user = harness.user(&author);
    assert_eq!(author_user.rating, 4.0);
    assert_eq!(author_user.total_ratings, 1);

    let err = harness
        .market
        .reviews
        .create(&author, review_draft(&post, &candidate, 3))
        .expect_err("second review");
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(harness.user(&candidate).total_ratings, 1);
}

#[test]
fn reviews_wait_for_completion() {
    let harness = harness();
    let (post, author, candidate) = harness.matched_post(barter_draft());

    let err = harness
        .market
        .reviews
        .create(&author, review_draft(&post, &candidate, 5))
        .expect_err("still in progress");

    assert!(matches!(err, MarketplaceError::InvalidState { .. }));
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn outsiders_cannot_review() {
    let harness = harness();
    let (post, _, candidate) = harness.completed_post(barter_draft());
    let outsider = harness.register("Omar Outsider");

    let err = harness
        .market
        .reviews
        .create(&outsider, review_draft(&post, &candidate, 1))
        .expect_err("outsider");
    assert_eq!(err.kind(), ErrorKind::Authorization);
}

#[test]
fn reviewee_must_be_the_counterpart() {
    let harness = harness();
    let (post, author, _) = harness.completed_post(barter_draft());
    let outsider = harness.register("Omar Outsider");

    let err = harness
        .market
        .reviews
        .create(&author, review_draft(&post, &author, 5))
        .expect_err("self review");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = harness
        .market
        .reviews
        .create(&author, review_draft(&post, &outsider, 5))
        .expect_err("third party");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn payload_rules_are_enforced() {
    let harness = harness();
    let (post, author, candidate) = harness.completed_post(barter_draft());

    let zero = review_draft(&post, &candidate, 0);
    let err = harness.market.reviews.create(&author, zero).expect_err("rating 0");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut wrong_type = review_draft(&post, &candidate, 4);
    wrong_type.kind = "paid".to_string();
    let err = harness
        .market
        .reviews
        .create(&author, wrong_type)
        .expect_err("type mismatch");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let mut payment = review_draft(&post, &candidate, 4);
    payment.payment_amount = Some(200);
    let err = harness
        .market
        .reviews
        .create(&author, payment)
        .expect_err("payment on barter");
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(harness.user(&candidate).total_ratings, 0);
}

#[test]
fn editing_and_deleting_reviews_refresh_the_aggregate() {
    let harness = harness();
    let (post, author, candidate) = harness.completed_post(barter_draft());
    let review = harness
        .market
        .reviews
        .create(&author, review_draft(&post, &candidate, 2))
        .expect("review");
    assert_eq!(harness.user(&candidate).rating, 2.0);

    let err = harness
        .market
        .reviews
        .update(
            &review.id,
            &candidate,
            ReviewChanges {
                rating: Some(5),
                ..ReviewChanges::default()
            },
        )
        .expect_err("not the reviewer");
    assert_eq!(err.kind(), ErrorKind::Authorization);

    let updated = harness
        .market
        .reviews
        .update(
            &review.id,
            &author,
            ReviewChanges {
                rating: Some(5),
                comment: Some("  Even better on reflection ".to_string()),
                ..ReviewChanges::default()
            },
        )
        .expect("update");
    assert_eq!(updated.comment, "Even better on reflection");
    assert_eq!(harness.user(&candidate).rating, 5.0);

    harness
        .market
        .reviews
        .delete(&review.id, &author)
        .expect("delete");
    let user = harness.user(&candidate);
    assert_eq!(user.rating, 0.0);
    assert_eq!(user.total_ratings, 0);

    let err = harness
        .market
        .reviews
        .delete(&review.id, &author)
        .expect_err("already deleted");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn listing_and_stats_cover_received_reviews() {
    let harness = harness();
    let author = harness.register("Asha Author");
    let candidate = harness.register("Chirag Candidate");

    for rating in [5u8, 3] {
        let post = harness.completed_between(&author, &candidate, barter_draft());
        let mut draft = review_draft(&post, &candidate, rating);
        draft.categories = Some(ReviewCategories {
            communication: Some(rating),
            quality: Some(4),
            ..ReviewCategories::default()
        });
        harness
            .market
            .reviews
            .create(&author, draft)
            .expect("review");
        harness.clock.advance(chrono::Duration::hours(1));
    }

    let page = harness
        .market
        .reviews
        .reviews_for(&candidate, PageRequest::default())
        .expect("reviews");
    assert_eq!(page.total, 2);
    assert_eq!(page.items[0].rating, 3);

    let stats = harness.market.reviews.stats(&candidate).expect("stats");
    assert_eq!(stats.total_reviews, 2);
    assert_eq!(stats.average_rating, 4.0);
    assert_eq!(stats.rating_distribution[&5], 1);
    assert_eq!(stats.rating_distribution[&3], 1);
    assert_eq!(stats.rating_distribution[&1], 0);
    assert_eq!(stats.category_averages["communication"], 4.0);
    assert_eq!(stats.category_averages["quality"], 4.0);
    assert!(!stats.category_averages.contains_key("timeliness"));
}

#[test]
fn out_of_range_sub_scores_are_rejected() {
    let harness = harness();
    let (post, author, candidate) = harness.completed_post(barter_draft());
    let mut draft = review_draft(&post, &candidate, 4);
    draft.categories = Some(ReviewCategories {
        professionalism: Some(0),
        ..ReviewCategories::default()
    });

    let err = harness
        .market
        .reviews
        .create(&author, draft)
        .expect_err("bad sub-score");
    assert_eq!(err.kind(), ErrorKind::Validation);
}
