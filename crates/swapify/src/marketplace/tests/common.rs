use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::config::MarketplaceConfig;
use crate::marketplace::domain::{
    CreditPolicy, MatchEvent, Post, PostId, Review, ReviewId, User, UserId,
};
use crate::marketplace::repository::{
    MatchNotifier, NotifyError, PostRepository, RepositoryError, ReviewRepository, UserDirectory,
};
use crate::marketplace::{
    InMemoryStore, ManualClock, Marketplace, NewUser, PostDraft, RecordingNotifier, ReviewDraft,
};

pub(super) fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn config() -> MarketplaceConfig {
    MarketplaceConfig {
        post_ttl_days: 30,
        default_currency: "INR".to_string(),
        exchange_credit: CreditPolicy::Counterpart,
    }
}

/// A marketplace over an in-memory store with a hand-driven clock.
pub(super) struct Harness<S = InMemoryStore, N = RecordingNotifier> {
    pub store: Arc<S>,
    pub notifier: Arc<N>,
    pub clock: Arc<ManualClock>,
    pub market: Arc<Marketplace<S, N>>,
}

pub(super) fn harness() -> Harness {
    harness_with(config())
}

pub(super) fn harness_with(config: MarketplaceConfig) -> Harness {
    build(
        Arc::new(InMemoryStore::default()),
        Arc::new(RecordingNotifier::default()),
        config,
    )
}

pub(super) fn build<S, N>(store: Arc<S>, notifier: Arc<N>, config: MarketplaceConfig) -> Harness<S, N>
where
    S: crate::marketplace::MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    let clock = Arc::new(ManualClock::new(start_time()));
    let market = Arc::new(Marketplace::new(
        store.clone(),
        notifier.clone(),
        clock.clone(),
        config,
    ));
    Harness {
        store,
        notifier,
        clock,
        market,
    }
}

impl<S, N> Harness<S, N>
where
    S: crate::marketplace::MarketplaceStore + 'static,
    N: MatchNotifier + 'static,
{
    pub fn register(&self, name: &str) -> UserId {
        self.market
            .identity
            .register(new_user(name))
            .expect("registration succeeds")
            .id
    }

    pub fn user(&self, id: &UserId) -> User {
        self.market.identity.user(id).expect("user exists")
    }

    /// Author posts, candidate expresses interest, author selects the candidate.
    pub fn matched_post(&self, draft: PostDraft) -> (Post, UserId, UserId) {
        let author = self.register("Asha Author");
        let candidate = self.register("Chirag Candidate");
        let post = self.matched_between(&author, &candidate, draft);
        (post, author, candidate)
    }

    pub fn matched_between(&self, author: &UserId, candidate: &UserId, draft: PostDraft) -> Post {
        let post = self
            .market
            .lifecycle
            .create(author, draft)
            .expect("post created");
        self.market
            .lifecycle
            .express_interest(&post.id, candidate, Some("Happy to help".to_string()))
            .expect("interest registered");
        self.market
            .lifecycle
            .select_user(&post.id, author, candidate)
            .expect("candidate selected")
    }

    pub fn completed_post(&self, draft: PostDraft) -> (Post, UserId, UserId) {
        let author = self.register("Asha Author");
        let candidate = self.register("Chirag Candidate");
        let post = self.completed_between(&author, &candidate, draft);
        (post, author, candidate)
    }

    /// Matched and completed by the author, so the candidate gets the credit.
    pub fn completed_between(&self, author: &UserId, candidate: &UserId, draft: PostDraft) -> Post {
        let post = self.matched_between(author, candidate, draft);
        self.market
            .lifecycle
            .complete(&post.id, author)
            .expect("post completed")
            .post
    }
}

pub(super) fn new_user(name: &str) -> NewUser {
    let slug: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase();
    NewUser {
        name: name.to_string(),
        email: format!("{slug}@example.com"),
        skills: vec!["Design".to_string(), "React".to_string()],
        location: "Pune".to_string(),
    }
}

pub(super) fn barter_draft() -> PostDraft {
    PostDraft {
        title: "Swap React help for logo design".to_string(),
        description: "Looking for help with React hooks; I can design your logo in return."
            .to_string(),
        kind: "barter".to_string(),
        category: "programming".to_string(),
        skills: vec!["React".to_string()],
        location: "Pune".to_string(),
        budget: None,
        offered_skills: Some(vec!["Logo design".to_string()]),
        images: Vec::new(),
    }
}

pub(super) fn paid_draft(budget: u32) -> PostDraft {
    PostDraft {
        title: "Need a tutor for calculus".to_string(),
        description: "Two evening sessions per week covering integrals and series.".to_string(),
        kind: "paid".to_string(),
        category: "tutoring".to_string(),
        skills: vec!["Calculus".to_string()],
        location: "Bengaluru".to_string(),
        budget: Some(budget),
        offered_skills: None,
        images: Vec::new(),
    }
}

pub(super) fn review_draft(post: &Post, reviewee: &UserId, rating: u8) -> ReviewDraft {
    ReviewDraft {
        post: post.id.clone(),
        reviewee: reviewee.clone(),
        rating,
        comment: Some("Smooth exchange".to_string()),
        kind: post.kind().label().to_string(),
        categories: None,
        payment_amount: None,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).expect("json payload")
}

/// Notifier whose transport is always down.
#[derive(Default)]
pub(super) struct FailingNotifier;

impl MatchNotifier for FailingNotifier {
    fn publish(&self, _event: MatchEvent) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("chat gateway offline".to_string()))
    }
}

type Race = Box<dyn FnOnce(&InMemoryStore) + Send>;

/// Store that lets a competing writer slip in between a service's read and
/// its conditional write or user update.
#[derive(Default)]
pub(super) struct RacingStore {
    pub inner: InMemoryStore,
    race: Mutex<Option<Race>>,
}

impl RacingStore {
    pub fn arm(&self, race: impl FnOnce(&InMemoryStore) + Send + 'static) {
        *self.race.lock().expect("race mutex poisoned") = Some(Box::new(race));
    }

    fn fire(&self) {
        let race = self.race.lock().expect("race mutex poisoned").take();
        if let Some(race) = race {
            race(&self.inner);
        }
    }
}

impl PostRepository for RacingStore {
    fn insert(&self, post: Post) -> Result<Post, RepositoryError> {
        PostRepository::insert(&self.inner, post)
    }

    fn fetch(&self, id: &PostId) -> Result<Option<Post>, RepositoryError> {
        PostRepository::fetch(&self.inner, id)
    }

    fn replace(&self, post: Post, expected_revision: u64) -> Result<Post, RepositoryError> {
        self.fire();
        PostRepository::replace(&self.inner, post, expected_revision)
    }

    fn remove(&self, id: &PostId, expected_revision: u64) -> Result<Post, RepositoryError> {
        self.fire();
        PostRepository::remove(&self.inner, id, expected_revision)
    }

    fn scan(&self, filter: &dyn Fn(&Post) -> bool) -> Result<Vec<Post>, RepositoryError> {
        self.inner.scan(filter)
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<PostId>, RepositoryError> {
        self.inner.purge_expired(now)
    }
}

impl UserDirectory for RacingStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        UserDirectory::insert(&self.inner, user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        UserDirectory::fetch(&self.inner, id)
    }

    fn modify(
        &self,
        id: &UserId,
        change: &mut dyn FnMut(&mut User),
    ) -> Result<User, RepositoryError> {
        self.fire();
        self.inner.modify(id, change)
    }
}

impl ReviewRepository for RacingStore {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        ReviewRepository::insert(&self.inner, review)
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        ReviewRepository::fetch(&self.inner, id)
    }

    fn replace(&self, review: Review) -> Result<Review, RepositoryError> {
        ReviewRepository::replace(&self.inner, review)
    }

    fn remove(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        ReviewRepository::remove(&self.inner, id)
    }

    fn for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>, RepositoryError> {
        self.inner.for_reviewee(reviewee)
    }
}

/// Store whose backend is unreachable.
pub(super) struct UnavailableStore;

fn unavailable() -> RepositoryError {
    RepositoryError::Unavailable("document store timed out".to_string())
}

impl PostRepository for UnavailableStore {
    fn insert(&self, _post: Post) -> Result<Post, RepositoryError> {
        Err(unavailable())
    }

    fn fetch(&self, _id: &PostId) -> Result<Option<Post>, RepositoryError> {
        Err(unavailable())
    }

    fn replace(&self, _post: Post, _expected_revision: u64) -> Result<Post, RepositoryError> {
        Err(unavailable())
    }

    fn remove(&self, _id: &PostId, _expected_revision: u64) -> Result<Post, RepositoryError> {
        Err(unavailable())
    }

    fn scan(&self, _filter: &dyn Fn(&Post) -> bool) -> Result<Vec<Post>, RepositoryError> {
        Err(unavailable())
    }

    fn purge_expired(&self, _now: DateTime<Utc>) -> Result<Vec<PostId>, RepositoryError> {
        Err(unavailable())
    }
}

impl UserDirectory for UnavailableStore {
    fn insert(&self, _user: User) -> Result<User, RepositoryError> {
        Err(unavailable())
    }

    fn fetch(&self, _id: &UserId) -> Result<Option<User>, RepositoryError> {
        Err(unavailable())
    }

    fn modify(
        &self,
        _id: &UserId,
        _change: &mut dyn FnMut(&mut User),
    ) -> Result<User, RepositoryError> {
        Err(unavailable())
    }
}

impl ReviewRepository for UnavailableStore {
    fn insert(&self, _review: Review) -> Result<Review, RepositoryError> {
        Err(unavailable())
    }

    fn fetch(&self, _id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Err(unavailable())
    }

    fn replace(&self, _review: Review) -> Result<Review, RepositoryError> {
        Err(unavailable())
    }

    fn remove(&self, _id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        Err(unavailable())
    }

    fn for_reviewee(&self, _reviewee: &UserId) -> Result<Vec<Review>, RepositoryError> {
        Err(unavailable())
    }
}
