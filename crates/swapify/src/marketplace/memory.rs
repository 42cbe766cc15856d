use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{MatchEvent, Post, PostId, PostStatus, Review, ReviewId, User, UserId};
use super::repository::{
    MatchNotifier, NotifyError, PostRepository, RepositoryError, ReviewRepository, UserDirectory,
};

/// Process-local store. Each collection sits behind its own mutex, which gives
/// the per-document atomicity the services rely on.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    posts: Arc<Mutex<HashMap<PostId, Post>>>,
    users: Arc<Mutex<HashMap<UserId, User>>>,
    reviews: Arc<Mutex<HashMap<ReviewId, Review>>>,
}

impl PostRepository for InMemoryStore {
    fn insert(&self, mut post: Post) -> Result<Post, RepositoryError> {
        let mut guard = self.posts.lock().expect("post mutex poisoned");
        if guard.contains_key(&post.id) {
            return Err(RepositoryError::Conflict);
        }
        post.revision = 0;
        guard.insert(post.id.clone(), post.clone());
        Ok(post)
    }

    fn fetch(&self, id: &PostId) -> Result<Option<Post>, RepositoryError> {
        let guard = self.posts.lock().expect("post mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn replace(&self, mut post: Post, expected_revision: u64) -> Result<Post, RepositoryError> {
        let mut guard = self.posts.lock().expect("post mutex poisoned");
        let stored = guard.get_mut(&post.id).ok_or(RepositoryError::NotFound)?;
        if stored.revision != expected_revision {
            return Err(RepositoryError::Stale);
        }
        post.revision = expected_revision + 1;
        *stored = post.clone();
        Ok(post)
    }

    fn remove(&self, id: &PostId, expected_revision: u64) -> Result<Post, RepositoryError> {
        let mut guard = self.posts.lock().expect("post mutex poisoned");
        match guard.get(id) {
            None => Err(RepositoryError::NotFound),
            Some(stored) if stored.revision != expected_revision => Err(RepositoryError::Stale),
            Some(_) => guard.remove(id).ok_or(RepositoryError::NotFound),
        }
    }

    fn scan(&self, filter: &dyn Fn(&Post) -> bool) -> Result<Vec<Post>, RepositoryError> {
        let guard = self.posts.lock().expect("post mutex poisoned");
        Ok(guard.values().filter(|post| filter(post)).cloned().collect())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> Result<Vec<PostId>, RepositoryError> {
        let mut guard = self.posts.lock().expect("post mutex poisoned");
        let mut expired: Vec<PostId> = guard
            .values()
            .filter(|post| post.status == PostStatus::Open && post.is_expired(now))
            .map(|post| post.id.clone())
            .collect();
        expired.sort();
        for id in &expired {
            guard.remove(id);
        }
        Ok(expired)
    }
}

impl UserDirectory for InMemoryStore {
    fn insert(&self, user: User) -> Result<User, RepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        let duplicate = guard.contains_key(&user.id)
            || guard.values().any(|existing| existing.email == user.email);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn fetch(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let guard = self.users.lock().expect("user mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn modify(
        &self,
        id: &UserId,
        change: &mut dyn FnMut(&mut User),
    ) -> Result<User, RepositoryError> {
        let mut guard = self.users.lock().expect("user mutex poisoned");
        let user = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        change(user);
        Ok(user.clone())
    }
}

impl ReviewRepository for InMemoryStore {
    fn insert(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.reviews.lock().expect("review mutex poisoned");
        let duplicate = guard.contains_key(&review.id)
            || guard
                .values()
                .any(|existing| existing.reviewer == review.reviewer && existing.post == review.post);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn fetch(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let guard = self.reviews.lock().expect("review mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn replace(&self, review: Review) -> Result<Review, RepositoryError> {
        let mut guard = self.reviews.lock().expect("review mutex poisoned");
        let stored = guard.get_mut(&review.id).ok_or(RepositoryError::NotFound)?;
        *stored = review.clone();
        Ok(review)
    }

    fn remove(&self, id: &ReviewId) -> Result<Option<Review>, RepositoryError> {
        let mut guard = self.reviews.lock().expect("review mutex poisoned");
        Ok(guard.remove(id))
    }

    fn for_reviewee(&self, reviewee: &UserId) -> Result<Vec<Review>, RepositoryError> {
        let guard = self.reviews.lock().expect("review mutex poisoned");
        Ok(guard
            .values()
            .filter(|review| &review.reviewee == reviewee)
            .cloned()
            .collect())
    }
}

/// Notifier that keeps every published event for later inspection.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<MatchEvent>>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

impl MatchNotifier for RecordingNotifier {
    fn publish(&self, event: MatchEvent) -> Result<(), NotifyError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(event);
        Ok(())
    }
}
