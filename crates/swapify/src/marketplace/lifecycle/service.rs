use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::validation::{self, PostChanges, PostDraft};
use crate::config::MarketplaceConfig;
use crate::marketplace::clock::Clock;
use crate::marketplace::domain::{
    Badge, CreditPolicy, ExchangeTerms, Interest, MatchEvent, Page, PageRequest, Post, PostId,
    PostStatus, User, UserId,
};
use crate::marketplace::error::MarketplaceError;
use crate::marketplace::repository::{
    MatchNotifier, PostRepository, RepositoryError, UserDirectory,
};

const DEFAULT_PAGE_SIZE: usize = 20;

static POST_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_post_id() -> PostId {
    let id = POST_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    PostId(format!("post-{id:06}"))
}

/// Result of completing a post: the post plus every user whose counter moved.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionOutcome {
    pub post: Post,
    pub credited: Vec<User>,
}

/// Owns post state transitions, interest registration, and selection.
pub struct PostLifecycleService<P, U, N> {
    posts: Arc<P>,
    users: Arc<U>,
    notifier: Arc<N>,
    clock: Arc<dyn Clock>,
    config: MarketplaceConfig,
}

impl<P, U, N> PostLifecycleService<P, U, N>
where
    P: PostRepository + 'static,
    U: UserDirectory + 'static,
    N: MatchNotifier + 'static,
{
    pub fn new(
        posts: Arc<P>,
        users: Arc<U>,
        notifier: Arc<N>,
        clock: Arc<dyn Clock>,
        config: MarketplaceConfig,
    ) -> Self {
        Self {
            posts,
            users,
            notifier,
            clock,
            config,
        }
    }

    /// Validate and persist a new open post expiring after the configured TTL.
    pub fn create(&self, author: &UserId, draft: PostDraft) -> Result<Post, MarketplaceError> {
        self.active_user(author)?;
        let valid = draft.validate(&self.config.default_currency)?;

        let now = self.clock.utc();
        let expires_at = self
            .config
            .post_ttl()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                MarketplaceError::Configuration(format!(
                    "post ttl of {} days overflows the expiry timestamp",
                    self.config.post_ttl_days
                ))
            })?;
        let post = Post {
            id: next_post_id(),
            author: author.clone(),
            title: valid.title,
            description: valid.description,
            category: valid.category,
            skills: valid.skills,
            location: valid.location,
            terms: valid.terms,
            images: valid.images,
            status: PostStatus::Open,
            interested_users: Vec::new(),
            selected_user: None,
            created_at: now,
            updated_at: now,
            expires_at,
            revision: 0,
        };

        let stored = self.posts.insert(post)?;
        info!(post_id = %stored.id, author = %author, kind = stored.kind().label(), "post created");
        Ok(stored)
    }

    pub fn get(&self, id: &PostId) -> Result<Post, MarketplaceError> {
        self.posts
            .fetch(id)?
            .ok_or_else(|| MarketplaceError::not_found(format!("post {id} not found")))
    }

    /// Open, unexpired posts, newest first.
    pub fn list_open(&self, request: PageRequest) -> Result<Page<Post>, MarketplaceError> {
        let now = self.clock.utc();
        let mut open = self
            .posts
            .scan(&|post: &Post| post.status == PostStatus::Open && !post.is_expired(now))?;
        open.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(request.paginate(open, DEFAULT_PAGE_SIZE))
    }

    pub fn express_interest(
        &self,
        post_id: &PostId,
        user: &UserId,
        message: Option<String>,
    ) -> Result<Post, MarketplaceError> {
        const ACTION: &str = "express interest";

        let message = validation::interest_message(message)?;
        self.active_user(user)?;
        let mut post = self.get(post_id)?;

        if &post.author == user {
            return Err(deny(ACTION, user, &post, "cannot express interest in your own post"));
        }
        require_status(&post, &[PostStatus::Open], ACTION)?;
        let now = self.clock.utc();
        if post.is_expired(now) {
            return Err(MarketplaceError::Expired {
                post_id: post.id.clone(),
            });
        }
        if post.has_interest_from(user) {
            return Err(MarketplaceError::conflict(
                "already expressed interest in this post",
            ));
        }

        let expected = post.revision;
        post.interested_users.push(Interest {
            user: user.clone(),
            message,
            created_at: now,
        });
        post.updated_at = now;

        let stored = self.commit(post, expected, &[PostStatus::Open], ACTION)?;
        info!(
            post_id = %stored.id,
            user = %user,
            interested = stored.interested_users.len(),
            "interest registered"
        );
        Ok(stored)
    }

    /// The author picks one interested user; the post leaves `open` for good.
    pub fn select_user(
        &self,
        post_id: &PostId,
        acting: &UserId,
        target: &UserId,
    ) -> Result<Post, MarketplaceError> {
        const ACTION: &str = "select a user";

        self.active_user(acting)?;
        let mut post = self.get(post_id)?;

        if &post.author != acting {
            return Err(deny(ACTION, acting, &post, "only the author can select a user"));
        }
        require_status(&post, &[PostStatus::Open], ACTION)?;
        if !post.has_interest_from(target) {
            return Err(MarketplaceError::validation(
                "user has not expressed interest in this post",
            ));
        }

        let expected = post.revision;
        let now = self.clock.utc();
        transition(&mut post, PostStatus::InProgress, ACTION)?;
        post.selected_user = Some(target.clone());
        post.updated_at = now;

        let stored = self.commit(post, expected, &[PostStatus::Open], ACTION)?;
        info!(post_id = %stored.id, selected = %target, "user selected");

        self.notifier.publish(MatchEvent {
            post_id: stored.id.clone(),
            author: stored.author.clone(),
            selected_user: target.clone(),
            selected_at: now,
        })?;

        Ok(stored)
    }

    /// Either participant marks the exchange done; credit follows the configured policy.
    pub fn complete(
        &self,
        post_id: &PostId,
        acting: &UserId,
    ) -> Result<CompletionOutcome, MarketplaceError> {
        const ACTION: &str = "complete";

        self.active_user(acting)?;
        let mut post = self.get(post_id)?;

        if !post.is_participant(acting) {
            return Err(deny(ACTION, acting, &post, "not authorized to complete this post"));
        }
        require_status(&post, &[PostStatus::InProgress], ACTION)?;

        let expected = post.revision;
        transition(&mut post, PostStatus::Completed, ACTION)?;
        post.updated_at = self.clock.utc();
        let stored = self.commit(post, expected, &[PostStatus::InProgress], ACTION)?;

        let beneficiaries: Vec<UserId> = match self.config.exchange_credit {
            CreditPolicy::Counterpart => stored.counterpart_of(acting).cloned().into_iter().collect(),
            CreditPolicy::BothParticipants => std::iter::once(stored.author.clone())
                .chain(stored.selected_user.clone())
                .collect(),
        };

        let mut credited = Vec::with_capacity(beneficiaries.len());
        for user_id in &beneficiaries {
            credited.push(self.credit_exchange(user_id)?);
        }

        info!(
            post_id = %stored.id,
            completed_by = %acting,
            credited = credited.len(),
            "post completed"
        );
        Ok(CompletionOutcome {
            post: stored,
            credited,
        })
    }

    /// Authors may cancel open or in-progress posts; the selected user may
    /// withdraw from an in-progress one.
    pub fn cancel(&self, post_id: &PostId, acting: &UserId) -> Result<Post, MarketplaceError> {
        const ACTION: &str = "cancel";

        self.active_user(acting)?;
        let mut post = self.get(post_id)?;

        let allowed: &[PostStatus] = if &post.author == acting {
            &[PostStatus::Open, PostStatus::InProgress]
        } else if post.selected_user.as_ref() == Some(acting) {
            &[PostStatus::InProgress]
        } else {
            return Err(deny(ACTION, acting, &post, "not authorized to cancel this post"));
        };
        require_status(&post, allowed, ACTION)?;

        let expected = post.revision;
        transition(&mut post, PostStatus::Cancelled, ACTION)?;
        post.updated_at = self.clock.utc();

        let stored = self.commit(post, expected, allowed, ACTION)?;
        info!(post_id = %stored.id, cancelled_by = %acting, "post cancelled");
        Ok(stored)
    }

    /// Apply allow-listed edits while the post is still open.
    pub fn update(
        &self,
        post_id: &PostId,
        acting: &UserId,
        changes: PostChanges,
    ) -> Result<Post, MarketplaceError> {
        const ACTION: &str = "update";

        self.active_user(acting)?;
        let mut post = self.get(post_id)?;

        if &post.author != acting {
            return Err(deny(ACTION, acting, &post, "not authorized to update this post"));
        }
        require_status(&post, &[PostStatus::Open], ACTION)?;

        let expected = post.revision;
        apply_changes(&mut post, changes)?;
        post.updated_at = self.clock.utc();

        let stored = self.commit(post, expected, &[PostStatus::Open], ACTION)?;
        info!(post_id = %stored.id, "post updated");
        Ok(stored)
    }

    /// Remove a post that never got (or no longer has) an active exchange.
    pub fn delete(&self, post_id: &PostId, acting: &UserId) -> Result<Post, MarketplaceError> {
        const ACTION: &str = "delete";
        const DELETABLE: &[PostStatus] = &[PostStatus::Open, PostStatus::Cancelled];

        self.active_user(acting)?;
        let post = self.get(post_id)?;

        if &post.author != acting {
            return Err(deny(ACTION, acting, &post, "not authorized to delete this post"));
        }
        require_status(&post, DELETABLE, ACTION)?;

        let removed = match self.posts.remove(&post.id, post.revision) {
            Ok(removed) => removed,
            Err(RepositoryError::Stale | RepositoryError::NotFound) => {
                return Err(self.classify_stale(&post.id, DELETABLE, ACTION));
            }
            Err(other) => return Err(other.into()),
        };
        info!(post_id = %removed.id, "post deleted");
        Ok(removed)
    }

    /// Drop open posts past their expiry. Triggered externally; the core runs no scheduler.
    pub fn purge_expired(&self) -> Result<Vec<PostId>, MarketplaceError> {
        let purged = self.posts.purge_expired(self.clock.utc())?;
        if !purged.is_empty() {
            info!(count = purged.len(), "expired posts purged");
        }
        Ok(purged)
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

    fn credit_exchange(&self, id: &UserId) -> Result<User, MarketplaceError> {
        let user = self.users.modify(id, &mut |user: &mut User| {
            user.completed_exchanges = user.completed_exchanges.saturating_add(1);
            user.badges = Badge::earned(user.completed_exchanges);
        })?;
        info!(
            user = %id,
            completed_exchanges = user.completed_exchanges,
            badges = user.badges.len(),
            "exchange credited"
        );
        Ok(user)
    }

    /// Conditional write: succeeds only if nobody touched the post since it was read.
    fn commit(
        &self,
        post: Post,
        expected_revision: u64,
        required: &[PostStatus],
        action: &'static str,
    ) -> Result<Post, MarketplaceError> {
        let id = post.id.clone();
        match self.posts.replace(post, expected_revision) {
            Ok(stored) => Ok(stored),
            Err(RepositoryError::Stale | RepositoryError::NotFound) => {
                Err(self.classify_stale(&id, required, action))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Explain a lost race from the post's current state.
    fn classify_stale(
        &self,
        id: &PostId,
        required: &[PostStatus],
        action: &'static str,
    ) -> MarketplaceError {
        match self.posts.fetch(id) {
            Ok(None) => MarketplaceError::not_found(format!("post {id} not found")),
            Ok(Some(current)) if !required.contains(&current.status) => {
                MarketplaceError::InvalidState {
                    action,
                    status: current.status,
                }
            }
            Ok(Some(_)) => MarketplaceError::conflict(format!(
                "post {id} was modified concurrently; reload and retry"
            )),
            Err(err) => err.into(),
        }
    }
}

fn require_status(
    post: &Post,
    allowed: &[PostStatus],
    action: &'static str,
) -> Result<(), MarketplaceError> {
    if allowed.contains(&post.status) {
        Ok(())
    } else {
        Err(MarketplaceError::InvalidState {
            action,
            status: post.status,
        })
    }
}

fn transition(
    post: &mut Post,
    next: PostStatus,
    action: &'static str,
) -> Result<(), MarketplaceError> {
    if !post.status.can_transition_to(next) {
        return Err(MarketplaceError::InvalidState {
            action,
            status: post.status,
        });
    }
    post.status = next;
    Ok(())
}

fn deny(action: &'static str, actor: &UserId, post: &Post, message: &str) -> MarketplaceError {
    warn!(action, actor = %actor, post_id = %post.id, "authorization denied");
    MarketplaceError::forbidden(message)
}

fn apply_changes(post: &mut Post, changes: PostChanges) -> Result<(), MarketplaceError> {
    let PostChanges {
        title,
        description,
        skills,
        location,
        budget,
        offered_skills,
        images,
    } = changes;

    if let Some(raw) = title {
        post.title = validation::title(&raw)?;
    }
    if let Some(raw) = description {
        post.description = validation::description(&raw)?;
    }
    if let Some(raw) = skills {
        post.skills = validation::skills(raw)?;
    }
    if let Some(raw) = location {
        post.location = validation::location(&raw)?;
    }
    if let Some(raw) = images {
        post.images = validation::clean_list(raw);
    }

    match (&mut post.terms, budget, offered_skills) {
        (_, None, None) => {}
        (ExchangeTerms::Paid { budget: current, .. }, Some(raw), None) => {
            *current = validation::budget(Some(raw))?;
        }
        (ExchangeTerms::Barter { offered_skills: current }, None, Some(raw)) => {
            *current = validation::offered_skills(Some(raw))?;
        }
        (ExchangeTerms::Paid { .. }, _, Some(_)) => {
            return Err(MarketplaceError::validation(
                "offered skills only apply to barter posts",
            ));
        }
        (ExchangeTerms::Barter { .. }, Some(_), _) => {
            return Err(MarketplaceError::validation(
                "budget only applies to paid posts",
            ));
        }
    }

    Ok(())
}
