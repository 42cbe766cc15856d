use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for registered users.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Identifier wrapper for marketplace posts.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PostId(pub String);

/// Identifier wrapper for post-completion reviews.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ReviewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a post trades skills for skills or pays for a gig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    Barter,
    Paid,
}

impl PostKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "barter" => Some(Self::Barter),
            "paid" => Some(Self::Paid),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PostKind::Barter => "barter",
            PostKind::Paid => "paid",
        }
    }
}

/// Fixed listing taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Academic,
    Design,
    Programming,
    Writing,
    Marketing,
    Photography,
    Music,
    Art,
    Tutoring,
    Consulting,
    Other,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Academic,
        Category::Design,
        Category::Programming,
        Category::Writing,
        Category::Marketing,
        Category::Photography,
        Category::Music,
        Category::Art,
        Category::Tutoring,
        Category::Consulting,
        Category::Other,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        let needle = raw.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|category| category.label() == needle)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Category::Academic => "academic",
            Category::Design => "design",
            Category::Programming => "programming",
            Category::Writing => "writing",
            Category::Marketing => "marketing",
            Category::Photography => "photography",
            Category::Music => "music",
            Category::Art => "art",
            Category::Tutoring => "tutoring",
            Category::Consulting => "consulting",
            Category::Other => "other",
        }
    }
}

/// Lifecycle status of a post.
///
/// `open -> in_progress -> completed`, with cancellation allowed from either
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Open,
    InProgress,
    Completed,
    Cancelled,
}

impl PostStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PostStatus::Open => "open",
            PostStatus::InProgress => "in_progress",
            PostStatus::Completed => "completed",
            PostStatus::Cancelled => "cancelled",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, PostStatus::Completed | PostStatus::Cancelled)
    }

    /// Whether the lifecycle permits moving from `self` to `next`.
    pub const fn can_transition_to(self, next: PostStatus) -> bool {
        matches!(
            (self, next),
            (PostStatus::Open, PostStatus::InProgress)
                | (PostStatus::Open, PostStatus::Cancelled)
                | (PostStatus::InProgress, PostStatus::Completed)
                | (PostStatus::InProgress, PostStatus::Cancelled)
        )
    }
}

impl fmt::Display for PostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Type-dependent terms; a post carries exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeTerms {
    Barter { offered_skills: Vec<String> },
    Paid { budget: u32, currency: String },
}

impl ExchangeTerms {
    pub const fn kind(&self) -> PostKind {
        match self {
            ExchangeTerms::Barter { .. } => PostKind::Barter,
            ExchangeTerms::Paid { .. } => PostKind::Paid,
        }
    }
}

/// A candidate's non-binding request to be selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interest {
    pub user: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Marketplace listing and its matching state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: UserId,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub skills: Vec<String>,
    pub location: String,
    pub terms: ExchangeTerms,
    pub images: Vec<String>,
    pub status: PostStatus,
    pub interested_users: Vec<Interest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_user: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Bumped by the store on every write; conditional writes compare against it.
    pub revision: u64,
}

impl Post {
    pub const fn kind(&self) -> PostKind {
        self.terms.kind()
    }

    pub fn has_interest_from(&self, user: &UserId) -> bool {
        self.interested_users
            .iter()
            .any(|interest| &interest.user == user)
    }

    pub fn is_participant(&self, user: &UserId) -> bool {
        &self.author == user || self.selected_user.as_ref() == Some(user)
    }

    /// The other participant relative to `user`, if `user` takes part at all.
    pub fn counterpart_of(&self, user: &UserId) -> Option<&UserId> {
        let selected = self.selected_user.as_ref()?;
        if &self.author == user {
            Some(selected)
        } else if selected == user {
            Some(&self.author)
        } else {
            None
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Cumulative reputation tier derived from completed exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Newbie,
    Helper,
    Expert,
    Superstar,
    Mentor,
}

impl Badge {
    const TIERS: [(u32, Badge); 5] = [
        (0, Badge::Newbie),
        (5, Badge::Helper),
        (15, Badge::Expert),
        (30, Badge::Superstar),
        (50, Badge::Mentor),
    ];

    /// Every badge whose threshold `completed_exchanges` has reached, lowest tier first.
    pub fn earned(completed_exchanges: u32) -> Vec<Badge> {
        Self::TIERS
            .iter()
            .filter(|(threshold, _)| completed_exchanges >= *threshold)
            .map(|(_, badge)| *badge)
            .collect()
    }

    pub const fn threshold(self) -> u32 {
        match self {
            Badge::Newbie => 0,
            Badge::Helper => 5,
            Badge::Expert => 15,
            Badge::Superstar => 30,
            Badge::Mentor => 50,
        }
    }
}

/// Identity store record. Reputation fields are derived and only change
/// through the lifecycle engine and the rating aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub skills: Vec<String>,
    pub location: String,
    pub rating: f64,
    pub total_ratings: u32,
    pub completed_exchanges: u32,
    pub badges: Vec<Badge>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id.clone(),
            name: self.name.clone(),
            skills: self.skills.clone(),
            location: self.location.clone(),
            rating: self.rating,
            total_ratings: self.total_ratings,
            completed_exchanges: self.completed_exchanges,
            badges: self.badges.clone(),
            member_since: self.created_at,
        }
    }
}

/// Public projection of a user; never exposes the email address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub skills: Vec<String>,
    pub location: String,
    pub rating: f64,
    pub total_ratings: u32,
    pub completed_exchanges: u32,
    pub badges: Vec<Badge>,
    pub member_since: DateTime<Utc>,
}

/// Optional per-aspect sub-scores, each 1-5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCategories {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeliness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professionalism: Option<u8>,
}

impl ReviewCategories {
    pub fn scores(&self) -> [(&'static str, Option<u8>); 4] {
        [
            ("communication", self.communication),
            ("quality", self.quality),
            ("timeliness", self.timeliness),
            ("professionalism", self.professionalism),
        ]
    }
}

/// Post-completion feedback from one participant about the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub reviewer: UserId,
    pub reviewee: UserId,
    pub post: PostId,
    pub rating: u8,
    pub comment: String,
    pub kind: PostKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<ReviewCategories>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Who gets `completed_exchanges` credit when a post completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditPolicy {
    /// Only the participant who did not trigger completion.
    #[default]
    Counterpart,
    /// Author and selected user alike.
    BothParticipants,
}

impl CreditPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "counterpart" => Some(Self::Counterpart),
            "both" | "both_participants" => Some(Self::BothParticipants),
            _ => None,
        }
    }
}

/// Signal consumed by the conversation gateway once a selection is made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub post_id: PostId,
    pub author: UserId,
    pub selected_user: UserId,
    pub selected_at: DateTime<Utc>,
}

/// 1-based page request with a bounded page size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl PageRequest {
    pub const MAX_LIMIT: usize = 100;

    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: Some(page),
            limit: Some(limit),
        }
    }

    /// Slice `items` according to the request, falling back to `default_limit`.
    pub fn paginate<T>(&self, items: Vec<T>, default_limit: usize) -> Page<T> {
        let limit = self
            .limit
            .unwrap_or(default_limit)
            .clamp(1, Self::MAX_LIMIT);
        let current = self.page.unwrap_or(1).max(1);
        let total = items.len();
        let pages = total.div_ceil(limit);
        let items = items
            .into_iter()
            .skip((current - 1).saturating_mul(limit))
            .take(limit)
            .collect();

        Page {
            items,
            current,
            pages,
            total,
        }
    }
}

/// One page of results plus the counters clients need for navigation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current: usize,
    pub pages: usize,
    pub total: usize,
}
