use serde::Deserialize;

use crate::marketplace::domain::{PostId, PostKind, ReviewCategories, UserId};
use crate::marketplace::error::MarketplaceError;

pub(crate) const COMMENT_MAX: usize = 500;

/// Inbound review payload; the reviewer comes from the request's actor.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub post: PostId,
    pub reviewee: UserId,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub categories: Option<ReviewCategories>,
    #[serde(default)]
    pub payment_amount: Option<u32>,
}

/// Editable review content. Reviewer, reviewee, and post are fixed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewChanges {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub categories: Option<ReviewCategories>,
    #[serde(default)]
    pub payment_amount: Option<u32>,
}

pub(crate) fn rating(value: u8) -> Result<u8, MarketplaceError> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(MarketplaceError::validation("rating must be between 1 and 5"))
    }
}

pub(crate) fn comment(raw: Option<String>) -> Result<String, MarketplaceError> {
    let comment = raw.unwrap_or_default().trim().to_string();
    if comment.chars().count() > COMMENT_MAX {
        return Err(MarketplaceError::validation(format!(
            "comment cannot exceed {COMMENT_MAX} characters"
        )));
    }
    Ok(comment)
}

pub(crate) fn kind(raw: &str) -> Result<PostKind, MarketplaceError> {
    PostKind::parse(raw).ok_or_else(|| MarketplaceError::validation("type must be barter or paid"))
}

pub(crate) fn categories(
    raw: Option<ReviewCategories>,
) -> Result<Option<ReviewCategories>, MarketplaceError> {
    let Some(categories) = raw else {
        return Ok(None);
    };
    for (name, score) in categories.scores() {
        if let Some(score) = score {
            if !(1..=5).contains(&score) {
                return Err(MarketplaceError::validation(format!(
                    "{name} score must be between 1 and 5"
                )));
            }
        }
    }
    Ok(Some(categories))
}

pub(crate) fn payment_amount(
    kind: PostKind,
    raw: Option<u32>,
) -> Result<Option<u32>, MarketplaceError> {
    match (kind, raw) {
        (PostKind::Barter, Some(_)) => Err(MarketplaceError::validation(
            "payment amount only applies to paid exchanges",
        )),
        (_, amount) => Ok(amount),
    }
}
