use serde::Deserialize;

use crate::marketplace::domain::{Category, ExchangeTerms, PostKind};
use crate::marketplace::error::MarketplaceError;

pub(crate) const TITLE_MIN: usize = 5;
pub(crate) const TITLE_MAX: usize = 100;
pub(crate) const DESCRIPTION_MIN: usize = 20;
pub(crate) const DESCRIPTION_MAX: usize = 1000;
pub(crate) const INTEREST_MESSAGE_MAX: usize = 200;

/// Inbound post payload. Kind and category stay loose strings so unknown
/// values surface as validation errors instead of decode failures.
#[derive(Debug, Clone, Deserialize)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub category: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub budget: Option<u32>,
    #[serde(default)]
    pub offered_skills: Option<Vec<String>>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Allow-listed mutable fields. Type, category, and author never change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub skills: Option<Vec<String>>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub budget: Option<u32>,
    #[serde(default)]
    pub offered_skills: Option<Vec<String>>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Draft fields after every rule has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValidatedDraft {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub skills: Vec<String>,
    pub location: String,
    pub terms: ExchangeTerms,
    pub images: Vec<String>,
}

impl PostDraft {
    pub(crate) fn validate(self, currency: &str) -> Result<ValidatedDraft, MarketplaceError> {
        let title = title(&self.title)?;
        let description = description(&self.description)?;
        let kind = PostKind::parse(&self.kind)
            .ok_or_else(|| MarketplaceError::validation("type must be barter or paid"))?;
        let category = Category::parse(&self.category)
            .ok_or_else(|| MarketplaceError::validation("invalid category"))?;
        let skills = skills(self.skills)?;
        let location = location(&self.location)?;

        let terms = match kind {
            PostKind::Paid => ExchangeTerms::Paid {
                budget: budget(self.budget)?,
                currency: currency.to_string(),
            },
            PostKind::Barter => ExchangeTerms::Barter {
                offered_skills: offered_skills(self.offered_skills)?,
            },
        };

        Ok(ValidatedDraft {
            title,
            description,
            category,
            skills,
            location,
            terms,
            images: clean_list(self.images),
        })
    }
}

pub(crate) fn title(raw: &str) -> Result<String, MarketplaceError> {
    let title = raw.trim();
    let len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&len) {
        return Err(MarketplaceError::validation(format!(
            "title must be {TITLE_MIN}-{TITLE_MAX} characters"
        )));
    }
    Ok(title.to_string())
}

pub(crate) fn description(raw: &str) -> Result<String, MarketplaceError> {
    let len = raw.chars().count();
    if !(DESCRIPTION_MIN..=DESCRIPTION_MAX).contains(&len) {
        return Err(MarketplaceError::validation(format!(
            "description must be {DESCRIPTION_MIN}-{DESCRIPTION_MAX} characters"
        )));
    }
    Ok(raw.to_string())
}

pub(crate) fn skills(raw: Vec<String>) -> Result<Vec<String>, MarketplaceError> {
    let skills = clean_list(raw);
    if skills.is_empty() {
        return Err(MarketplaceError::validation("at least one skill is required"));
    }
    Ok(skills)
}

pub(crate) fn offered_skills(raw: Option<Vec<String>>) -> Result<Vec<String>, MarketplaceError> {
    let offered = clean_list(raw.unwrap_or_default());
    if offered.is_empty() {
        return Err(MarketplaceError::validation(
            "offered skills are required for barter posts",
        ));
    }
    Ok(offered)
}

pub(crate) fn budget(raw: Option<u32>) -> Result<u32, MarketplaceError> {
    match raw {
        Some(budget) if budget > 0 => Ok(budget),
        _ => Err(MarketplaceError::validation(
            "budget is required for paid posts",
        )),
    }
}

pub(crate) fn location(raw: &str) -> Result<String, MarketplaceError> {
    let location = raw.trim();
    if location.is_empty() {
        return Err(MarketplaceError::validation("location is required"));
    }
    Ok(location.to_string())
}

pub(crate) fn interest_message(raw: Option<String>) -> Result<Option<String>, MarketplaceError> {
    let Some(message) = raw else {
        return Ok(None);
    };
    let message = message.trim();
    if message.chars().count() > INTEREST_MESSAGE_MAX {
        return Err(MarketplaceError::validation(format!(
            "interest message cannot exceed {INTEREST_MESSAGE_MAX} characters"
        )));
    }
    Ok((!message.is_empty()).then(|| message.to_string()))
}

/// Trim entries, drop blanks, and de-duplicate while keeping first-seen order.
pub(crate) fn clean_list(raw: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(raw.len());
    for entry in raw {
        let entry = entry.trim();
        if !entry.is_empty() && !cleaned.iter().any(|seen| seen == entry) {
            cleaned.push(entry.to_string());
        }
    }
    cleaned
}
