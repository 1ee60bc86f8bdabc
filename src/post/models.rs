use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::account::models::AccountSummary;

pub const MAX_TITLE_CHARS: usize = 200;
pub const DEFAULT_COVER_IMAGE: &str = "https://via.placeholder.com/1200x600.png?text=Gym+Article";

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PostStatus {
    #[default]
    Draft = 0,
    Published = 1,
}

/// Database model for the posts table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostModel {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    #[serde(rename = "author")]
    pub author_id: Uuid,
    pub status: PostStatus,
    pub slug: String,
    pub tags: Vec<String>,
    pub cover_image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lowercase, dash-separated form of a title. Characters other than ASCII
/// letters, digits, `_` and `-` are dropped.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().to_lowercase().chars() {
        if c.is_whitespace() || c == '-' {
            if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        } else if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        }
    }
    slug.trim_end_matches('-').to_string()
}

/// First of `base`, `base-1`, `base-2`, ... not in `taken`
pub fn unique_slug(base: &str, taken: &[String]) -> String {
    if !taken.iter().any(|s| s == base) {
        return base.to_string();
    }
    (1..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum PostSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "title")]
    Title,
}

impl PostSortKey {
    pub fn column(self) -> &'static str {
        match self {
            PostSortKey::CreatedAt => "created_at",
            PostSortKey::Title => "title",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostModel,
    pub author_info: Option<AccountSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Five Tips for Leg Day", "five-tips-for-leg-day")]
    #[case("  Cardio -- vs   Weights!  ", "cardio-vs-weights")]
    #[case("snake_case stays", "snake_case-stays")]
    #[case("---", "")]
    #[case("Giảm cân", "gim-cn")]
    fn test_slugify(#[case] title: &str, #[case] expected: &str) {
        assert_eq!(slugify(title), expected);
    }

    #[test]
    fn test_unique_slug_appends_counter() {
        let taken = vec!["leg-day".to_string(), "leg-day-1".to_string()];
        assert_eq!(unique_slug("leg-day", &taken), "leg-day-2");
        assert_eq!(unique_slug("arm-day", &taken), "arm-day");
    }
}
