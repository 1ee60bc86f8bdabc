use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::account::models::AccountSummary;
use crate::catalog::models::PackageSummary;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

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
pub enum ReviewStatus {
    #[default]
    Pending = 0,
    Approved = 1,
    Rejected = 2,
}

/// Database model for package_reviews table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewModel {
    pub id: Uuid,
    #[serde(rename = "package")]
    pub package_id: Uuid,
    #[serde(rename = "client")]
    pub client_id: Uuid,
    pub rating: i16,
    pub comment: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReviewModel {
    /// New reviews wait for moderation
    pub fn new(package_id: Uuid, client_id: Uuid, rating: i16, comment: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            package_id,
            client_id,
            rating,
            comment,
            status: ReviewStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Validates a 1..=5 rating
pub fn check_rating(rating: Option<i64>) -> Option<i16> {
    rating
        .filter(|r| (MIN_RATING..=MAX_RATING).contains(r))
        .and_then(|r| i16::try_from(r).ok())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum ReviewSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "rating")]
    Rating,
}

impl ReviewSortKey {
    pub fn column(self) -> &'static str {
        match self {
            ReviewSortKey::CreatedAt => "created_at",
            ReviewSortKey::Rating => "rating",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: ReviewModel,
    pub client_info: Option<AccountSummary>,
    pub package_info: Option<PackageSummary>,
}

/// Answer of check-review
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCheck {
    pub has_reviewed: bool,
    pub review: Option<ReviewModel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, None)]
    #[case(Some(0), None)]
    #[case(Some(1), Some(1))]
    #[case(Some(5), Some(5))]
    #[case(Some(6), None)]
    #[case(Some(-3), None)]
    fn test_rating_bounds(#[case] raw: Option<i64>, #[case] expected: Option<i16>) {
        assert_eq!(check_rating(raw), expected);
    }

    #[test]
    fn test_check_serializes_camel_case() {
        let json = serde_json::to_value(ReviewCheck {
            has_reviewed: false,
            review: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"hasReviewed": false, "review": null}));
    }
}
