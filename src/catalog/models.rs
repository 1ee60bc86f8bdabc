use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Status shared by packages and package categories
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
pub enum CatalogStatus {
    Inactive = 0,
    #[default]
    Active = 1,
}

/// Database model for the package_categories table
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryModel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: CatalogStatus,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryModel {
    pub fn new(name: String, description: Option<String>, display_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            status: CatalogStatus::Active,
            display_order,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Database model for the packages table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageModel {
    pub id: Uuid,
    pub package_name: String,
    pub description: String,
    pub price: i64,
    pub duration_in_days: i32,
    pub features: Vec<String>,
    #[serde(rename = "category")]
    pub category_id: Uuid,
    pub status: CatalogStatus,
    pub display_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackageModel {
    pub fn is_active(&self) -> bool {
        self.status == CatalogStatus::Active
    }
}

/// Short package view embedded in orders and reviews
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub id: Uuid,
    pub package_name: String,
    pub price: i64,
    pub duration_in_days: i32,
}

impl From<&PackageModel> for PackageSummary {
    fn from(package: &PackageModel) -> Self {
        Self {
            id: package.id,
            package_name: package.package_name.clone(),
            price: package.price,
            duration_in_days: package.duration_in_days,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum PackageSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "packageName")]
    PackageName,
    #[strum(serialize = "price")]
    Price,
    #[strum(serialize = "durationInDays")]
    DurationInDays,
    #[strum(serialize = "displayOrder")]
    DisplayOrder,
}

impl PackageSortKey {
    pub fn column(self) -> &'static str {
        match self {
            PackageSortKey::CreatedAt => "created_at",
            PackageSortKey::PackageName => "package_name",
            PackageSortKey::Price => "price",
            PackageSortKey::DurationInDays => "duration_in_days",
            PackageSortKey::DisplayOrder => "display_order",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_package_serializes_category_id_as_category() {
        let now = Utc::now();
        let category_id = Uuid::new_v4();
        let package = PackageModel {
            id: Uuid::new_v4(),
            package_name: "Gold".into(),
            description: "All access".into(),
            price: 500_000,
            duration_in_days: 30,
            features: vec!["sauna".into()],
            category_id,
            status: CatalogStatus::Active,
            display_order: 1,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(&package).unwrap();
        assert_eq!(json["category"], category_id.to_string());
        assert_eq!(json["packageName"], "Gold");
        assert_eq!(json["durationInDays"], 30);
        assert_eq!(json["status"], "active");
    }

    #[test]
    fn test_sort_key_parsing() {
        assert_eq!(PackageSortKey::from_str("price").unwrap(), PackageSortKey::Price);
        assert!(PackageSortKey::from_str("color").is_err());
    }
}
