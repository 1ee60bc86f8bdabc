use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::account::models::AccountSummary;
use crate::catalog::models::PackageSummary;

pub const DEFAULT_PAYMENT_METHOD: &str = "Cash";

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
pub enum OrderStatus {
    #[default]
    Pending = 0,
    Completed = 1,
    Cancelled = 2,
}

impl OrderStatus {
    /// Completed and cancelled orders never change again
    pub fn is_terminal(self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

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
pub enum PaymentStatus {
    #[default]
    Pending = 0,
    Paid = 1,
    Failed = 2,
}

/// Database model for orders table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderModel {
    pub id: Uuid,
    #[serde(rename = "client")]
    pub client_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub total_amount: i64,
    pub status: OrderStatus,
    pub payment_method: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderModel {
    /// New pending order, payment pending
    pub fn new(client_id: Uuid, total_amount: i64, payment_method: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            order_date: now,
            total_amount,
            status: OrderStatus::Pending,
            payment_method,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One purchased package with the price and duration it was sold at
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    #[serde(rename = "order")]
    pub order_id: Uuid,
    #[serde(rename = "package")]
    pub package_id: Uuid,
    pub price_at_purchase: i64,
    pub duration_at_purchase: i32,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum OrderSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "orderDate")]
    OrderDate,
    #[strum(serialize = "totalAmount")]
    TotalAmount,
}

impl OrderSortKey {
    pub fn column(self) -> &'static str {
        match self {
            OrderSortKey::CreatedAt => "created_at",
            OrderSortKey::OrderDate => "order_date",
            OrderSortKey::TotalAmount => "total_amount",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineView {
    #[serde(flatten)]
    pub line: OrderLine,
    pub package_info: Option<PackageSummary>,
}

/// Order with its client and lines resolved
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: OrderModel,
    pub client_info: Option<AccountSummary>,
    pub lines: Vec<OrderLineView>,
}
