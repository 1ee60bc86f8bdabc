use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

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
pub enum RoomStatus {
    #[default]
    Available = 0,
    Unavailable = 1,
    Maintenance = 2,
}

impl RoomStatus {
    /// Lock/unlock toggle; maintenance blocks it until lifted
    pub fn lock_toggle(self) -> Option<RoomStatus> {
        match self {
            RoomStatus::Available => Some(RoomStatus::Unavailable),
            RoomStatus::Unavailable => Some(RoomStatus::Available),
            RoomStatus::Maintenance => None,
        }
    }
}

/// Database model for rooms table
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomModel {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub capacity: i32,
    pub description: Option<String>,
    pub status: RoomStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RoomModel {
    /// Creates a new available room with a generated ID
    pub fn new(name: String, capacity: i32, description: Option<String>, image: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            image,
            capacity,
            description,
            status: RoomStatus::Available,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum RoomSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "name")]
    Name,
    #[strum(serialize = "capacity")]
    Capacity,
}

impl RoomSortKey {
    pub fn column(self) -> &'static str {
        match self {
            RoomSortKey::CreatedAt => "created_at",
            RoomSortKey::Name => "name",
            RoomSortKey::Capacity => "capacity",
        }
    }
}
