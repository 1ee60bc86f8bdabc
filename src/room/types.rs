use serde::Deserialize;

use crate::shared::nullable;

/// Body of add-room and update-room. On update only the present fields change;
/// an explicit `null` clears `description` or `image`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomRequest {
    pub name: Option<String>,
    pub capacity: Option<i32>,
    #[serde(deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(deserialize_with = "nullable")]
    pub image: Option<Option<String>>,
}
