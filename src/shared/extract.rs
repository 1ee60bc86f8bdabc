use axum::{extract::rejection::JsonRejection, extract::FromRequest};
use serde::{Deserialize, Deserializer};
use tracing::debug;
use uuid::Uuid;

use super::AppError;

/// `Json<T>` whose rejections become `AppError::Validation` (400) instead of axum's 422
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ValidJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "Rejected request body");
        AppError::Validation(format!("Invalid request body: {}", rejection.body_text()))
    }
}

/// Parses a path id, reporting a malformed one as a validation error
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::Validation(format!("Invalid {what} id")))
}

/// Rejects a blank required text field
pub fn require(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} is required")));
    }
    Ok(())
}

/// For `Option<Option<T>>` fields with `#[serde(default)]`: an absent field
/// stays `None`, an explicit `null` becomes `Some(None)`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
