use serde::Deserialize;

use super::models::HealthInfo;
use crate::shared::AppError;

/// Request payload for client self-registration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterClientRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub phone: String,
}

/// Request payload for creating a coach account (super admin)
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateCoachRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub specialty: Option<String>,
    pub experience: Option<i32>,
    pub bio: Option<String>,
}

/// Partial update of a client's own profile
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub fullname: Option<String>,
    pub phone: Option<String>,
    pub health_info: Option<HealthInfo>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Minimal shape check: one `@`, non-empty local part, dotted domain
pub(crate) fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid email address".to_string()))
    }
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
