use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{Display, EnumString};
use uuid::Uuid;

use crate::account::models::{AccountSummary, HealthInfo};

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
pub enum StudentStatus {
    Inactive = 0,
    #[default]
    Active = 1,
    Completed = 2,
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
pub enum ScheduleStatus {
    #[default]
    Scheduled = 0,
    Completed = 1,
    Cancelled = 2,
}

/// Enrolment of a client with a coach
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentModel {
    pub id: Uuid,
    #[serde(rename = "coach")]
    pub coach_id: Uuid,
    #[serde(rename = "client")]
    pub client_id: Uuid,
    pub enrollment_date: DateTime<Utc>,
    pub status: StudentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentModel {
    pub fn new(coach_id: Uuid, client_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            coach_id,
            client_id,
            enrollment_date: now,
            status: StudentStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One training session. Times are wall-clock `HH:MM` strings.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleModel {
    pub id: Uuid,
    #[serde(rename = "student")]
    pub student_id: Uuid,
    #[serde(rename = "coach")]
    pub coach_id: Uuid,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub notes: Option<String>,
    pub status: ScheduleStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parses `HH:MM` (24h)
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(raw, "%H:%M").ok()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum StudentSortKey {
    #[default]
    #[strum(serialize = "enrollmentDate")]
    EnrollmentDate,
    #[strum(serialize = "createdAt")]
    CreatedAt,
}

impl StudentSortKey {
    pub fn column(self) -> &'static str {
        match self {
            StudentSortKey::EnrollmentDate => "enrollment_date",
            StudentSortKey::CreatedAt => "created_at",
        }
    }
}

/// Client fields a coach sees for a student
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentClient {
    #[serde(flatten)]
    pub summary: AccountSummary,
    pub health_info: Option<HealthInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    #[serde(flatten)]
    pub student: StudentModel,
    pub client_info: Option<StudentClient>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleView {
    #[serde(flatten)]
    pub schedule: ScheduleModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_info: Option<AccountSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coach_info: Option<AccountSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("08:00", true)]
    #[case("23:59", true)]
    #[case("24:00", false)]
    #[case("8:00", false)]
    #[case("08:60", false)]
    #[case("0800", false)]
    fn test_parse_clock(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(parse_clock(raw).is_some(), valid);
    }

    #[test]
    fn test_new_student_is_active() {
        let student = StudentModel::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(student.status, StudentStatus::Active);
        let json = serde_json::to_value(&student).unwrap();
        assert_eq!(json["status"], "active");
        assert_eq!(json["coach"], student.coach_id.to_string());
    }
}
