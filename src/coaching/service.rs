use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{
        parse_clock, ScheduleModel, ScheduleStatus, ScheduleView, StudentClient, StudentModel,
        StudentStatus, StudentView,
    },
    repository::{CoachingRepository, EnrollResult, StudentFilter},
    types::AddScheduleRequest,
};
use crate::account::{
    models::{AccountProfile, AccountSummary},
    AccountModel, AccountRepository, Role,
};
use crate::shared::{parse_id, require, AppError, AppState, ListParams, Page};

/// Enrolment and training schedules between coaches and clients
pub struct CoachingService {
    coaching: Arc<dyn CoachingRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
}

impl CoachingService {
    pub fn new(
        coaching: Arc<dyn CoachingRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
    ) -> Self {
        Self { coaching, accounts }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.coaching_repository),
            Arc::clone(&state.account_repository),
        )
    }

    async fn accounts_by_id(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, AccountModel>, AppError> {
        let mut ids = ids;
        ids.sort_unstable();
        ids.dedup();
        Ok(self
            .accounts
            .find_by_ids(&ids)
            .await?
            .into_iter()
            .map(|account| (account.id, account))
            .collect())
    }

    /// Enrols the client with an active coach. A client holds at most one active enrolment.
    #[instrument(skip(self))]
    pub async fn book_coach(&self, client_id: Uuid, coach_id: Uuid) -> Result<EnrollResult, AppError> {
        let coach = self
            .accounts
            .find_by_id(Role::Coach, coach_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Coach not found".to_string()))?;
        if !coach.is_active() {
            return Err(AppError::Validation(
                "This coach is not accepting students".to_string(),
            ));
        }

        if let Some(existing) = self.coaching.active_enrollment(client_id).await? {
            warn!(student_id = %existing.id, "Client already has an active coach");
            return Ok(EnrollResult::AlreadyActive(existing));
        }

        let result = self
            .coaching
            .enroll(&StudentModel::new(coach_id, client_id))
            .await?;
        if let EnrollResult::Enrolled(student) = &result {
            info!(student_id = %student.id, "Coach booked");
        }
        Ok(result)
    }

    /// Students of one coach; `search` matches the client's fullname or email
    #[instrument(skip(self, params))]
    pub async fn my_students(
        &self,
        coach_id: Uuid,
        params: &ListParams,
    ) -> Result<Page<StudentView>, AppError> {
        let client_ids = match params.search() {
            Some(term) => Some(self.accounts.search_ids(Role::Client, term).await?),
            None => None,
        };
        let filter = StudentFilter {
            coach_id,
            client_ids,
            status: params.status_filter::<StudentStatus>()?,
        };

        let page = self.coaching.list_students(&filter, params).await?;
        let clients = self
            .accounts_by_id(page.items.iter().map(|s| s.client_id).collect())
            .await?;

        Ok(page.map(|student| {
            let client_info = clients.get(&student.client_id).map(|account| {
                let health_info = match &account.profile {
                    AccountProfile::Client { health_info, .. } => Some(health_info.clone()),
                    _ => None,
                };
                StudentClient {
                    summary: AccountSummary::from(account),
                    health_info,
                }
            });
            StudentView {
                student,
                client_info,
            }
        }))
    }

    #[instrument(skip(self, request))]
    pub async fn add_schedule(
        &self,
        coach_id: Uuid,
        request: AddScheduleRequest,
    ) -> Result<ScheduleModel, AppError> {
        require(&request.student_id, "studentId")?;
        require(&request.date, "date")?;
        require(&request.start_time, "startTime")?;
        require(&request.end_time, "endTime")?;

        let student_id = parse_id(&request.student_id, "student")?;
        let student = self
            .coaching
            .get_student(student_id)
            .await?
            .filter(|student| student.coach_id == coach_id)
            .ok_or_else(|| {
                AppError::NotFound("Student not found or not assigned to this coach".to_string())
            })?;

        let date = NaiveDate::parse_from_str(request.date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::Validation("date must be YYYY-MM-DD".to_string()))?;
        let start = parse_clock(&request.start_time)
            .ok_or_else(|| AppError::Validation("startTime must be HH:MM".to_string()))?;
        let end = parse_clock(&request.end_time)
            .ok_or_else(|| AppError::Validation("endTime must be HH:MM".to_string()))?;
        if start >= end {
            return Err(AppError::Validation(
                "startTime must be before endTime".to_string(),
            ));
        }

        let now = Utc::now();
        let schedule = ScheduleModel {
            id: Uuid::new_v4(),
            student_id: student.id,
            coach_id,
            date,
            start_time: start.format("%H:%M").to_string(),
            end_time: end.format("%H:%M").to_string(),
            notes: request.notes.filter(|notes| !notes.trim().is_empty()),
            status: ScheduleStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        self.coaching.create_schedule(&schedule).await?;

        info!(schedule_id = %schedule.id, student_id = %student.id, "Schedule added");
        Ok(schedule)
    }

    /// Deletes a schedule owned by the coach
    #[instrument(skip(self))]
    pub async fn delete_schedule(&self, coach_id: Uuid, schedule_id: Uuid) -> Result<(), AppError> {
        let schedule = self
            .coaching
            .get_schedule(schedule_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Schedule not found".to_string()))?;
        if schedule.coach_id != coach_id {
            warn!(%schedule_id, owner = %schedule.coach_id, "Refused to delete another coach's schedule");
            return Err(AppError::Forbidden(
                "You are not allowed to delete this schedule".to_string(),
            ));
        }

        self.coaching.delete_schedule(schedule_id).await?;
        info!(%schedule_id, "Schedule deleted");
        Ok(())
    }

    /// Coach view: each schedule with the student's client
    #[instrument(skip(self))]
    pub async fn coach_schedules(&self, coach_id: Uuid) -> Result<Vec<ScheduleView>, AppError> {
        let schedules = self.coaching.schedules_for_coach(coach_id).await?;

        let mut student_ids: Vec<Uuid> = schedules.iter().map(|s| s.student_id).collect();
        student_ids.sort_unstable();
        student_ids.dedup();
        let client_of_student: HashMap<Uuid, Uuid> = self
            .coaching
            .find_students(&student_ids)
            .await?
            .into_iter()
            .map(|student| (student.id, student.client_id))
            .collect();
        let clients = self
            .accounts_by_id(client_of_student.values().copied().collect())
            .await?;

        Ok(schedules
            .into_iter()
            .map(|schedule| ScheduleView {
                client_info: client_of_student
                    .get(&schedule.student_id)
                    .and_then(|client_id| clients.get(client_id))
                    .map(AccountSummary::from),
                coach_info: None,
                schedule,
            })
            .collect())
    }

    /// Client view: schedules of every enrolment the client holds, with the coach
    #[instrument(skip(self))]
    pub async fn client_schedules(&self, client_id: Uuid) -> Result<Vec<ScheduleView>, AppError> {
        let students = self.coaching.students_of_client(client_id).await?;
        let student_ids: Vec<Uuid> = students.iter().map(|s| s.id).collect();
        let schedules = self.coaching.schedules_for_students(&student_ids).await?;
        let coaches = self
            .accounts_by_id(schedules.iter().map(|s| s.coach_id).collect())
            .await?;

        Ok(schedules
            .into_iter()
            .map(|schedule| ScheduleView {
                client_info: None,
                coach_info: coaches.get(&schedule.coach_id).map(AccountSummary::from),
                schedule,
            })
            .collect())
    }
}
