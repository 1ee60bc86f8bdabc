use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{ScheduleModel, StudentModel, StudentSortKey, StudentStatus};
use crate::shared::{db_error, AppError, ListParams, Page};

/// Result of an enrolment attempt
#[derive(Debug, Clone)]
pub enum EnrollResult {
    Enrolled(StudentModel),
    /// The client already holds this active record
    AlreadyActive(StudentModel),
}

/// Filters for a coach's student list
#[derive(Debug, Clone)]
pub struct StudentFilter {
    pub coach_id: Uuid,
    /// Precomputed client search result; empty matches nothing
    pub client_ids: Option<Vec<Uuid>>,
    pub status: Option<StudentStatus>,
}

/// Trait for student and schedule storage
#[async_trait]
pub trait CoachingRepository {
    /// Inserts the student unless the client already has an active record.
    /// Check and insert happen as one step.
    async fn enroll(&self, student: &StudentModel) -> Result<EnrollResult, AppError>;
    async fn active_enrollment(&self, client_id: Uuid) -> Result<Option<StudentModel>, AppError>;
    async fn get_student(&self, id: Uuid) -> Result<Option<StudentModel>, AppError>;
    /// Bulk lookup; unknown ids are skipped
    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentModel>, AppError>;
    async fn list_students(
        &self,
        filter: &StudentFilter,
        params: &ListParams,
    ) -> Result<Page<StudentModel>, AppError>;
    async fn students_of_client(&self, client_id: Uuid) -> Result<Vec<StudentModel>, AppError>;

    async fn create_schedule(&self, schedule: &ScheduleModel) -> Result<(), AppError>;
    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduleModel>, AppError>;
    async fn delete_schedule(&self, id: Uuid) -> Result<bool, AppError>;
    /// Sorted by date then start time
    async fn schedules_for_coach(&self, coach_id: Uuid) -> Result<Vec<ScheduleModel>, AppError>;
    /// Sorted by date then start time
    async fn schedules_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> Result<Vec<ScheduleModel>, AppError>;
}

fn sort_schedules(schedules: &mut [ScheduleModel]) {
    schedules.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
}

/// In-memory implementation of CoachingRepository for development and testing
#[derive(Default)]
pub struct InMemoryCoachingRepository {
    students: RwLock<HashMap<Uuid, StudentModel>>,
    schedules: RwLock<HashMap<Uuid, ScheduleModel>>,
}

impl InMemoryCoachingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CoachingRepository for InMemoryCoachingRepository {
    #[instrument(skip(self, student), fields(client_id = %student.client_id, coach_id = %student.coach_id))]
    async fn enroll(&self, student: &StudentModel) -> Result<EnrollResult, AppError> {
        let mut students = self.students.write().await;
        if let Some(existing) = students
            .values()
            .find(|s| s.client_id == student.client_id && s.status == StudentStatus::Active)
        {
            warn!(student_id = %existing.id, "Client already has an active coach");
            return Ok(EnrollResult::AlreadyActive(existing.clone()));
        }

        students.insert(student.id, student.clone());
        debug!(student_id = %student.id, "Student enrolled in memory");
        Ok(EnrollResult::Enrolled(student.clone()))
    }

    #[instrument(skip(self))]
    async fn active_enrollment(&self, client_id: Uuid) -> Result<Option<StudentModel>, AppError> {
        Ok(self
            .students
            .read()
            .await
            .values()
            .find(|s| s.client_id == client_id && s.status == StudentStatus::Active)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn get_student(&self, id: Uuid) -> Result<Option<StudentModel>, AppError> {
        Ok(self.students.read().await.get(&id).cloned())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentModel>, AppError> {
        let students = self.students.read().await;
        Ok(ids.iter().filter_map(|id| students.get(id).cloned()).collect())
    }

    #[instrument(skip(self, filter, params), fields(coach_id = %filter.coach_id))]
    async fn list_students(
        &self,
        filter: &StudentFilter,
        params: &ListParams,
    ) -> Result<Page<StudentModel>, AppError> {
        let students = self.students.read().await;
        let mut matching: Vec<StudentModel> = students
            .values()
            .filter(|s| s.coach_id == filter.coach_id)
            .filter(|s| {
                filter
                    .client_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&s.client_id))
            })
            .filter(|s| filter.status.map_or(true, |status| s.status == status))
            .cloned()
            .collect();

        let key: StudentSortKey = params.sort_key();
        matching.sort_by(|a, b| {
            let ordering = match key {
                StudentSortKey::EnrollmentDate => a.enrollment_date.cmp(&b.enrollment_date),
                StudentSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            params.sort_order.apply(ordering)
        });
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self))]
    async fn students_of_client(&self, client_id: Uuid) -> Result<Vec<StudentModel>, AppError> {
        Ok(self
            .students
            .read()
            .await
            .values()
            .filter(|s| s.client_id == client_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id))]
    async fn create_schedule(&self, schedule: &ScheduleModel) -> Result<(), AppError> {
        self.schedules
            .write()
            .await
            .insert(schedule.id, schedule.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduleModel>, AppError> {
        Ok(self.schedules.read().await.get(&id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_schedule(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.schedules.write().await.remove(&id).is_some())
    }

    #[instrument(skip(self))]
    async fn schedules_for_coach(&self, coach_id: Uuid) -> Result<Vec<ScheduleModel>, AppError> {
        let mut schedules: Vec<ScheduleModel> = self
            .schedules
            .read()
            .await
            .values()
            .filter(|s| s.coach_id == coach_id)
            .cloned()
            .collect();
        sort_schedules(&mut schedules);
        Ok(schedules)
    }

    #[instrument(skip(self, student_ids), fields(count = student_ids.len()))]
    async fn schedules_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> Result<Vec<ScheduleModel>, AppError> {
        let mut schedules: Vec<ScheduleModel> = self
            .schedules
            .read()
            .await
            .values()
            .filter(|s| student_ids.contains(&s.student_id))
            .cloned()
            .collect();
        sort_schedules(&mut schedules);
        Ok(schedules)
    }
}

const STUDENT_COLUMNS: &str =
    "id, coach_id, client_id, enrollment_date, status, created_at, updated_at";
const SCHEDULE_COLUMNS: &str =
    "id, student_id, coach_id, date, start_time, end_time, notes, status, created_at, updated_at";

fn push_student_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &StudentFilter) {
    builder.push(" WHERE coach_id = ").push_bind(filter.coach_id);
    if let Some(ids) = &filter.client_ids {
        builder.push(" AND client_id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
}

/// PostgreSQL implementation of CoachingRepository
pub struct PostgresCoachingRepository {
    pool: PgPool,
}

impl PostgresCoachingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CoachingRepository for PostgresCoachingRepository {
    #[instrument(skip(self, student), fields(client_id = %student.client_id, coach_id = %student.coach_id))]
    async fn enroll(&self, student: &StudentModel) -> Result<EnrollResult, AppError> {
        // `students_one_active_per_client` is a partial unique index on client_id WHERE status = 1
        let inserted = sqlx::query_as::<_, StudentModel>(&format!(
            "INSERT INTO students ({STUDENT_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (client_id) WHERE status = 1 DO NOTHING RETURNING {STUDENT_COLUMNS}"
        ))
        .bind(student.id)
        .bind(student.coach_id)
        .bind(student.client_id)
        .bind(student.enrollment_date)
        .bind(student.status)
        .bind(student.created_at)
        .bind(student.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Client already has an active coach"))?;

        if let Some(student) = inserted {
            info!(student_id = %student.id, "Student enrolled in database");
            return Ok(EnrollResult::Enrolled(student));
        }

        match self.active_enrollment(student.client_id).await? {
            Some(existing) => Ok(EnrollResult::AlreadyActive(existing)),
            None => Err(AppError::Conflict(
                "Enrolment changed concurrently, please retry".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    async fn active_enrollment(&self, client_id: Uuid) -> Result<Option<StudentModel>, AppError> {
        sqlx::query_as::<_, StudentModel>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE client_id = $1 AND status = $2"
        ))
        .bind(client_id)
        .bind(StudentStatus::Active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Student lookup failed"))
    }

    #[instrument(skip(self))]
    async fn get_student(&self, id: Uuid) -> Result<Option<StudentModel>, AppError> {
        sqlx::query_as::<_, StudentModel>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Student lookup failed"))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_students(&self, ids: &[Uuid]) -> Result<Vec<StudentModel>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, StudentModel>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Student lookup failed"))
    }

    #[instrument(skip(self, filter, params), fields(coach_id = %filter.coach_id))]
    async fn list_students(
        &self,
        filter: &StudentFilter,
        params: &ListParams,
    ) -> Result<Page<StudentModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM students");
        push_student_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Student count failed"))?;

        let key: StudentSortKey = params.sort_key();
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {STUDENT_COLUMNS} FROM students"));
        push_student_filters(&mut query, filter);
        query
            .push(format!(
                " ORDER BY {} {}",
                key.column(),
                params.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset());

        let items = query
            .build_query_as::<StudentModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Student listing failed"))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    async fn students_of_client(&self, client_id: Uuid) -> Result<Vec<StudentModel>, AppError> {
        sqlx::query_as::<_, StudentModel>(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE client_id = $1"
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Student lookup failed"))
    }

    #[instrument(skip(self, schedule), fields(schedule_id = %schedule.id))]
    async fn create_schedule(&self, schedule: &ScheduleModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO schedules ({SCHEDULE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(schedule.id)
        .bind(schedule.student_id)
        .bind(schedule.coach_id)
        .bind(schedule.date)
        .bind(&schedule.start_time)
        .bind(&schedule.end_time)
        .bind(&schedule.notes)
        .bind(schedule.status)
        .bind(schedule.created_at)
        .bind(schedule.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, "Schedule already exists"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_schedule(&self, id: Uuid) -> Result<Option<ScheduleModel>, AppError> {
        sqlx::query_as::<_, ScheduleModel>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Schedule lookup failed"))
    }

    #[instrument(skip(self))]
    async fn delete_schedule(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM schedules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "Schedule delete failed"))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn schedules_for_coach(&self, coach_id: Uuid) -> Result<Vec<ScheduleModel>, AppError> {
        sqlx::query_as::<_, ScheduleModel>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE coach_id = $1 ORDER BY date, start_time"
        ))
        .bind(coach_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Schedule lookup failed"))
    }

    #[instrument(skip(self, student_ids), fields(count = student_ids.len()))]
    async fn schedules_for_students(
        &self,
        student_ids: &[Uuid],
    ) -> Result<Vec<ScheduleModel>, AppError> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, ScheduleModel>(&format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE student_id = ANY($1) ORDER BY date, start_time"
        ))
        .bind(student_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Schedule lookup failed"))
    }
}
