use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{RoomModel, RoomSortKey, RoomStatus};
use crate::shared::{db_error, AppError, ListParams, Page};

const DUPLICATE_ROOM: &str = "Room name already exists";

/// Result of a guarded room status change
#[derive(Debug, Clone)]
pub enum RoomTransition {
    /// Status changed, returns updated room data
    Applied(RoomModel),
    /// Current status does not allow the change
    Rejected(RoomStatus),
    /// Room does not exist
    NotFound,
}

/// Trait for room repository operations
#[async_trait]
pub trait RoomRepository {
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError>;
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError>;
    /// Search covers name and description
    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        params: &ListParams,
    ) -> Result<Page<RoomModel>, AppError>;
    /// Writes name, capacity, description and image; never the status
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError>;
    async fn delete_room(&self, room_id: Uuid) -> Result<bool, AppError>;

    /// Atomically flips available <-> unavailable; maintenance is rejected
    async fn toggle_lock(&self, room_id: Uuid) -> Result<RoomTransition, AppError>;

    /// Puts the room under maintenance from any status
    async fn start_maintenance(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError>;

    /// Atomically moves maintenance -> available; any other status is rejected
    async fn end_maintenance(&self, room_id: Uuid) -> Result<RoomTransition, AppError>;
}

fn sort_rooms(rooms: &mut [RoomModel], params: &ListParams) {
    let key: RoomSortKey = params.sort_key();
    rooms.sort_by(|a, b| {
        let ordering = match key {
            RoomSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            RoomSortKey::Name => a.name.cmp(&b.name),
            RoomSortKey::Capacity => a.capacity.cmp(&b.capacity),
        };
        params.sort_order.apply(ordering)
    });
}

/// In-memory implementation of RoomRepository for development and testing
pub struct InMemoryRoomRepository {
    rooms: RwLock<HashMap<Uuid, RoomModel>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Applies `next` to the room's status under the write lock.
    /// `next` returns `None` to reject the change.
    async fn transition(
        &self,
        room_id: Uuid,
        next: impl FnOnce(RoomStatus) -> Option<RoomStatus>,
    ) -> RoomTransition {
        let mut rooms = self.rooms.write().await;
        let room = match rooms.get_mut(&room_id) {
            Some(room) => room,
            None => {
                debug!(room_id = %room_id, "Room not found");
                return RoomTransition::NotFound;
            }
        };

        match next(room.status) {
            Some(status) => {
                room.status = status;
                room.updated_at = Utc::now();
                RoomTransition::Applied(room.clone())
            }
            None => RoomTransition::Rejected(room.status),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        debug!(name = %room.name, "Creating room in memory");

        let mut rooms = self.rooms.write().await;
        if rooms.values().any(|r| r.name.eq_ignore_ascii_case(&room.name)) {
            warn!(name = %room.name, "Room already exists in memory");
            return Err(AppError::Conflict(DUPLICATE_ROOM.to_string()));
        }
        rooms.insert(room.id, room.clone());

        debug!("Room created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        let room = self.rooms.read().await.get(&room_id).cloned();

        match &room {
            Some(r) => debug!(name = %r.name, "Room found in memory"),
            None => debug!("Room not found in memory"),
        }

        Ok(room)
    }

    #[instrument(skip(self, params))]
    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        params: &ListParams,
    ) -> Result<Page<RoomModel>, AppError> {
        let rooms = self.rooms.read().await;
        let mut matching: Vec<RoomModel> = rooms
            .values()
            .filter(|r| status.map_or(true, |status| r.status == status))
            .filter(|r| {
                params.matches(&[r.name.as_str(), r.description.as_deref().unwrap_or_default()])
            })
            .cloned()
            .collect();
        sort_rooms(&mut matching, params);

        debug!(total = matching.len(), "Rooms listed successfully in memory");
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError> {
        let mut rooms = self.rooms.write().await;
        if rooms
            .values()
            .any(|r| r.id != room.id && r.name.eq_ignore_ascii_case(&room.name))
        {
            return Err(AppError::Conflict(DUPLICATE_ROOM.to_string()));
        }

        let stored = rooms
            .get_mut(&room.id)
            .ok_or_else(|| AppError::NotFound("Room not found".to_string()))?;
        stored.name = room.name.clone();
        stored.capacity = room.capacity;
        stored.description = room.description.clone();
        stored.image = room.image.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: Uuid) -> Result<bool, AppError> {
        Ok(self.rooms.write().await.remove(&room_id).is_some())
    }

    #[instrument(skip(self))]
    async fn toggle_lock(&self, room_id: Uuid) -> Result<RoomTransition, AppError> {
        Ok(self.transition(room_id, RoomStatus::lock_toggle).await)
    }

    #[instrument(skip(self))]
    async fn start_maintenance(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        match self
            .transition(room_id, |_| Some(RoomStatus::Maintenance))
            .await
        {
            RoomTransition::Applied(room) => Ok(Some(room)),
            _ => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn end_maintenance(&self, room_id: Uuid) -> Result<RoomTransition, AppError> {
        Ok(self
            .transition(room_id, |status| match status {
                RoomStatus::Maintenance => Some(RoomStatus::Available),
                _ => None,
            })
            .await)
    }
}

const ROOM_COLUMNS: &str =
    "id, name, image, capacity, description, status, created_at, updated_at";

fn push_room_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    status: Option<RoomStatus>,
    pattern: Option<String>,
) {
    builder.push(" WHERE TRUE");
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = pattern {
        builder
            .push(" AND (name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// PostgreSQL implementation of RoomRepository
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `UPDATE ... WHERE status = ANY(from) RETURNING`, falling back to a read to
    /// tell a missing room from a rejected one
    async fn guarded_update(
        &self,
        room_id: Uuid,
        from: &[RoomStatus],
        set_sql: &str,
    ) -> Result<RoomTransition, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE rooms SET ");
        builder
            .push(set_sql)
            .push(", updated_at = NOW() WHERE id = ")
            .push_bind(room_id)
            .push(" AND status IN (");
        for (i, status) in from.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            builder.push_bind(*status);
        }
        builder.push(format!(") RETURNING {ROOM_COLUMNS}"));

        let updated = builder
            .build_query_as::<RoomModel>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_ROOM))?;

        if let Some(room) = updated {
            return Ok(RoomTransition::Applied(room));
        }

        Ok(match self.get_room(room_id).await? {
            Some(room) => RoomTransition::Rejected(room.status),
            None => RoomTransition::NotFound,
        })
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn create_room(&self, room: &RoomModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO rooms ({ROOM_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(room.id)
        .bind(&room.name)
        .bind(&room.image)
        .bind(room.capacity)
        .bind(&room.description)
        .bind(room.status)
        .bind(room.created_at)
        .bind(room.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_ROOM))?;

        debug!("Room created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1"))
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_ROOM))
    }

    #[instrument(skip(self, params))]
    async fn list_rooms(
        &self,
        status: Option<RoomStatus>,
        params: &ListParams,
    ) -> Result<Page<RoomModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM rooms");
        push_room_filters(&mut count, status, params.search_pattern());
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_ROOM))?;

        let key: RoomSortKey = params.sort_key();
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {ROOM_COLUMNS} FROM rooms"));
        push_room_filters(&mut query, status, params.search_pattern());
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
            .build_query_as::<RoomModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_ROOM))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self, room), fields(room_id = %room.id))]
    async fn update_room(&self, room: &RoomModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE rooms SET name = $1, capacity = $2, description = $3, image = $4, updated_at = NOW() \
             WHERE id = $5",
        )
        .bind(&room.name)
        .bind(room.capacity)
        .bind(&room.description)
        .bind(&room.image)
        .bind(room.id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_ROOM))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Room not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM rooms WHERE id = $1")
            .bind(room_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_ROOM))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn toggle_lock(&self, room_id: Uuid) -> Result<RoomTransition, AppError> {
        // 0 = available, 1 = unavailable
        let transition = self
            .guarded_update(
                room_id,
                &[RoomStatus::Available, RoomStatus::Unavailable],
                "status = CASE WHEN status = 0 THEN 1 ELSE 0 END",
            )
            .await?;
        if let RoomTransition::Applied(room) = &transition {
            info!(status = %room.status, "Room lock toggled");
        }
        Ok(transition)
    }

    #[instrument(skip(self))]
    async fn start_maintenance(&self, room_id: Uuid) -> Result<Option<RoomModel>, AppError> {
        sqlx::query_as::<_, RoomModel>(&format!(
            "UPDATE rooms SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {ROOM_COLUMNS}"
        ))
        .bind(RoomStatus::Maintenance)
        .bind(room_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_ROOM))
    }

    #[instrument(skip(self))]
    async fn end_maintenance(&self, room_id: Uuid) -> Result<RoomTransition, AppError> {
        self.guarded_update(room_id, &[RoomStatus::Maintenance], "status = 0")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::SortOrder;

    fn create_test_room(name: &str, capacity: i32) -> RoomModel {
        RoomModel::new(name.to_string(), capacity, Some(format!("{name} floor")), None)
    }

    #[tokio::test]
    async fn test_create_and_get_room() {
        let repo = InMemoryRoomRepository::new();
        let room = create_test_room("Studio A", 20);

        repo.create_room(&room).await.unwrap();
        let retrieved = repo.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(retrieved, room);
    }

    #[tokio::test]
    async fn test_get_nonexistent_room() {
        let repo = InMemoryRoomRepository::new();
        assert!(repo.get_room(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_room() {
        let repo = InMemoryRoomRepository::new();
        repo.create_room(&create_test_room("Studio A", 20)).await.unwrap();

        let result = repo.create_room(&create_test_room("studio a", 10)).await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_rooms_search_and_sort() {
        let repo = InMemoryRoomRepository::new();
        repo.create_room(&create_test_room("Spin", 15)).await.unwrap();
        repo.create_room(&create_test_room("Boxing", 8)).await.unwrap();
        repo.create_room(&create_test_room("Yoga", 25)).await.unwrap();

        let params = ListParams::default().with_sort("capacity", SortOrder::Desc);
        let page = repo.list_rooms(None, &params).await.unwrap();
        let names: Vec<_> = page.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Yoga", "Spin", "Boxing"]);

        let params = ListParams::default().with_search("box");
        let page = repo.list_rooms(None, &params).await.unwrap();
        assert_eq!(page.total, 1);
    }

    #[tokio::test]
    async fn test_lock_toggle_and_maintenance_guard() {
        let repo = InMemoryRoomRepository::new();
        let room = create_test_room("Studio A", 20);
        repo.create_room(&room).await.unwrap();

        let locked = repo.toggle_lock(room.id).await.unwrap();
        assert!(matches!(locked, RoomTransition::Applied(r) if r.status == RoomStatus::Unavailable));

        let maintained = repo.start_maintenance(room.id).await.unwrap().unwrap();
        assert_eq!(maintained.status, RoomStatus::Maintenance);

        let blocked = repo.toggle_lock(room.id).await.unwrap();
        assert!(matches!(blocked, RoomTransition::Rejected(RoomStatus::Maintenance)));

        let lifted = repo.end_maintenance(room.id).await.unwrap();
        assert!(matches!(lifted, RoomTransition::Applied(r) if r.status == RoomStatus::Available));

        let not_in_maintenance = repo.end_maintenance(room.id).await.unwrap();
        assert!(matches!(
            not_in_maintenance,
            RoomTransition::Rejected(RoomStatus::Available)
        ));
    }

    #[tokio::test]
    async fn test_update_room_keeps_status() {
        let repo = InMemoryRoomRepository::new();
        let mut room = create_test_room("Studio A", 20);
        repo.create_room(&room).await.unwrap();
        repo.start_maintenance(room.id).await.unwrap();

        room.capacity = 30;
        room.status = RoomStatus::Available;
        repo.update_room(&room).await.unwrap();

        let stored = repo.get_room(room.id).await.unwrap().unwrap();
        assert_eq!(stored.capacity, 30);
        assert_eq!(stored.status, RoomStatus::Maintenance);
    }

    #[tokio::test]
    async fn test_transitions_on_missing_room() {
        let repo = InMemoryRoomRepository::new();
        let id = Uuid::new_v4();
        assert!(matches!(
            repo.toggle_lock(id).await.unwrap(),
            RoomTransition::NotFound
        ));
        assert!(repo.start_maintenance(id).await.unwrap().is_none());
        assert!(!repo.delete_room(id).await.unwrap());
    }
}
