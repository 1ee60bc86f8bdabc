use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{RoomModel, RoomStatus},
    repository::{RoomRepository, RoomTransition},
    types::RoomRequest,
};
use crate::shared::{require, AppError, ListParams, Page};

fn check_capacity(capacity: i32) -> Result<i32, AppError> {
    if capacity < 1 {
        return Err(AppError::Validation(
            "capacity must be at least 1".to_string(),
        ));
    }
    Ok(capacity)
}

fn not_found() -> AppError {
    AppError::NotFound("Room not found".to_string())
}

/// Service for room business logic
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    pub async fn get_room(&self, id: Uuid) -> Result<RoomModel, AppError> {
        self.repository.get_room(id).await?.ok_or_else(not_found)
    }

    #[instrument(skip(self, params))]
    pub async fn list_rooms(&self, params: &ListParams) -> Result<Page<RoomModel>, AppError> {
        let status = params.status_filter::<RoomStatus>()?;
        self.repository.list_rooms(status, params).await
    }

    #[instrument(skip(self, request))]
    pub async fn add_room(&self, request: RoomRequest) -> Result<RoomModel, AppError> {
        let name = request.name.unwrap_or_default();
        require(&name, "name")?;
        let capacity = request
            .capacity
            .ok_or_else(|| AppError::Validation("capacity is required".to_string()))?;

        let room = RoomModel::new(
            name.trim().to_string(),
            check_capacity(capacity)?,
            request.description.flatten(),
            request.image.flatten(),
        );
        self.repository.create_room(&room).await?;

        info!(room_id = %room.id, name = %room.name, "Room created");
        Ok(room)
    }

    /// Partial update; the status only moves through the lock and maintenance guards
    #[instrument(skip(self, request))]
    pub async fn update_room(&self, id: Uuid, request: RoomRequest) -> Result<RoomModel, AppError> {
        let mut room = self.get_room(id).await?;

        if let Some(name) = request.name {
            require(&name, "name")?;
            room.name = name.trim().to_string();
        }
        if let Some(capacity) = request.capacity {
            room.capacity = check_capacity(capacity)?;
        }
        if let Some(description) = request.description {
            room.description = description;
        }
        if let Some(image) = request.image {
            room.image = image;
        }

        self.repository.update_room(&room).await?;
        info!(room_id = %id, "Room updated");
        self.get_room(id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_room(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repository.delete_room(id).await? {
            return Err(not_found());
        }
        info!(room_id = %id, "Room deleted");
        Ok(())
    }

    /// available <-> unavailable
    #[instrument(skip(self))]
    pub async fn toggle_lock(&self, id: Uuid) -> Result<RoomModel, AppError> {
        match self.repository.toggle_lock(id).await? {
            RoomTransition::Applied(room) => {
                info!(room_id = %id, status = %room.status, "Room lock toggled");
                Ok(room)
            }
            RoomTransition::Rejected(status) => {
                warn!(room_id = %id, %status, "Refused to toggle room lock");
                Err(AppError::InvalidTransition(
                    "Room is under maintenance, lift maintenance first".to_string(),
                ))
            }
            RoomTransition::NotFound => Err(not_found()),
        }
    }

    #[instrument(skip(self))]
    pub async fn start_maintenance(&self, id: Uuid) -> Result<RoomModel, AppError> {
        let room = self
            .repository
            .start_maintenance(id)
            .await?
            .ok_or_else(not_found)?;

        info!(room_id = %id, "Room put under maintenance");
        Ok(room)
    }

    #[instrument(skip(self))]
    pub async fn end_maintenance(&self, id: Uuid) -> Result<RoomModel, AppError> {
        match self.repository.end_maintenance(id).await? {
            RoomTransition::Applied(room) => {
                info!(room_id = %id, "Room maintenance lifted");
                Ok(room)
            }
            RoomTransition::Rejected(status) => Err(AppError::InvalidTransition(format!(
                "Room is not under maintenance (status: {status})"
            ))),
            RoomTransition::NotFound => Err(not_found()),
        }
    }
}
