use crate::{
    entities::location::{self, Entity as LocationEntity, LocationStatus, LocationType},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewLocation {
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub location_type: LocationType,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub address: Option<String>,
    pub capacity: Option<i32>,
    pub location_type: Option<LocationType>,
    pub description: Option<String>,
    pub status: Option<LocationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct LocationQuery {
    pub search: Option<String>,
    pub location_type: Option<LocationType>,
    pub page: u64,
    pub limit: u64,
}

/// Per-location capacity ledger.
#[derive(Clone)]
pub struct LocationService {
    db: Arc<DatabaseConnection>,
}

impl LocationService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: NewLocation) -> Result<location::Model, ServiceError> {
        if input.capacity < 0 {
            return Err(ServiceError::ValidationError(
                "Capacity cannot be negative".to_string(),
            ));
        }

        let now = Utc::now();
        let model = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            address: Set(input.address),
            capacity: Set(input.capacity),
            used_capacity: Set(0),
            location_type: Set(input.location_type),
            description: Set(input.description),
            status: Set(LocationStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<location::Model, ServiceError> {
        LocationEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: LocationQuery,
    ) -> Result<(Vec<location::Model>, u64), ServiceError> {
        let mut select = LocationEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(location::Column::Name.contains(search.as_str()))
                    .add(location::Column::Address.contains(search.as_str())),
            );
        }
        if let Some(location_type) = query.location_type {
            select = select.filter(location::Column::LocationType.eq(location_type));
        }

        let paginator = select.paginate(&*self.db, query.limit.max(1));
        let total = paginator.num_items().await?;
        let locations = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((locations, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: LocationPatch,
    ) -> Result<location::Model, ServiceError> {
        let current = self.get(id).await?;

        let mut active: location::ActiveModel = current.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(address) = patch.address {
            active.address = Set(address);
        }
        if let Some(capacity) = patch.capacity {
            if capacity < 0 {
                return Err(ServiceError::ValidationError(
                    "Capacity cannot be negative".to_string(),
                ));
            }
            active.capacity = Set(capacity);
        }
        if let Some(location_type) = patch.location_type {
            active.location_type = Set(location_type);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Applies a signed change to the used capacity. Fails without mutating
    /// state when the result would exceed capacity or go negative.
    ///
    /// Generic over the connection so it can run inside a caller's
    /// transaction alongside movement posting.
    #[instrument(skip(self, conn))]
    pub async fn update_capacity<C: ConnectionTrait>(
        &self,
        conn: &C,
        id: Uuid,
        capacity_change: i32,
    ) -> Result<location::Model, ServiceError> {
        let current = LocationEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Location {} not found", id)))?;

        let new_used = current.used_capacity + capacity_change;
        if new_used > current.capacity {
            return Err(ServiceError::CapacityExceeded(format!(
                "Location {} capacity exceeded ({} > {})",
                id, new_used, current.capacity
            )));
        }
        if new_used < 0 {
            return Err(ServiceError::NegativeCapacity(format!(
                "Location {} capacity cannot be negative",
                id
            )));
        }

        let mut active: location::ActiveModel = current.into();
        active.used_capacity = Set(new_used);
        active.updated_at = Set(Utc::now());

        Ok(active.update(conn).await?)
    }

    /// Deletes an empty location; locations still holding stock are refused.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let current = self.get(id).await?;

        if current.used_capacity > 0 {
            return Err(ServiceError::ValidationError(
                "Cannot delete location with stored items. Please remove all items first."
                    .to_string(),
            ));
        }

        LocationEntity::delete_by_id(id).exec(&*self.db).await?;
        Ok(())
    }
}
