use crate::{
    entities::stock_movement::{self, Entity as StockMovementEntity, MovementStatus, MovementType},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Input for posting a movement to the journal.
#[derive(Debug, Clone)]
pub struct NewStockMovement {
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub quantity: i32,
    pub location_id: Uuid,
    pub to_location_id: Option<Uuid>,
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub manufacturing_date: Option<DateTime<Utc>>,
    pub unit_cost: Option<Decimal>,
    pub minimum_threshold: Option<i32>,
    pub maximum_threshold: Option<i32>,
}

/// Fields that may be rewritten on an existing movement.
#[derive(Debug, Clone, Default)]
pub struct StockMovementPatch {
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub status: Option<MovementStatus>,
    pub quality_checks: Option<stock_movement::QualityChecks>,
}

#[derive(Debug, Clone, Default)]
pub struct StockMovementQuery {
    pub movement_type: Option<MovementType>,
    pub status: Option<MovementStatus>,
    pub item_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub to_location_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: u64,
}

/// Append-only journal of stock-affecting events.
#[derive(Clone)]
pub struct StockMovementService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockMovementService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: NewStockMovement,
        created_by: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Movement quantity must be positive".to_string(),
            ));
        }

        let now = Utc::now();
        let total_cost = input
            .unit_cost
            .map(|cost| cost * Decimal::from(input.quantity));

        let model = stock_movement::ActiveModel {
            id: Set(Uuid::new_v4()),
            movement_type: Set(input.movement_type),
            item_id: Set(input.item_id),
            quantity: Set(input.quantity),
            location_id: Set(input.location_id),
            to_location_id: Set(input.to_location_id),
            reason: Set(input.reason),
            reference: Set(input.reference),
            notes: Set(input.notes),
            created_by: Set(created_by),
            status: Set(MovementStatus::Pending),
            batch_number: Set(input.batch_number),
            expiry_date: Set(input.expiry_date),
            manufacturing_date: Set(input.manufacturing_date),
            quality_checks: Set(None),
            unit_cost: Set(input.unit_cost),
            total_cost: Set(total_cost),
            minimum_threshold: Set(input.minimum_threshold),
            maximum_threshold: Set(input.maximum_threshold),
            voided_at: Set(None),
            voided_by: Set(None),
            cancelled_at: Set(None),
            cancelled_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await?;

        self.event_sender
            .send_best_effort(Event::MovementCreated(model.id))
            .await;

        Ok(model)
    }

    #[instrument(skip(self, inputs))]
    pub async fn create_bulk(
        &self,
        inputs: Vec<NewStockMovement>,
        created_by: Uuid,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            created.push(self.create(input, created_by).await?);
        }
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<stock_movement::Model, ServiceError> {
        StockMovementEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Stock movement {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: StockMovementQuery,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        let mut select = StockMovementEntity::find();

        if let Some(movement_type) = query.movement_type {
            select = select.filter(stock_movement::Column::MovementType.eq(movement_type));
        }
        if let Some(status) = query.status {
            select = select.filter(stock_movement::Column::Status.eq(status));
        }
        if let Some(item_id) = query.item_id {
            select = select.filter(stock_movement::Column::ItemId.eq(item_id));
        }
        if let Some(location_id) = query.location_id {
            select = select.filter(stock_movement::Column::LocationId.eq(location_id));
        }
        if let Some(to_location_id) = query.to_location_id {
            select = select.filter(stock_movement::Column::ToLocationId.eq(to_location_id));
        }
        if let Some(start) = query.start_date {
            select = select.filter(stock_movement::Column::CreatedAt.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(stock_movement::Column::CreatedAt.lte(end));
        }

        let paginator = select
            .order_by_desc(stock_movement::Column::CreatedAt)
            .paginate(&*self.db, query.limit.max(1));

        let total = paginator.num_items().await?;
        let movements = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((movements, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: StockMovementPatch,
    ) -> Result<stock_movement::Model, ServiceError> {
        let model = self.get(id).await?;

        let mut active: stock_movement::ActiveModel = model.into();
        if let Some(reason) = patch.reason {
            active.reason = Set(reason);
        }
        if let Some(reference) = patch.reference {
            active.reference = Set(Some(reference));
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(checks) = patch.quality_checks {
            active.quality_checks = Set(Some(checks));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    #[instrument(skip(self, updates))]
    pub async fn update_bulk(
        &self,
        updates: Vec<(Uuid, StockMovementPatch)>,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let mut updated = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            updated.push(self.update(id, patch).await?);
        }
        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = StockMovementEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Stock movement {} not found",
                id
            )));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete_bulk(&self, ids: Vec<Uuid>) -> Result<u64, ServiceError> {
        let result = StockMovementEntity::delete_many()
            .filter(stock_movement::Column::Id.is_in(ids))
            .exec(&*self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "No stock movements found to delete".to_string(),
            ));
        }
        Ok(result.rows_affected)
    }

    /// Marks a movement voided. There is no transition guard: any movement
    /// can be voided regardless of its current status, and repeating the call
    /// just refreshes the stamp.
    #[instrument(skip(self))]
    pub async fn void_movement(
        &self,
        id: Uuid,
        voided_by: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        let model = self.get(id).await?;

        let mut active: stock_movement::ActiveModel = model.into();
        active.status = Set(MovementStatus::Voided);
        active.voided_at = Set(Some(Utc::now()));
        active.voided_by = Set(Some(voided_by));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::MovementVoided(updated.id))
            .await;

        Ok(updated)
    }

    /// Marks a movement cancelled; same unguarded semantics as voiding.
    #[instrument(skip(self))]
    pub async fn cancel_movement(
        &self,
        id: Uuid,
        cancelled_by: Uuid,
    ) -> Result<stock_movement::Model, ServiceError> {
        let model = self.get(id).await?;

        let mut active: stock_movement::ActiveModel = model.into();
        active.status = Set(MovementStatus::Cancelled);
        active.cancelled_at = Set(Some(Utc::now()));
        active.cancelled_by = Set(Some(cancelled_by));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::MovementCancelled(updated.id))
            .await;

        Ok(updated)
    }
}
