use crate::{
    auth::SYSTEM_USER_ID,
    entities::inventory_item::{self, Entity as InventoryItemEntity, ItemStatus},
    entities::stock_movement::MovementType,
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_movements::{NewStockMovement, StockMovementService},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub sku: String,
    pub description: String,
    pub category: String,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,
    pub buying_price: Decimal,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub current_stock: Option<i32>,
    pub min_stock: Option<i32>,
    pub max_stock: Option<i32>,
    pub buying_price: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<ItemStatus>,
    pub page: u64,
    pub limit: u64,
}

/// Inventory item store. Stock counters and derived status live here; every
/// stock change is mirrored into the movement journal on a best-effort basis.
#[derive(Clone)]
pub struct InventoryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    movements: Arc<StockMovementService>,
}

impl InventoryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        movements: Arc<StockMovementService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            movements,
        }
    }

    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create(
        &self,
        input: NewInventoryItem,
    ) -> Result<inventory_item::Model, ServiceError> {
        let existing = InventoryItemEntity::find()
            .filter(inventory_item::Column::Sku.eq(input.sku.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict("SKU already exists".to_string()));
        }

        let now = Utc::now();
        let status = ItemStatus::derive(input.current_stock, input.min_stock);

        let item = inventory_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            sku: Set(input.sku),
            description: Set(input.description),
            category: Set(input.category),
            current_stock: Set(input.current_stock),
            min_stock: Set(input.min_stock),
            max_stock: Set(input.max_stock),
            buying_price: Set(input.buying_price),
            unit_price: Set(input.unit_price),
            image: Set(input.image),
            status: Set(status),
            location_id: Set(input.location_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_err(e, "SKU already exists"))?;

        // Initial stock is mirrored into the journal. Failure here is logged
        // and never fails item creation, so the counter and the journal can
        // diverge; that divergence is accepted.
        if item.current_stock > 0 {
            let movement = NewStockMovement {
                movement_type: MovementType::In,
                item_id: item.id,
                quantity: item.current_stock,
                location_id: item.location_id.unwrap_or(Uuid::nil()),
                to_location_id: None,
                reason: "Initial stock".to_string(),
                reference: None,
                notes: None,
                batch_number: None,
                expiry_date: None,
                manufacturing_date: None,
                unit_cost: Some(item.buying_price),
                minimum_threshold: Some(item.min_stock),
                maximum_threshold: Some(item.max_stock),
            };
            if let Err(err) = self.movements.create(movement, SYSTEM_USER_ID).await {
                warn!(item_id = %item.id, error = %err, "failed to record initial stock movement");
            }
        }

        self.event_sender
            .send_best_effort(Event::InventoryItemCreated(item.id))
            .await;

        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<inventory_item::Model, ServiceError> {
        InventoryItemEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Inventory item {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: InventoryQuery,
    ) -> Result<(Vec<inventory_item::Model>, u64), ServiceError> {
        let mut select = InventoryItemEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(inventory_item::Column::Name.contains(search.as_str()))
                    .add(inventory_item::Column::Sku.contains(search.as_str())),
            );
        }
        if let Some(category) = query.category {
            select = select.filter(inventory_item::Column::Category.eq(category));
        }
        if let Some(status) = query.status {
            select = select.filter(inventory_item::Column::Status.eq(status));
        }

        let paginator = select.paginate(&*self.db, query.limit.max(1));
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((items, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: InventoryItemPatch,
    ) -> Result<inventory_item::Model, ServiceError> {
        let current = self.get(id).await?;
        let previous_stock = current.current_stock;

        let mut active: inventory_item::ActiveModel = current.clone().into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(description) = patch.description {
            active.description = Set(description);
        }
        if let Some(category) = patch.category {
            active.category = Set(category);
        }
        if let Some(min_stock) = patch.min_stock {
            active.min_stock = Set(min_stock);
        }
        if let Some(max_stock) = patch.max_stock {
            active.max_stock = Set(max_stock);
        }
        if let Some(buying_price) = patch.buying_price {
            active.buying_price = Set(buying_price);
        }
        if let Some(unit_price) = patch.unit_price {
            active.unit_price = Set(unit_price);
        }
        if let Some(image) = patch.image {
            active.image = Set(Some(image));
        }
        if let Some(location_id) = patch.location_id {
            active.location_id = Set(Some(location_id));
        }
        if let Some(new_stock) = patch.current_stock {
            let min_stock = patch.min_stock.unwrap_or(current.min_stock);
            active.current_stock = Set(new_stock);
            active.status = Set(ItemStatus::derive(new_stock, min_stock));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        // A direct stock edit is journalled as a signed-delta adjustment,
        // best-effort like the initial-stock posting.
        if let Some(new_stock) = patch.current_stock {
            let delta = new_stock - previous_stock;
            if delta != 0 {
                let movement = NewStockMovement {
                    movement_type: if delta > 0 {
                        MovementType::In
                    } else {
                        MovementType::Out
                    },
                    item_id: updated.id,
                    quantity: delta.abs(),
                    location_id: updated.location_id.unwrap_or(Uuid::nil()),
                    to_location_id: None,
                    reason: "Manual stock adjustment".to_string(),
                    reference: None,
                    notes: None,
                    batch_number: None,
                    expiry_date: None,
                    manufacturing_date: None,
                    unit_cost: None,
                    minimum_threshold: Some(updated.min_stock),
                    maximum_threshold: Some(updated.max_stock),
                };
                if let Err(err) = self.movements.create(movement, SYSTEM_USER_ID).await {
                    warn!(item_id = %updated.id, error = %err, "failed to record stock adjustment movement");
                }

                self.event_sender
                    .send_best_effort(Event::InventoryStockAdjusted {
                        item_id: updated.id,
                        delta,
                        reason: "Manual stock adjustment".to_string(),
                    })
                    .await;
            }
        }

        self.event_sender
            .send_best_effort(Event::InventoryItemUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Atomically increments the stock counter, then re-derives the status
    /// from the new value. The increment is a single statement, so two
    /// concurrent calls never lose an update.
    #[instrument(skip(self))]
    pub async fn update_stock(&self, id: Uuid, delta: i32) -> Result<(), ServiceError> {
        let result = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::CurrentStock,
                Expr::col(inventory_item::Column::CurrentStock).add(delta),
            )
            .col_expr(
                inventory_item::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(inventory_item::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }

        self.recompute_status(id).await?;

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn update_buying_price(
        &self,
        id: Uuid,
        buying_price: Decimal,
    ) -> Result<(), ServiceError> {
        let result = InventoryItemEntity::update_many()
            .col_expr(
                inventory_item::Column::BuyingPrice,
                Expr::value(buying_price),
            )
            .col_expr(
                inventory_item::Column::UpdatedAt,
                Expr::value(Utc::now()),
            )
            .filter(inventory_item::Column::Id.eq(id))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = InventoryItemEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Inventory item {} not found",
                id
            )));
        }
        Ok(())
    }

    /// Re-derives the status from the stored counters so it never drifts.
    async fn recompute_status(&self, id: Uuid) -> Result<(), ServiceError> {
        let item = self.get(id).await?;
        let status = ItemStatus::derive(item.current_stock, item.min_stock);
        if status != item.status {
            let mut active: inventory_item::ActiveModel = item.into();
            active.status = Set(status);
            active.update(&*self.db).await?;
        }
        Ok(())
    }
}
