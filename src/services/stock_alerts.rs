use crate::{
    entities::inventory_item::{self, Entity as InventoryItemEntity},
    entities::stock_movement::{self, Entity as StockMovementEntity},
    errors::ServiceError,
    events::{Event, EventSender, StockAlertType},
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const EXPIRY_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone, Default)]
pub struct StockAlertQuery {
    pub item_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockReportRow {
    #[schema(value_type = Object)]
    pub item: inventory_item::Model,
    pub total_quantity: i64,
    pub average_unit_cost: Option<Decimal>,
    pub total_value: Decimal,
}

#[derive(Debug, Default)]
struct LevelAccumulator {
    total: i64,
    // Thresholds from the first movement seen per item, nulls included.
    // Deliberately not the item's current thresholds.
    minimum_threshold: Option<i32>,
    maximum_threshold: Option<i32>,
}

/// Periodic threshold and expiry scans over the movement journal. The scans
/// are read-then-emit; consumers of the emitted events (mailer, socket
/// broadcast) are external.
#[derive(Clone)]
pub struct StockAlertService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl StockAlertService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Sums journalled quantities per item and emits LOW_STOCK/EXCESS_STOCK
    /// alerts against the thresholds snapshotted on the first movement of
    /// each group.
    #[instrument(skip(self))]
    pub async fn check_stock_levels(&self) -> Result<u64, ServiceError> {
        let movements = StockMovementEntity::find()
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let mut groups: HashMap<Uuid, LevelAccumulator> = HashMap::new();
        let mut order: Vec<Uuid> = Vec::new();
        for movement in &movements {
            let acc = groups.entry(movement.item_id).or_insert_with(|| {
                order.push(movement.item_id);
                LevelAccumulator {
                    total: 0,
                    minimum_threshold: movement.minimum_threshold,
                    maximum_threshold: movement.maximum_threshold,
                }
            });
            acc.total += movement.quantity as i64;
        }

        let mut alerts = 0u64;
        for item_id in order {
            let acc = &groups[&item_id];
            let low = acc
                .minimum_threshold
                .map(|min| acc.total < min as i64)
                .unwrap_or(false);
            let excess = acc
                .maximum_threshold
                .map(|max| acc.total > max as i64)
                .unwrap_or(false);

            if low || excess {
                alerts += 1;
                self.event_sender
                    .send_best_effort(Event::StockAlert {
                        item_id,
                        current_stock: acc.total as i32,
                        minimum_threshold: acc.minimum_threshold,
                        maximum_threshold: acc.maximum_threshold,
                        alert_type: if low {
                            StockAlertType::LowStock
                        } else {
                            StockAlertType::ExcessStock
                        },
                        timestamp: Utc::now(),
                    })
                    .await;
            }
        }

        Ok(alerts)
    }

    /// Emits EXPIRING alerts for movements whose expiry date falls within the
    /// next 30 days.
    #[instrument(skip(self))]
    pub async fn check_expiry_dates(&self) -> Result<u64, ServiceError> {
        let horizon = Utc::now() + Duration::days(EXPIRY_HORIZON_DAYS);
        let expiring = StockMovementEntity::find()
            .filter(stock_movement::Column::ExpiryDate.is_not_null())
            .filter(stock_movement::Column::ExpiryDate.lte(horizon))
            .all(&*self.db)
            .await?;

        let count = expiring.len() as u64;
        for movement in expiring {
            let Some(expiry_date) = movement.expiry_date else {
                continue;
            };
            self.event_sender
                .send_best_effort(Event::StockExpiry {
                    item_id: movement.item_id,
                    batch_number: movement.batch_number,
                    expiry_date,
                    quantity: movement.quantity,
                    timestamp: Utc::now(),
                })
                .await;
        }

        Ok(count)
    }

    /// Movement rows matching the alert filters, newest first.
    #[instrument(skip(self, query))]
    pub async fn get_stock_alerts(
        &self,
        query: StockAlertQuery,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        let mut select = StockMovementEntity::find();

        if let Some(item_id) = query.item_id {
            select = select.filter(stock_movement::Column::ItemId.eq(item_id));
        }
        if let Some(start) = query.start_date {
            select = select.filter(stock_movement::Column::CreatedAt.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(stock_movement::Column::CreatedAt.lte(end));
        }

        Ok(select
            .order_by_desc(stock_movement::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Per-item journal totals with value, joined to the item records.
    #[instrument(skip(self))]
    pub async fn generate_stock_report(&self) -> Result<Vec<StockReportRow>, ServiceError> {
        let movements = StockMovementEntity::find()
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        struct ReportAccumulator {
            total: i64,
            cost_sum: Decimal,
            cost_count: u32,
            value: Decimal,
        }

        let mut groups: HashMap<Uuid, ReportAccumulator> = HashMap::new();
        for movement in &movements {
            let acc = groups.entry(movement.item_id).or_insert(ReportAccumulator {
                total: 0,
                cost_sum: Decimal::ZERO,
                cost_count: 0,
                value: Decimal::ZERO,
            });
            acc.total += movement.quantity as i64;
            if let Some(cost) = movement.unit_cost {
                acc.cost_sum += cost;
                acc.cost_count += 1;
                acc.value += cost * Decimal::from(movement.quantity);
            }
        }

        let items = InventoryItemEntity::find()
            .filter(inventory_item::Column::Id.is_in(groups.keys().copied().collect::<Vec<_>>()))
            .all(&*self.db)
            .await?;

        // Items without a record are dropped, matching the inner join the
        // report has always used.
        let mut rows = Vec::with_capacity(items.len());
        for item in items {
            if let Some(acc) = groups.get(&item.id) {
                rows.push(StockReportRow {
                    total_quantity: acc.total,
                    average_unit_cost: (acc.cost_count > 0)
                        .then(|| acc.cost_sum / Decimal::from(acc.cost_count)),
                    total_value: acc.value,
                    item,
                });
            }
        }

        Ok(rows)
    }
}

/// Spawns the periodic scan loops. Scan failures are logged, never fatal.
pub fn start_scheduler(
    service: Arc<StockAlertService>,
    level_interval: std::time::Duration,
    expiry_interval: std::time::Duration,
) {
    let level_service = service.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(level_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            match level_service.check_stock_levels().await {
                Ok(alerts) => info!(alerts, "stock level scan complete"),
                Err(err) => error!(error = %err, "stock level scan failed"),
            }
        }
    });

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(expiry_interval);
        interval.tick().await;
        loop {
            interval.tick().await;
            match service.check_expiry_dates().await {
                Ok(alerts) => info!(alerts, "expiry scan complete"),
                Err(err) => error!(error = %err, "expiry scan failed"),
            }
        }
    });
}
