use crate::{
    entities::delivery::{
        self, AdditionalTaxes, DeliveryAddress, DeliveryItems, DeliveryStatus, DeliveryTracking,
        Entity as DeliveryEntity, ProofOfDelivery, TrackedLocation, TrackingEvent,
    },
    entities::delivery_company::Entity as DeliveryCompanyEntity,
    errors::ServiceError,
    events::{Event, EventSender},
    services::geocoding::GeocodingService,
    services::route_optimization::haversine_km,
};
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Distance below which an in-transit delivery is considered arriving.
const ARRIVAL_RADIUS_KM: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct NewDeliveryItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: DeliveryAddress,
    pub items: Vec<NewDeliveryItem>,
    pub delivery_company_id: Uuid,
    pub vat_rate: Decimal,
    pub additional_taxes: Option<AdditionalTaxes>,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryPatch {
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub delivery_address: Option<DeliveryAddress>,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
    pub status: Option<DeliveryStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct DeliveryQuery {
    pub search: Option<String>,
    /// `None` lists every status (the `all` filter value).
    pub status: Option<DeliveryStatus>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone)]
pub struct ProofOfDeliveryInput {
    pub received_by: String,
    pub signature: Option<String>,
    pub photos: Option<Vec<String>>,
    pub notes: Option<String>,
}

/// Delivery lifecycle: state machine, append-only tracking history and
/// proof-of-delivery capture.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    geocoder: Arc<GeocodingService>,
}

impl DeliveryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        geocoder: Arc<GeocodingService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            geocoder,
        }
    }

    /// `INVyymmdd-XXXX` with a random alphanumeric suffix.
    fn generate_invoice_number() -> String {
        let suffix: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(|c| (c as char).to_ascii_uppercase())
            .collect();
        format!("INV{}-{}", Utc::now().format("%y%m%d"), suffix)
    }

    /// The two hard transition rules. Everything else is deliberately
    /// unrestricted.
    fn guard_transition(
        current: DeliveryStatus,
        next: DeliveryStatus,
        id: Uuid,
    ) -> Result<(), ServiceError> {
        if current.is_terminal() {
            return Err(ServiceError::InvalidTransition(format!(
                "Cannot update cancelled or voided delivery {}",
                id
            )));
        }
        if current == DeliveryStatus::Completed && next != DeliveryStatus::Returned {
            return Err(ServiceError::InvalidTransition(format!(
                "Completed delivery {} can only be returned",
                id
            )));
        }
        Ok(())
    }

    fn seed_tracking() -> DeliveryTracking {
        DeliveryTracking {
            current_location: None,
            history: vec![TrackingEvent {
                timestamp: Utc::now(),
                status: DeliveryStatus::Pending,
                location: None,
                notes: Some("Delivery created".to_string()),
            }],
            actual_delivery_date: None,
        }
    }

    fn build_active_model(input: NewDelivery) -> delivery::ActiveModel {
        let now = Utc::now();
        let items = DeliveryItems(
            input
                .items
                .into_iter()
                .map(|item| delivery::DeliveryItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    tax_rate: item.tax_rate,
                })
                .collect(),
        );

        delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_number: Set(Self::generate_invoice_number()),
            customer_name: Set(input.customer_name),
            customer_email: Set(input.customer_email),
            customer_phone: Set(input.customer_phone),
            delivery_address: Set(input.delivery_address),
            items: Set(items),
            delivery_company_id: Set(input.delivery_company_id),
            vat_rate: Set(input.vat_rate),
            additional_taxes: Set(input.additional_taxes),
            notes: Set(input.notes),
            preferred_delivery_date: Set(input.preferred_delivery_date),
            status: Set(DeliveryStatus::Pending),
            tracking: Set(Self::seed_tracking()),
            proof_of_delivery: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, input: NewDelivery) -> Result<delivery::Model, ServiceError> {
        let company = DeliveryCompanyEntity::find_by_id(input.delivery_company_id)
            .one(&*self.db)
            .await?;
        if company.is_none() {
            return Err(ServiceError::NotFound(
                "Delivery company not found".to_string(),
            ));
        }

        let model = Self::build_active_model(input)
            .insert(&*self.db)
            .await
            .map_err(|e| {
                ServiceError::from_db_err(e, "Duplicate invoice number detected. Please try again.")
            })?;

        self.event_sender
            .send_best_effort(Event::DeliveryCreated(model.id))
            .await;

        Ok(model)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<delivery::Model, ServiceError> {
        DeliveryEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: DeliveryQuery,
    ) -> Result<(Vec<delivery::Model>, u64), ServiceError> {
        let mut select = DeliveryEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(
                Condition::any()
                    .add(delivery::Column::CustomerName.contains(search.as_str()))
                    .add(delivery::Column::CustomerEmail.contains(search.as_str()))
                    .add(delivery::Column::CustomerPhone.contains(search.as_str()))
                    .add(delivery::Column::InvoiceNumber.contains(search.as_str())),
            );
        }
        if let Some(status) = query.status {
            select = select.filter(delivery::Column::Status.eq(status));
        }
        if let Some(start) = query.start_date {
            select = select.filter(delivery::Column::CreatedAt.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(delivery::Column::CreatedAt.lte(end));
        }

        let paginator = select
            .order_by_desc(delivery::Column::CreatedAt)
            .paginate(&*self.db, query.limit.max(1));

        let total = paginator.num_items().await?;
        let deliveries = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        Ok((deliveries, total))
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: DeliveryPatch,
    ) -> Result<delivery::Model, ServiceError> {
        let current = self.get(id).await?;

        // Status changes go through the same history-appending path as the
        // dedicated endpoint so the history invariant holds everywhere.
        if let Some(next) = patch.status.filter(|next| *next != current.status) {
            self.update_status(id, next, None, None).await?;
        }

        let current = self.get(id).await?;
        let mut active: delivery::ActiveModel = current.into();
        if let Some(customer_name) = patch.customer_name {
            active.customer_name = Set(customer_name);
        }
        if let Some(customer_email) = patch.customer_email {
            active.customer_email = Set(customer_email);
        }
        if let Some(customer_phone) = patch.customer_phone {
            active.customer_phone = Set(customer_phone);
        }
        if let Some(address) = patch.delivery_address {
            active.delivery_address = Set(address);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(date) = patch.preferred_delivery_date {
            active.preferred_delivery_date = Set(Some(date));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::DeliveryUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Applies a status transition, appending a tracking history entry.
    /// Reaching `delivered` stamps the actual delivery date.
    #[instrument(skip(self, location))]
    pub async fn update_status(
        &self,
        id: Uuid,
        status: DeliveryStatus,
        notes: Option<String>,
        location: Option<TrackedLocation>,
    ) -> Result<delivery::Model, ServiceError> {
        let current = self.get(id).await?;
        Self::guard_transition(current.status, status, id)?;

        let old_status = current.status;
        let mut tracking = current.tracking.clone();
        tracking.history.push(TrackingEvent {
            timestamp: Utc::now(),
            status,
            location: location.clone(),
            notes,
        });
        if let Some(location) = location {
            tracking.current_location = Some(location);
        }
        if status == DeliveryStatus::Delivered {
            tracking.actual_delivery_date = Some(Utc::now());
        }

        let mut active: delivery::ActiveModel = current.into();
        active.status = Set(status);
        active.tracking = Set(tracking);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::DeliveryStatusChanged {
                delivery_id: updated.id,
                old_status: old_status.to_string(),
                new_status: status.to_string(),
            })
            .await;

        Ok(updated)
    }

    /// Records a courier position without an explicit status change. When an
    /// in-transit delivery comes within the arrival radius of its
    /// destination it advances to `arriving`.
    #[instrument(skip(self, location))]
    pub async fn update_location(
        &self,
        id: Uuid,
        location: TrackedLocation,
    ) -> Result<delivery::Model, ServiceError> {
        let current = self.get(id).await?;

        let mut tracking = current.tracking.clone();
        tracking.history.push(TrackingEvent {
            timestamp: Utc::now(),
            status: current.status,
            location: Some(location.clone()),
            notes: None,
        });
        tracking.current_location = Some(location.clone());

        let mut status = current.status;
        if status == DeliveryStatus::InTransit {
            let destination = self
                .geocoder
                .coordinates_for(&current.delivery_address)
                .await?;
            let distance = haversine_km(
                location.coordinates[0],
                location.coordinates[1],
                destination[0],
                destination[1],
            );
            if distance <= ARRIVAL_RADIUS_KM {
                status = DeliveryStatus::Arriving;
                tracking.history.push(TrackingEvent {
                    timestamp: Utc::now(),
                    status,
                    location: Some(location),
                    notes: Some("Approaching destination".to_string()),
                });
            }
        }

        let mut active: delivery::ActiveModel = current.into();
        active.status = Set(status);
        active.tracking = Set(tracking);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::DeliveryUpdated(updated.id))
            .await;

        Ok(updated)
    }

    /// Voids a delivery. Already-voided and completed deliveries are refused.
    #[instrument(skip(self))]
    pub async fn void_delivery(&self, id: Uuid) -> Result<delivery::Model, ServiceError> {
        let current = self.get(id).await?;

        if current.status == DeliveryStatus::Voided {
            return Err(ServiceError::InvalidTransition(
                "Delivery is already voided".to_string(),
            ));
        }
        if current.status == DeliveryStatus::Completed {
            return Err(ServiceError::InvalidTransition(
                "Cannot void a completed delivery".to_string(),
            ));
        }

        let mut tracking = current.tracking.clone();
        tracking.history.push(TrackingEvent {
            timestamp: Utc::now(),
            status: DeliveryStatus::Voided,
            location: None,
            notes: Some("Delivery voided".to_string()),
        });

        let mut active: delivery::ActiveModel = current.into();
        active.status = Set(DeliveryStatus::Voided);
        active.tracking = Set(tracking);
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::DeliveryVoided(updated.id))
            .await;

        Ok(updated)
    }

    /// Attaches proof of delivery. Only permitted while the delivery is in
    /// `delivered`, and only once; the status is left unchanged.
    #[instrument(skip(self, proof))]
    pub async fn add_proof_of_delivery(
        &self,
        id: Uuid,
        proof: ProofOfDeliveryInput,
    ) -> Result<delivery::Model, ServiceError> {
        let current = self.get(id).await?;

        if current.status != DeliveryStatus::Delivered {
            return Err(ServiceError::InvalidOperation(
                "Proof of delivery can only be added to delivered items".to_string(),
            ));
        }
        if current.proof_of_delivery.is_some() {
            return Err(ServiceError::InvalidOperation(
                "Proof of delivery already recorded".to_string(),
            ));
        }

        let mut active: delivery::ActiveModel = current.into();
        active.proof_of_delivery = Set(Some(ProofOfDelivery {
            received_by: proof.received_by,
            signature: proof.signature,
            photos: proof.photos,
            notes: proof.notes,
            timestamp: Utc::now(),
        }));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_best_effort(Event::ProofOfDeliveryAdded(updated.id))
            .await;

        Ok(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        let result = DeliveryEntity::delete_by_id(id).exec(&*self.db).await?;
        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!("Delivery {} not found", id)));
        }
        Ok(())
    }

    /// Creates a batch of deliveries inside a single transaction. A duplicate
    /// invoice/tracking number anywhere aborts the entire batch.
    #[instrument(skip(self, inputs))]
    pub async fn create_bulk(
        &self,
        inputs: Vec<NewDelivery>,
    ) -> Result<Vec<delivery::Model>, ServiceError> {
        let txn = self.db.begin().await?;

        let mut created = Vec::with_capacity(inputs.len());
        for input in inputs {
            let model = Self::build_active_model(input)
                .insert(&txn)
                .await
                .map_err(|e| {
                    ServiceError::from_db_err(
                        e,
                        "Duplicate invoice number detected. Please try again.",
                    )
                });
            match model {
                Ok(model) => created.push(model),
                Err(err) => {
                    txn.rollback().await?;
                    return Err(err);
                }
            }
        }

        txn.commit().await?;

        for model in &created {
            self.event_sender
                .send_best_effort(Event::DeliveryCreated(model.id))
                .await;
        }

        Ok(created)
    }

    /// Applies a batch of patches inside a single transaction; any invalid
    /// transition or missing delivery aborts the batch.
    #[instrument(skip(self, updates))]
    pub async fn update_bulk(
        &self,
        updates: Vec<(Uuid, DeliveryPatch)>,
    ) -> Result<Vec<delivery::Model>, ServiceError> {
        let txn = self.db.begin().await?;

        let mut updated = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            match Self::apply_patch_in_txn(&txn, id, patch).await {
                Ok(model) => updated.push(model),
                Err(err) => {
                    txn.rollback().await?;
                    return Err(err);
                }
            }
        }

        txn.commit().await?;

        for model in &updated {
            self.event_sender
                .send_best_effort(Event::DeliveryUpdated(model.id))
                .await;
        }

        Ok(updated)
    }

    async fn apply_patch_in_txn<C: sea_orm::ConnectionTrait>(
        conn: &C,
        id: Uuid,
        patch: DeliveryPatch,
    ) -> Result<delivery::Model, ServiceError> {
        let current = DeliveryEntity::find_by_id(id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Delivery {} not found", id)))?;

        let mut tracking = current.tracking.clone();
        let mut status = current.status;
        if let Some(next) = patch.status.filter(|next| *next != current.status) {
            Self::guard_transition(current.status, next, id)?;
            tracking.history.push(TrackingEvent {
                timestamp: Utc::now(),
                status: next,
                location: None,
                notes: None,
            });
            if next == DeliveryStatus::Delivered {
                tracking.actual_delivery_date = Some(Utc::now());
            }
            status = next;
        }

        let mut active: delivery::ActiveModel = current.into();
        active.status = Set(status);
        active.tracking = Set(tracking);
        if let Some(customer_name) = patch.customer_name {
            active.customer_name = Set(customer_name);
        }
        if let Some(customer_email) = patch.customer_email {
            active.customer_email = Set(customer_email);
        }
        if let Some(customer_phone) = patch.customer_phone {
            active.customer_phone = Set(customer_phone);
        }
        if let Some(address) = patch.delivery_address {
            active.delivery_address = Set(address);
        }
        if let Some(notes) = patch.notes {
            active.notes = Set(Some(notes));
        }
        if let Some(date) = patch.preferred_delivery_date {
            active.preferred_delivery_date = Set(Some(date));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(conn).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_numbers_carry_date_prefix_and_random_suffix() {
        let number = DeliveryService::generate_invoice_number();
        assert!(number.starts_with("INV"));
        let (prefix, suffix) = number.split_once('-').expect("dash separator");
        assert_eq!(prefix.len(), "INV".len() + 6);
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn terminal_states_admit_no_transition() {
        let id = Uuid::new_v4();
        for current in [DeliveryStatus::Cancelled, DeliveryStatus::Voided] {
            for next in [
                DeliveryStatus::Pending,
                DeliveryStatus::Delivered,
                DeliveryStatus::Returned,
            ] {
                assert!(DeliveryService::guard_transition(current, next, id).is_err());
            }
        }
    }

    #[test]
    fn completed_only_transitions_to_returned() {
        let id = Uuid::new_v4();
        assert!(DeliveryService::guard_transition(
            DeliveryStatus::Completed,
            DeliveryStatus::Returned,
            id
        )
        .is_ok());
        assert!(DeliveryService::guard_transition(
            DeliveryStatus::Completed,
            DeliveryStatus::Pending,
            id
        )
        .is_err());
    }

    #[test]
    fn everything_else_is_unrestricted() {
        let id = Uuid::new_v4();
        // The loose state machine allows e.g. delivered -> pending.
        assert!(DeliveryService::guard_transition(
            DeliveryStatus::Delivered,
            DeliveryStatus::Pending,
            id
        )
        .is_ok());
        assert!(DeliveryService::guard_transition(
            DeliveryStatus::Pending,
            DeliveryStatus::Completed,
            id
        )
        .is_ok());
    }
}
