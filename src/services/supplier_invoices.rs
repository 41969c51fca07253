use crate::{
    entities::supplier_invoice::{
        self, Entity as SupplierInvoiceEntity, InvoiceLine, InvoiceLines, InvoiceStatus,
        InvoiceTax, InvoiceTaxes,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::inventory::InventoryService,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone)]
pub struct NewInvoiceLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Clone)]
pub struct NewSupplierInvoice {
    pub invoice_ref: String,
    pub supplier_id: Uuid,
    pub invoice_date: DateTime<Utc>,
    pub items: Vec<NewInvoiceLine>,
    pub vat_rate: Decimal,
    pub additional_taxes: Vec<(String, Decimal)>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierInvoicePatch {
    pub status: Option<InvoiceStatus>,
    pub is_reconciled: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct SupplierInvoiceQuery {
    pub search: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub status: Option<InvoiceStatus>,
    pub is_reconciled: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: u64,
    pub limit: u64,
}

/// Aggregates computed over a listed page of invoices.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InvoiceStatistics {
    pub total_amount: Decimal,
    pub total_vat: Decimal,
    pub total_additional_taxes: Decimal,
    pub pending: u64,
    pub paid: u64,
    pub cancelled: u64,
    pub total_count: u64,
}

/// Supplier invoicing. Creation side-effects the inventory store (stock and
/// buying price); the compensation path deletes the invoice when that
/// side-effect fails, which is best-effort rather than atomic.
#[derive(Clone)]
pub struct SupplierInvoiceService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
    inventory: Arc<InventoryService>,
}

impl SupplierInvoiceService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: EventSender,
        inventory: Arc<InventoryService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            inventory,
        }
    }

    #[instrument(skip(self, input), fields(invoice_ref = %input.invoice_ref))]
    pub async fn create(
        &self,
        input: NewSupplierInvoice,
        created_by: Uuid,
    ) -> Result<supplier_invoice::Model, ServiceError> {
        let existing = SupplierInvoiceEntity::find()
            .filter(supplier_invoice::Column::InvoiceRef.eq(input.invoice_ref.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Invoice with reference {} already exists",
                input.invoice_ref
            )));
        }

        let mut subtotal = Decimal::ZERO;
        let mut lines = Vec::with_capacity(input.items.len());
        for line in &input.items {
            if line.quantity <= 0 {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid quantity for item {}",
                    line.item_id
                )));
            }
            if line.buying_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid buying price for item {}",
                    line.item_id
                )));
            }
            if line.tax_rate < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid tax rate for item {}",
                    line.item_id
                )));
            }

            let total_price = line.buying_price * Decimal::from(line.quantity);
            let tax_amount = total_price * line.tax_rate / HUNDRED;
            subtotal += total_price;

            lines.push(InvoiceLine {
                item_id: line.item_id,
                quantity: line.quantity,
                buying_price: line.buying_price,
                tax_rate: line.tax_rate,
                total_price,
                tax_amount,
            });
        }

        if input.vat_rate < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "VAT rate cannot be negative".to_string(),
            ));
        }
        let vat_amount = subtotal * input.vat_rate / HUNDRED;

        let mut additional_total = Decimal::ZERO;
        let mut additional_taxes = Vec::with_capacity(input.additional_taxes.len());
        for (tax_name, rate) in input.additional_taxes {
            if rate < Decimal::ZERO {
                return Err(ServiceError::ValidationError(format!(
                    "Invalid rate for tax {}",
                    tax_name
                )));
            }
            let amount = subtotal * rate / HUNDRED;
            additional_total += amount;
            additional_taxes.push(InvoiceTax {
                tax_name,
                rate,
                amount,
            });
        }

        let total_amount = subtotal + vat_amount + additional_total;
        let now = Utc::now();

        let invoice = supplier_invoice::ActiveModel {
            id: Set(Uuid::new_v4()),
            invoice_ref: Set(input.invoice_ref),
            supplier_id: Set(input.supplier_id),
            invoice_date: Set(input.invoice_date),
            items: Set(InvoiceLines(lines.clone())),
            subtotal: Set(subtotal),
            vat_rate: Set(input.vat_rate),
            vat_amount: Set(vat_amount),
            additional_taxes: Set(InvoiceTaxes(additional_taxes)),
            total_amount: Set(total_amount),
            status: Set(InvoiceStatus::Pending),
            is_reconciled: Set(false),
            reconciled_by: Set(None),
            created_by: Set(created_by),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .map_err(|e| ServiceError::from_db_err(e, "Invoice reference already exists"))?;

        // Receive the purchased stock and overwrite the buying price. When
        // any line fails the invoice is deleted again; there is no shared
        // transaction, so a crash mid-way can leave both sides applied.
        for line in &lines {
            let applied = async {
                self.inventory
                    .update_stock(line.item_id, line.quantity)
                    .await?;
                self.inventory
                    .update_buying_price(line.item_id, line.buying_price)
                    .await
            }
            .await;

            if let Err(err) = applied {
                error!(invoice_id = %invoice.id, item_id = %line.item_id, error = %err,
                    "inventory update failed; rolling back invoice");
                if let Err(delete_err) = SupplierInvoiceEntity::delete_by_id(invoice.id)
                    .exec(&*self.db)
                    .await
                {
                    error!(invoice_id = %invoice.id, error = %delete_err,
                        "failed to delete invoice during compensation");
                }
                return Err(ServiceError::InvalidOperation(format!(
                    "Failed to update inventory: {}",
                    err
                )));
            }
        }

        self.event_sender
            .send_best_effort(Event::SupplierInvoiceCreated(invoice.id))
            .await;

        Ok(invoice)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<supplier_invoice::Model, ServiceError> {
        SupplierInvoiceEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier invoice {} not found", id)))
    }

    #[instrument(skip(self, query))]
    pub async fn list(
        &self,
        query: SupplierInvoiceQuery,
    ) -> Result<(Vec<supplier_invoice::Model>, u64, InvoiceStatistics), ServiceError> {
        let mut select = SupplierInvoiceEntity::find();

        if let Some(search) = query.search.filter(|s| !s.is_empty()) {
            select = select.filter(supplier_invoice::Column::InvoiceRef.contains(search.as_str()));
        }
        if let Some(supplier_id) = query.supplier_id {
            select = select.filter(supplier_invoice::Column::SupplierId.eq(supplier_id));
        }
        if let Some(status) = query.status {
            select = select.filter(supplier_invoice::Column::Status.eq(status));
        }
        if let Some(is_reconciled) = query.is_reconciled {
            select = select.filter(supplier_invoice::Column::IsReconciled.eq(is_reconciled));
        }
        if let Some(start) = query.start_date {
            select = select.filter(supplier_invoice::Column::InvoiceDate.gte(start));
        }
        if let Some(end) = query.end_date {
            select = select.filter(supplier_invoice::Column::InvoiceDate.lte(end));
        }

        let paginator = select
            .order_by_desc(supplier_invoice::Column::InvoiceDate)
            .paginate(&*self.db, query.limit.max(1));

        let total = paginator.num_items().await?;
        let invoices = paginator.fetch_page(query.page.saturating_sub(1)).await?;

        // Statistics cover the returned page, not the whole table.
        let mut stats = InvoiceStatistics {
            total_amount: Decimal::ZERO,
            total_vat: Decimal::ZERO,
            total_additional_taxes: Decimal::ZERO,
            pending: 0,
            paid: 0,
            cancelled: 0,
            total_count: total,
        };
        for invoice in &invoices {
            stats.total_amount += invoice.total_amount;
            stats.total_vat += invoice.vat_amount;
            stats.total_additional_taxes += invoice
                .additional_taxes
                .0
                .iter()
                .map(|tax| tax.amount)
                .sum::<Decimal>();
            match invoice.status {
                InvoiceStatus::Pending => stats.pending += 1,
                InvoiceStatus::Paid => stats.paid += 1,
                InvoiceStatus::Cancelled => stats.cancelled += 1,
            }
        }

        Ok((invoices, total, stats))
    }

    /// Status moves: cancelled is terminal, paid can only become cancelled.
    /// Reconciliation is a one-way flag.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: Uuid,
        patch: SupplierInvoicePatch,
        updated_by: Uuid,
    ) -> Result<supplier_invoice::Model, ServiceError> {
        let current = self.get(id).await?;

        if let Some(next) = patch.status.filter(|next| *next != current.status) {
            if current.status == InvoiceStatus::Cancelled {
                return Err(ServiceError::InvalidTransition(
                    "Cannot update a cancelled invoice".to_string(),
                ));
            }
            if current.status == InvoiceStatus::Paid && next != InvoiceStatus::Cancelled {
                return Err(ServiceError::InvalidTransition(
                    "Paid invoice can only be cancelled".to_string(),
                ));
            }
        }

        if let Some(reconcile) = patch.is_reconciled {
            if current.is_reconciled && reconcile {
                return Err(ServiceError::InvalidOperation(
                    "Invoice is already reconciled".to_string(),
                ));
            }
            if current.is_reconciled && !reconcile {
                return Err(ServiceError::InvalidOperation(
                    "Cannot un-reconcile an invoice".to_string(),
                ));
            }
        }

        let mut active: supplier_invoice::ActiveModel = current.into();
        if let Some(status) = patch.status {
            active.status = Set(status);
        }
        if let Some(true) = patch.is_reconciled {
            active.is_reconciled = Set(true);
            active.reconciled_by = Set(Some(updated_by));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }
}
