use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "pending"),
            InvoiceStatus::Paid => write!(f, "paid"),
            InvoiceStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(format!("unknown invoice status '{}'", other)),
        }
    }
}

/// One purchased line. `total_price` and `tax_amount` are computed at
/// creation time and stored with the line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub item_id: Uuid,
    pub quantity: i32,
    pub buying_price: Decimal,
    pub tax_rate: Decimal,
    pub total_price: Decimal,
    pub tax_amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct InvoiceLines(pub Vec<InvoiceLine>);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvoiceTax {
    pub tax_name: String,
    pub rate: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct InvoiceTaxes(pub Vec<InvoiceTax>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "supplier_invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_ref: String,
    pub supplier_id: Uuid,
    pub invoice_date: DateTime<Utc>,
    #[sea_orm(column_type = "Json")]
    pub items: InvoiceLines,
    pub subtotal: Decimal,
    pub vat_rate: Decimal,
    pub vat_amount: Decimal,
    #[sea_orm(column_type = "Json")]
    pub additional_taxes: InvoiceTaxes,
    pub total_amount: Decimal,
    pub status: InvoiceStatus,
    /// One-way flag; set once and never cleared.
    pub is_reconciled: bool,
    pub reconciled_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
