use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Delivery lifecycle states.
///
/// The state machine is deliberately loose: only two transition rules are
/// enforced (see `DeliveryService::guard_transition`). `all` is accepted by
/// list filters as a query-only pseudo-value and never stored.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "picked_up")]
    PickedUp,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "arriving")]
    Arriving,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "voided")]
    Voided,
}

impl DeliveryStatus {
    /// Terminal states admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Cancelled | DeliveryStatus::Voided)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Confirmed => "confirmed",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::PickedUp => "picked_up",
            DeliveryStatus::InTransit => "in_transit",
            DeliveryStatus::Arriving => "arriving",
            DeliveryStatus::OutForDelivery => "out_for_delivery",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Completed => "completed",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Returned => "returned",
            DeliveryStatus::Cancelled => "cancelled",
            DeliveryStatus::Voided => "voided",
        };
        write!(f, "{}", label)
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(DeliveryStatus::Pending),
            "confirmed" => Ok(DeliveryStatus::Confirmed),
            "assigned" => Ok(DeliveryStatus::Assigned),
            "picked_up" => Ok(DeliveryStatus::PickedUp),
            "in_transit" => Ok(DeliveryStatus::InTransit),
            "arriving" => Ok(DeliveryStatus::Arriving),
            "out_for_delivery" => Ok(DeliveryStatus::OutForDelivery),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "completed" => Ok(DeliveryStatus::Completed),
            "failed" => Ok(DeliveryStatus::Failed),
            "returned" => Ok(DeliveryStatus::Returned),
            "cancelled" => Ok(DeliveryStatus::Cancelled),
            "voided" => Ok(DeliveryStatus::Voided),
            other => Err(format!("unknown delivery status '{}'", other)),
        }
    }
}

/// Structured destination address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DeliveryAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// A geographic position with its human-readable address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedLocation {
    /// [latitude, longitude]
    pub coordinates: [f64; 2],
    pub address: String,
}

/// One entry of the append-only tracking history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub timestamp: DateTime<Utc>,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<TrackedLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct DeliveryTracking {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_location: Option<TrackedLocation>,
    pub history: Vec<TrackingEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_date: Option<DateTime<Utc>>,
}

/// A delivered line item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeliveryItem {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct DeliveryItems(pub Vec<DeliveryItem>);

/// A named percentage-based charge applied on top of VAT.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdditionalTax {
    pub tax_name: String,
    pub rate: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct AdditionalTaxes(pub Vec<AdditionalTax>);

/// Captured once, when the delivery has been handed over.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ProofOfDelivery {
    pub received_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "deliveries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    #[sea_orm(column_type = "Json")]
    pub delivery_address: DeliveryAddress,
    #[sea_orm(column_type = "Json")]
    pub items: DeliveryItems,
    pub delivery_company_id: Uuid,
    pub vat_rate: Decimal,
    #[sea_orm(column_type = "Json", nullable)]
    pub additional_taxes: Option<AdditionalTaxes>,
    pub notes: Option<String>,
    pub preferred_delivery_date: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    #[sea_orm(column_type = "Json")]
    pub tracking: DeliveryTracking,
    #[sea_orm(column_type = "Json", nullable)]
    pub proof_of_delivery: Option<ProofOfDelivery>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::OutForDelivery,
            DeliveryStatus::Voided,
        ] {
            let parsed: DeliveryStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn only_cancelled_and_voided_are_terminal() {
        assert!(DeliveryStatus::Cancelled.is_terminal());
        assert!(DeliveryStatus::Voided.is_terminal());
        assert!(!DeliveryStatus::Completed.is_terminal());
        assert!(!DeliveryStatus::Failed.is_terminal());
    }
}
