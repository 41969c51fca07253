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
pub enum MovementType {
    #[sea_orm(string_value = "in")]
    In,
    #[sea_orm(string_value = "out")]
    Out,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementType::In => write!(f, "in"),
            MovementType::Out => write!(f, "out"),
            MovementType::Transfer => write!(f, "transfer"),
        }
    }
}

impl std::str::FromStr for MovementType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            "transfer" => Ok(MovementType::Transfer),
            other => Err(format!("unknown movement type '{}'", other)),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "voided")]
    Voided,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for MovementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MovementStatus::Pending => write!(f, "pending"),
            MovementStatus::Completed => write!(f, "completed"),
            MovementStatus::Voided => write!(f, "voided"),
            MovementStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for MovementStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(MovementStatus::Pending),
            "completed" => Ok(MovementStatus::Completed),
            "voided" => Ok(MovementStatus::Voided),
            "cancelled" => Ok(MovementStatus::Cancelled),
            other => Err(format!("unknown movement status '{}'", other)),
        }
    }
}

/// Outcome of a quality inspection attached to a movement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct QualityChecks {
    pub checked_by: String,
    pub checked_at: DateTime<Utc>,
    pub passed: bool,
    pub notes: Option<String>,
}

/// A single recorded stock-affecting event. Rows are immutable in spirit:
/// apart from void/cancel stamps and explicit bulk deletes they are never
/// rewritten once posted.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub movement_type: MovementType,
    pub item_id: Uuid,
    pub quantity: i32,
    pub location_id: Uuid,
    pub to_location_id: Option<Uuid>,
    pub reason: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub status: MovementStatus,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub manufacturing_date: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Json", nullable)]
    pub quality_checks: Option<QualityChecks>,
    pub unit_cost: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    /// Alert thresholds snapshotted at creation time; the alert scan reads
    /// these, not the item's current thresholds.
    pub minimum_threshold: Option<i32>,
    pub maximum_threshold: Option<i32>,
    pub voided_at: Option<DateTime<Utc>>,
    pub voided_by: Option<Uuid>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
