use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Derived stock status for an inventory item.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[sea_orm(string_value = "in_stock")]
    InStock,
    #[sea_orm(string_value = "low_stock")]
    LowStock,
    #[sea_orm(string_value = "out_of_stock")]
    OutOfStock,
}

impl ItemStatus {
    /// Status is a pure function of the current and minimum stock levels and
    /// must be recomputed on every stock-affecting write.
    pub fn derive(current_stock: i32, min_stock: i32) -> Self {
        if current_stock == 0 {
            ItemStatus::OutOfStock
        } else if current_stock <= min_stock {
            ItemStatus::LowStock
        } else {
            ItemStatus::InStock
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemStatus::InStock => write!(f, "in_stock"),
            ItemStatus::LowStock => write!(f, "low_stock"),
            ItemStatus::OutOfStock => write!(f, "out_of_stock"),
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "in_stock" => Ok(ItemStatus::InStock),
            "low_stock" => Ok(ItemStatus::LowStock),
            "out_of_stock" => Ok(ItemStatus::OutOfStock),
            other => Err(format!("unknown item status '{}'", other)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub sku: String,
    pub description: String,
    pub category: String,
    pub current_stock: i32,
    pub min_stock: i32,
    pub max_stock: i32,
    pub buying_price: Decimal,
    pub unit_price: Decimal,
    pub image: Option<String>,
    pub status: ItemStatus,
    pub location_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn status_derivation_covers_all_bands() {
        assert_eq!(ItemStatus::derive(0, 10), ItemStatus::OutOfStock);
        assert_eq!(ItemStatus::derive(5, 10), ItemStatus::LowStock);
        assert_eq!(ItemStatus::derive(10, 10), ItemStatus::LowStock);
        assert_eq!(ItemStatus::derive(11, 10), ItemStatus::InStock);
    }

    proptest! {
        #[test]
        fn status_is_total_and_consistent(current in 0i32..100_000, min in 0i32..100_000) {
            let status = ItemStatus::derive(current, min);
            match status {
                ItemStatus::OutOfStock => prop_assert_eq!(current, 0),
                ItemStatus::LowStock => prop_assert!(current > 0 && current <= min),
                ItemStatus::InStock => prop_assert!(current > min),
            }
        }
    }
}
