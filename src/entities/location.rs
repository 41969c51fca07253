use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[sea_orm(string_value = "warehouse")]
    Warehouse,
    #[sea_orm(string_value = "store")]
    Store,
    #[sea_orm(string_value = "distribution_center")]
    DistributionCenter,
}

impl std::str::FromStr for LocationType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "warehouse" => Ok(LocationType::Warehouse),
            "store" => Ok(LocationType::Store),
            // Both spellings are accepted on input; stored canonically.
            "distribution_center" | "distribution-center" => Ok(LocationType::DistributionCenter),
            other => Err(format!(
                "invalid location type '{}'; must be one of: warehouse, store, distribution_center",
                other
            )),
        }
    }
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationType::Warehouse => write!(f, "warehouse"),
            LocationType::Store => write!(f, "store"),
            LocationType::DistributionCenter => write!(f, "distribution_center"),
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum LocationStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub capacity: i32,
    pub used_capacity: i32,
    pub location_type: LocationType,
    pub description: Option<String>,
    pub status: LocationStatus,
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
    fn accepts_both_distribution_center_spellings() {
        assert_eq!(
            "distribution-center".parse::<LocationType>().unwrap(),
            LocationType::DistributionCenter
        );
        assert_eq!(
            "distribution_center".parse::<LocationType>().unwrap(),
            LocationType::DistributionCenter
        );
        assert!("depot".parse::<LocationType>().is_err());
    }
}
