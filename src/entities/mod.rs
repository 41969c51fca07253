//! SeaORM entities for the warehouse domain.
//!
//! Status enums are stored as text columns; nested documents (tracking
//! history, delivery items, invoice lines) are stored as JSON columns and
//! surfaced through typed structs.

pub mod delivery;
pub mod delivery_company;
pub mod inventory_item;
pub mod location;
pub mod stock_movement;
pub mod supplier;
pub mod supplier_invoice;
pub mod user;
