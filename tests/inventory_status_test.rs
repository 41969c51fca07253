//! Inventory item store: status derivation, SKU uniqueness, journal mirroring
//! and atomic stock updates.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;
use warehouse_api::{
    entities::inventory_item::ItemStatus,
    entities::stock_movement::{MovementStatus, MovementType},
    errors::ServiceError,
    services::inventory::{InventoryItemPatch, NewInventoryItem},
    services::stock_movements::StockMovementQuery,
};

fn item_input(sku: &str, current: i32, min: i32, max: i32) -> NewInventoryItem {
    NewInventoryItem {
        name: format!("Item {}", sku),
        sku: sku.to_string(),
        description: "test".into(),
        category: "general".into(),
        current_stock: current,
        min_stock: min,
        max_stock: max,
        buying_price: dec!(4.50),
        unit_price: dec!(7.00),
        image: None,
        location_id: None,
    }
}

#[tokio::test]
async fn create_derives_low_stock_status() {
    let app = TestApp::new().await;

    let item = app
        .services
        .inventory
        .create(item_input("A1", 5, 10, 50))
        .await
        .unwrap();

    assert_eq!(item.status, ItemStatus::LowStock);
}

#[tokio::test]
async fn create_covers_all_status_bands() {
    let app = TestApp::new().await;

    let out = app
        .services
        .inventory
        .create(item_input("OUT", 0, 10, 50))
        .await
        .unwrap();
    let healthy = app
        .services
        .inventory
        .create(item_input("OK", 30, 10, 50))
        .await
        .unwrap();

    assert_eq!(out.status, ItemStatus::OutOfStock);
    assert_eq!(healthy.status, ItemStatus::InStock);
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let app = TestApp::new().await;

    app.services
        .inventory
        .create(item_input("DUP-1", 1, 1, 10))
        .await
        .unwrap();
    let err = app
        .services
        .inventory
        .create(item_input("DUP-1", 2, 1, 10))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
async fn initial_stock_is_journalled() {
    let app = TestApp::new().await;

    let item = app
        .services
        .inventory
        .create(item_input("JRN", 7, 2, 50))
        .await
        .unwrap();

    let (movements, total) = app
        .services
        .movements
        .list(StockMovementQuery {
            item_id: Some(item.id),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(total, 1);
    let movement = &movements[0];
    assert_eq!(movement.movement_type, MovementType::In);
    assert_eq!(movement.quantity, 7);
    assert_eq!(movement.reason, "Initial stock");
    assert_eq!(movement.status, MovementStatus::Pending);
    assert_eq!(movement.created_by, Uuid::nil());
}

#[tokio::test]
async fn zero_initial_stock_posts_no_movement() {
    let app = TestApp::new().await;

    let item = app
        .services
        .inventory
        .create(item_input("EMPTY", 0, 2, 50))
        .await
        .unwrap();

    let (_, total) = app
        .services
        .movements
        .list(StockMovementQuery {
            item_id: Some(item.id),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(total, 0);
}

#[tokio::test]
async fn stock_edit_recomputes_status_and_posts_delta() {
    let app = TestApp::new().await;

    let item = app
        .services
        .inventory
        .create(item_input("EDIT", 20, 5, 50))
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::InStock);

    let updated = app
        .services
        .inventory
        .update(
            item.id,
            InventoryItemPatch {
                current_stock: Some(3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.current_stock, 3);
    assert_eq!(updated.status, ItemStatus::LowStock);

    let (movements, _) = app
        .services
        .movements
        .list(StockMovementQuery {
            item_id: Some(item.id),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    let adjustment = movements
        .iter()
        .find(|m| m.reason == "Manual stock adjustment")
        .expect("adjustment movement");
    assert_eq!(adjustment.movement_type, MovementType::Out);
    assert_eq!(adjustment.quantity, 17);
}

#[tokio::test]
async fn update_stock_increments_atomically_and_rederives_status() {
    let app = TestApp::new().await;

    let item = app
        .services
        .inventory
        .create(item_input("INC", 0, 10, 50))
        .await
        .unwrap();
    assert_eq!(item.status, ItemStatus::OutOfStock);

    // Two sequential single-statement increments; neither loses an update.
    app.services.inventory.update_stock(item.id, 1).await.unwrap();
    app.services.inventory.update_stock(item.id, 1).await.unwrap();

    let after = app.services.inventory.get(item.id).await.unwrap();
    assert_eq!(after.current_stock, 2);
    assert_eq!(after.status, ItemStatus::LowStock);

    app.services.inventory.update_stock(item.id, 20).await.unwrap();
    let full = app.services.inventory.get(item.id).await.unwrap();
    assert_eq!(full.current_stock, 22);
    assert_eq!(full.status, ItemStatus::InStock);
}

#[tokio::test]
async fn update_stock_of_missing_item_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .services
        .inventory
        .update_stock(Uuid::new_v4(), 1)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .inventory
        .update_buying_price(Uuid::new_v4(), dec!(1.00))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
