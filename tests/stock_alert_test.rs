//! Alert engine: threshold scan with first-seen threshold snapshots, expiry
//! scan, and the stock report aggregation.

mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;
use warehouse_api::{
    entities::stock_movement::MovementType,
    events::{Event, StockAlertType},
    services::stock_movements::NewStockMovement,
};

fn movement(item_id: Uuid, quantity: i32) -> NewStockMovement {
    NewStockMovement {
        movement_type: MovementType::In,
        item_id,
        quantity,
        location_id: Uuid::new_v4(),
        to_location_id: None,
        reason: "receipt".to_string(),
        reference: None,
        notes: None,
        batch_number: None,
        expiry_date: None,
        manufacturing_date: None,
        unit_cost: None,
        minimum_threshold: None,
        maximum_threshold: None,
    }
}

fn alerts_from(events: Vec<Event>) -> Vec<(Uuid, i32, StockAlertType)> {
    events
        .into_iter()
        .filter_map(|event| match event {
            Event::StockAlert {
                item_id,
                current_stock,
                alert_type,
                ..
            } => Some((item_id, current_stock, alert_type)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn low_and_excess_stock_alerts_fire_per_item() {
    let mut app = TestApp::new().await;
    let operator = Uuid::new_v4();

    let low_item = Uuid::new_v4();
    let mut low = movement(low_item, 5);
    low.minimum_threshold = Some(10);
    low.maximum_threshold = Some(100);
    app.services.movements.create(low, operator).await.unwrap();

    let excess_item = Uuid::new_v4();
    let mut excess = movement(excess_item, 50);
    excess.minimum_threshold = Some(1);
    excess.maximum_threshold = Some(20);
    app.services
        .movements
        .create(excess, operator)
        .await
        .unwrap();

    // No thresholds, no alert.
    let quiet_item = Uuid::new_v4();
    app.services
        .movements
        .create(movement(quiet_item, 3), operator)
        .await
        .unwrap();

    app.drain_events();
    let fired = app.services.stock_alerts.check_stock_levels().await.unwrap();
    assert_eq!(fired, 2);

    let alerts = alerts_from(app.drain_events());
    assert_eq!(alerts.len(), 2);
    assert!(alerts
        .iter()
        .any(|(id, stock, kind)| *id == low_item
            && *stock == 5
            && *kind == StockAlertType::LowStock));
    assert!(alerts
        .iter()
        .any(|(id, stock, kind)| *id == excess_item
            && *stock == 50
            && *kind == StockAlertType::ExcessStock));
}

#[tokio::test]
async fn thresholds_come_from_the_first_movement_of_the_group() {
    let mut app = TestApp::new().await;
    let operator = Uuid::new_v4();
    let item = Uuid::new_v4();

    // First row carries no thresholds; a later row does. The scan keeps the
    // first-seen (absent) snapshot, so no alert fires even though the later
    // threshold would flag the total.
    app.services
        .movements
        .create(movement(item, 2), operator)
        .await
        .unwrap();
    let mut second = movement(item, 1);
    second.minimum_threshold = Some(100);
    app.services
        .movements
        .create(second, operator)
        .await
        .unwrap();

    app.drain_events();
    let fired = app.services.stock_alerts.check_stock_levels().await.unwrap();
    assert_eq!(fired, 0);
    assert!(alerts_from(app.drain_events()).is_empty());
}

#[tokio::test]
async fn expiry_scan_flags_movements_within_thirty_days() {
    let mut app = TestApp::new().await;
    let operator = Uuid::new_v4();

    let soon_item = Uuid::new_v4();
    let mut soon = movement(soon_item, 4);
    soon.batch_number = Some("B-100".to_string());
    soon.expiry_date = Some(Utc::now() + Duration::days(10));
    app.services.movements.create(soon, operator).await.unwrap();

    let mut far = movement(Uuid::new_v4(), 4);
    far.expiry_date = Some(Utc::now() + Duration::days(60));
    app.services.movements.create(far, operator).await.unwrap();

    app.drain_events();
    let flagged = app.services.stock_alerts.check_expiry_dates().await.unwrap();
    assert_eq!(flagged, 1);

    let expiries: Vec<_> = app
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            Event::StockExpiry {
                item_id,
                batch_number,
                quantity,
                ..
            } => Some((item_id, batch_number, quantity)),
            _ => None,
        })
        .collect();
    assert_eq!(expiries.len(), 1);
    assert_eq!(expiries[0], (soon_item, Some("B-100".to_string()), 4));
}

#[tokio::test]
async fn stock_report_aggregates_per_item_with_value() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();

    // The report joins item details, so the item must exist. Seeding with
    // zero stock keeps the journal free of extra rows.
    let item_id = app.seed_item("RPT-1", 0, 1, 100).await;

    let mut first = movement(item_id, 10);
    first.unit_cost = Some(dec!(2.00));
    app.services.movements.create(first, operator).await.unwrap();

    let mut second = movement(item_id, 5);
    second.unit_cost = Some(dec!(4.00));
    app.services
        .movements
        .create(second, operator)
        .await
        .unwrap();

    let report = app.services.stock_alerts.generate_stock_report().await.unwrap();
    let row = report
        .iter()
        .find(|row| row.item.id == item_id)
        .expect("report row for seeded item");

    assert_eq!(row.total_quantity, 15);
    assert_eq!(row.average_unit_cost, Some(dec!(3.00)));
    // 10 * 2.00 + 5 * 4.00
    assert_eq!(row.total_value, dec!(40.00));
}

#[tokio::test]
async fn alert_listing_filters_by_item() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();
    let item = Uuid::new_v4();

    app.services
        .movements
        .create(movement(item, 1), operator)
        .await
        .unwrap();
    app.services
        .movements
        .create(movement(Uuid::new_v4(), 1), operator)
        .await
        .unwrap();

    let rows = app
        .services
        .stock_alerts
        .get_stock_alerts(warehouse_api::services::stock_alerts::StockAlertQuery {
            item_id: Some(item),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item_id, item);
}
