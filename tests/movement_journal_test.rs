//! Stock movement journal: pending creation, unguarded void/cancel stamps,
//! filtering and bulk deletion.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use uuid::Uuid;
use warehouse_api::{
    entities::stock_movement::{MovementStatus, MovementType},
    errors::ServiceError,
    services::stock_movements::{NewStockMovement, StockMovementQuery},
};

fn movement(movement_type: MovementType, quantity: i32) -> NewStockMovement {
    NewStockMovement {
        movement_type,
        item_id: Uuid::new_v4(),
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

#[tokio::test]
async fn movements_are_created_pending() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();

    let created = app
        .services
        .movements
        .create(movement(MovementType::In, 5), operator)
        .await
        .unwrap();

    assert_eq!(created.status, MovementStatus::Pending);
    assert_eq!(created.created_by, operator);
    assert!(created.voided_at.is_none());
}

#[tokio::test]
async fn non_positive_quantity_is_rejected() {
    let app = TestApp::new().await;

    let err = app
        .services
        .movements
        .create(movement(MovementType::In, 0), Uuid::new_v4())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn void_and_cancel_stamp_without_transition_guards() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();
    let auditor = Uuid::new_v4();

    let created = app
        .services
        .movements
        .create(movement(MovementType::Out, 2), operator)
        .await
        .unwrap();

    let voided = app
        .services
        .movements
        .void_movement(created.id, auditor)
        .await
        .unwrap();
    assert_eq!(voided.status, MovementStatus::Voided);
    assert_eq!(voided.voided_by, Some(auditor));
    assert!(voided.voided_at.is_some());

    // No terminal-state guard: a voided movement can still be cancelled.
    let cancelled = app
        .services
        .movements
        .cancel_movement(created.id, auditor)
        .await
        .unwrap();
    assert_eq!(cancelled.status, MovementStatus::Cancelled);
    assert!(cancelled.cancelled_at.is_some());
    // The void stamp survives the overwrite.
    assert_eq!(cancelled.voided_by, Some(auditor));
}

#[tokio::test]
async fn list_filters_by_type_and_status() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();

    app.services
        .movements
        .create(movement(MovementType::In, 1), operator)
        .await
        .unwrap();
    let out = app
        .services
        .movements
        .create(movement(MovementType::Out, 1), operator)
        .await
        .unwrap();
    app.services
        .movements
        .void_movement(out.id, operator)
        .await
        .unwrap();

    let (ins, total_in) = app
        .services
        .movements
        .list(StockMovementQuery {
            movement_type: Some(MovementType::In),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total_in, 1);
    assert_eq!(ins[0].movement_type, MovementType::In);

    let (voided, total_voided) = app
        .services
        .movements
        .list(StockMovementQuery {
            status: Some(MovementStatus::Voided),
            page: 1,
            limit: 10,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(total_voided, 1);
    assert_eq!(voided[0].id, out.id);
}

#[tokio::test]
async fn bulk_delete_requires_a_match() {
    let app = TestApp::new().await;
    let operator = Uuid::new_v4();

    let err = app
        .services
        .movements
        .delete_bulk(vec![Uuid::new_v4()])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));

    let first = app
        .services
        .movements
        .create(movement(MovementType::In, 1), operator)
        .await
        .unwrap();
    let second = app
        .services
        .movements
        .create(movement(MovementType::In, 2), operator)
        .await
        .unwrap();

    let deleted = app
        .services
        .movements
        .delete_bulk(vec![first.id, second.id])
        .await
        .unwrap();
    assert_eq!(deleted, 2);

    let err = app.services.movements.get(first.id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
