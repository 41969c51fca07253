//! Delivery lifecycle: creation seeding, loose state machine with its two
//! hard rules, append-only history, proof of delivery and transactional bulk
//! operations.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use uuid::Uuid;
use warehouse_api::{
    entities::delivery::{DeliveryStatus, TrackedLocation},
    errors::ServiceError,
    services::deliveries::{DeliveryPatch, ProofOfDeliveryInput},
};

fn proof() -> ProofOfDeliveryInput {
    ProofOfDeliveryInput {
        received_by: "B. Receiver".to_string(),
        signature: Some("sig-data".to_string()),
        photos: None,
        notes: None,
    }
}

#[tokio::test]
async fn creation_seeds_pending_with_one_history_entry() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;

    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    assert_eq!(delivery.status, DeliveryStatus::Pending);
    assert_eq!(delivery.tracking.history.len(), 1);
    let first = &delivery.tracking.history[0];
    assert_eq!(first.status, DeliveryStatus::Pending);
    assert_eq!(first.notes.as_deref(), Some("Delivery created"));
    assert!(delivery.invoice_number.starts_with("INV"));
    assert!(delivery.tracking.actual_delivery_date.is_none());
}

#[tokio::test]
async fn creation_requires_an_existing_company() {
    let app = TestApp::new().await;

    let err = app
        .services
        .deliveries
        .create(app.new_delivery(Uuid::new_v4()))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delivered_then_voided_scenario() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    let delivered = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Delivered, None, None)
        .await
        .unwrap();
    assert_eq!(delivered.status, DeliveryStatus::Delivered);
    assert_eq!(delivered.tracking.history.len(), 2);
    assert!(delivered.tracking.actual_delivery_date.is_some());

    // Delivered is not completed, so voiding is allowed.
    let voided = app
        .services
        .deliveries
        .void_delivery(delivery.id)
        .await
        .unwrap();
    assert_eq!(voided.status, DeliveryStatus::Voided);
    assert_eq!(
        voided.tracking.history.last().unwrap().notes.as_deref(),
        Some("Delivery voided")
    );
}

#[tokio::test]
async fn terminal_states_reject_transitions_without_mutating() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    app.services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Cancelled, None, None)
        .await
        .unwrap();
    let before = app.services.deliveries.get(delivery.id).await.unwrap();

    let err = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Confirmed, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let after = app.services.deliveries.get(delivery.id).await.unwrap();
    assert_eq!(after.status, DeliveryStatus::Cancelled);
    assert_eq!(
        after.tracking.history.len(),
        before.tracking.history.len()
    );

    // Voiding a cancelled delivery is also off the table.
    let err = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Voided, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));
}

#[tokio::test]
async fn completed_can_only_be_returned_and_never_voided() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    app.services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Completed, None, None)
        .await
        .unwrap();

    let err = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Pending, None, None)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let err = app
        .services
        .deliveries
        .void_delivery(delivery.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    let returned = app
        .services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Returned, None, None)
        .await
        .unwrap();
    assert_eq!(returned.status, DeliveryStatus::Returned);
}

#[tokio::test]
async fn history_only_grows_with_non_decreasing_timestamps() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    let path = [
        DeliveryStatus::Confirmed,
        DeliveryStatus::Assigned,
        DeliveryStatus::PickedUp,
        DeliveryStatus::InTransit,
        DeliveryStatus::OutForDelivery,
        DeliveryStatus::Delivered,
    ];

    let mut last_len = 1;
    for status in path {
        let updated = app
            .services
            .deliveries
            .update_status(delivery.id, status, None, None)
            .await
            .unwrap();
        assert_eq!(updated.tracking.history.len(), last_len + 1);
        last_len += 1;
    }

    let final_state = app.services.deliveries.get(delivery.id).await.unwrap();
    let timestamps: Vec<_> = final_state
        .tracking
        .history
        .iter()
        .map(|entry| entry.timestamp)
        .collect();
    assert!(timestamps.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn proof_of_delivery_requires_delivered_and_is_write_once() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    // Pending delivery: refused without mutation.
    let err = app
        .services
        .deliveries
        .add_proof_of_delivery(delivery.id, proof())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
    let unchanged = app.services.deliveries.get(delivery.id).await.unwrap();
    assert!(unchanged.proof_of_delivery.is_none());

    app.services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::Delivered, None, None)
        .await
        .unwrap();

    let with_proof = app
        .services
        .deliveries
        .add_proof_of_delivery(delivery.id, proof())
        .await
        .unwrap();
    let recorded = with_proof.proof_of_delivery.expect("proof recorded");
    assert_eq!(recorded.received_by, "B. Receiver");
    // Status is untouched by proof capture.
    assert_eq!(with_proof.status, DeliveryStatus::Delivered);

    let err = app
        .services
        .deliveries
        .add_proof_of_delivery(delivery.id, proof())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
async fn update_with_status_change_appends_history() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    let updated = app
        .services
        .deliveries
        .update(
            delivery.id,
            DeliveryPatch {
                notes: Some("leave at the door".to_string()),
                status: Some(DeliveryStatus::Confirmed),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, DeliveryStatus::Confirmed);
    assert_eq!(updated.notes.as_deref(), Some("leave at the door"));
    assert_eq!(updated.tracking.history.len(), 2);
}

#[tokio::test]
async fn bulk_create_inserts_every_delivery() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;

    let created = app
        .services
        .deliveries
        .create_bulk(vec![
            app.new_delivery(company),
            app.new_delivery(company),
            app.new_delivery(company),
        ])
        .await
        .unwrap();
    assert_eq!(created.len(), 3);

    let (_, total) = app
        .services
        .deliveries
        .list(Default::default())
        .await
        .unwrap();
    assert_eq!(total, 3);
}

#[tokio::test]
async fn location_updates_append_history_and_detect_arrival() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;
    let delivery = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();

    app.services
        .deliveries
        .update_status(delivery.id, DeliveryStatus::InTransit, None, None)
        .await
        .unwrap();

    // Far from the (stubbed) destination: position recorded, status kept.
    let far = app
        .services
        .deliveries
        .update_location(
            delivery.id,
            TrackedLocation {
                coordinates: [10.0, 10.0],
                address: "somewhere en route".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(far.status, DeliveryStatus::InTransit);
    assert_eq!(far.tracking.history.len(), 3);
    assert!(far.tracking.current_location.is_some());

    // Within the arrival radius of the destination coordinates.
    let near = app
        .services
        .deliveries
        .update_location(
            delivery.id,
            TrackedLocation {
                coordinates: [0.0003, 0.0],
                address: "around the corner".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(near.status, DeliveryStatus::Arriving);
    // Position entry plus the arriving transition entry.
    assert_eq!(near.tracking.history.len(), 5);
}

#[tokio::test]
async fn bulk_update_is_all_or_nothing() {
    let app = TestApp::new().await;
    let company = app.seed_company("ACME").await;

    let healthy = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();
    let cancelled = app
        .services
        .deliveries
        .create(app.new_delivery(company))
        .await
        .unwrap();
    app.services
        .deliveries
        .update_status(cancelled.id, DeliveryStatus::Cancelled, None, None)
        .await
        .unwrap();

    let confirm = DeliveryPatch {
        status: Some(DeliveryStatus::Confirmed),
        ..Default::default()
    };
    let err = app
        .services
        .deliveries
        .update_bulk(vec![
            (healthy.id, confirm.clone()),
            (cancelled.id, confirm),
        ])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidTransition(_));

    // The valid entry was rolled back with the batch.
    let untouched = app.services.deliveries.get(healthy.id).await.unwrap();
    assert_eq!(untouched.status, DeliveryStatus::Pending);
    assert_eq!(untouched.tracking.history.len(), 1);
}
