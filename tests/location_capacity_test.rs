//! Location ledger: 0 <= used_capacity <= capacity, with no partial apply on
//! violation.

mod common;

use assert_matches::assert_matches;
use common::TestApp;
use warehouse_api::errors::ServiceError;

#[tokio::test]
async fn capacity_increase_within_bounds_persists() {
    let app = TestApp::new().await;
    let id = app.seed_location("Main", 100).await;

    let updated = app
        .services
        .locations
        .update_capacity(&*app.db, id, 90)
        .await
        .unwrap();
    assert_eq!(updated.used_capacity, 90);
}

#[tokio::test]
async fn exceeding_capacity_fails_without_mutation() {
    let app = TestApp::new().await;
    let id = app.seed_location("Main", 100).await;

    app.services
        .locations
        .update_capacity(&*app.db, id, 90)
        .await
        .unwrap();

    let err = app
        .services
        .locations
        .update_capacity(&*app.db, id, 20)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::CapacityExceeded(_));

    let unchanged = app.services.locations.get(id).await.unwrap();
    assert_eq!(unchanged.used_capacity, 90);
}

#[tokio::test]
async fn negative_capacity_fails_without_mutation() {
    let app = TestApp::new().await;
    let id = app.seed_location("Main", 100).await;

    app.services
        .locations
        .update_capacity(&*app.db, id, 10)
        .await
        .unwrap();

    let err = app
        .services
        .locations
        .update_capacity(&*app.db, id, -11)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NegativeCapacity(_));

    let unchanged = app.services.locations.get(id).await.unwrap();
    assert_eq!(unchanged.used_capacity, 10);
}

#[tokio::test]
async fn occupied_locations_cannot_be_deleted() {
    let app = TestApp::new().await;
    let id = app.seed_location("Main", 100).await;

    app.services
        .locations
        .update_capacity(&*app.db, id, 5)
        .await
        .unwrap();

    let err = app.services.locations.delete(id).await.unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    // Emptying the location unblocks deletion.
    app.services
        .locations
        .update_capacity(&*app.db, id, -5)
        .await
        .unwrap();
    app.services.locations.delete(id).await.unwrap();

    let err = app.services.locations.get(id).await.unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}
