use crate::{
    entities::delivery::{self, Entity as DeliveryEntity},
    errors::ServiceError,
    services::geocoding::GeocodingService,
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

#[derive(Debug, Clone)]
pub struct DeliveryPoint {
    pub delivery: delivery::Model,
    pub coordinates: [f64; 2],
}

/// Greedy nearest-neighbor ordering starting from the first point in input
/// order. A heuristic, not a solver: no backtracking, no optimality
/// guarantee.
pub fn sort_by_proximity(mut points: Vec<DeliveryPoint>) -> Vec<DeliveryPoint> {
    if points.len() <= 1 {
        return points;
    }

    let mut sorted = vec![points.remove(0)];
    while !points.is_empty() {
        let last = &sorted[sorted.len() - 1];
        let mut nearest_index = 0;
        let mut shortest = f64::MAX;

        for (i, candidate) in points.iter().enumerate() {
            let distance = haversine_km(
                last.coordinates[0],
                last.coordinates[1],
                candidate.coordinates[0],
                candidate.coordinates[1],
            );
            if distance < shortest {
                shortest = distance;
                nearest_index = i;
            }
        }

        sorted.push(points.remove(nearest_index));
    }

    sorted
}

/// Orders deliveries for a route using the nearest-neighbor heuristic.
#[derive(Clone)]
pub struct RouteOptimizationService {
    db: Arc<DatabaseConnection>,
    geocoder: Arc<GeocodingService>,
}

impl RouteOptimizationService {
    pub fn new(db: Arc<DatabaseConnection>, geocoder: Arc<GeocodingService>) -> Self {
        Self { db, geocoder }
    }

    #[instrument(skip(self))]
    pub async fn optimize_route(
        &self,
        delivery_ids: Vec<Uuid>,
    ) -> Result<Vec<delivery::Model>, ServiceError> {
        let deliveries = DeliveryEntity::find()
            .filter(delivery::Column::Id.is_in(delivery_ids))
            .all(&*self.db)
            .await?;

        let mut points = Vec::with_capacity(deliveries.len());
        for model in deliveries {
            let coordinates = self.geocoder.coordinates_for(&model.delivery_address).await?;
            points.push(DeliveryPoint {
                delivery: model,
                coordinates,
            });
        }

        Ok(sort_by_proximity(points)
            .into_iter()
            .map(|point| point.delivery)
            .collect())
    }
}
