use crate::{
    entities::delivery::{self, DeliveryStatus, Entity as DeliveryEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Timelike, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// Hours after the first tracking entry within which a delivery counts as on
/// time.
const ON_TIME_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PerformanceMetrics {
    pub total_deliveries: u64,
    pub completed_deliveries: u64,
    pub failed_deliveries: u64,
    pub on_time_deliveries: u64,
    pub average_delivery_time_minutes: f64,
    /// completed / total; NaN (serialized as null) when there are no
    /// deliveries in the window.
    pub completion_rate: f64,
    /// on-time / completed; NaN (serialized as null) when nothing completed.
    pub on_time_rate: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyTrend {
    pub date: String,
    pub deliveries: u64,
    pub on_time: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HourlyTrend {
    pub hour: u32,
    pub deliveries: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeliveryTrends {
    pub daily: Vec<DailyTrend>,
    pub hourly: Vec<HourlyTrend>,
}

/// Derived delivery metrics. Read-only: scans the delivery set and folds.
#[derive(Clone)]
pub struct DeliveryAnalyticsService {
    db: Arc<DatabaseConnection>,
}

impl DeliveryAnalyticsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn first_history_timestamp(model: &delivery::Model) -> Option<DateTime<Utc>> {
        model.tracking.history.first().map(|entry| entry.timestamp)
    }

    /// Delivery duration in minutes, when both endpoints are known.
    fn delivery_time_minutes(model: &delivery::Model) -> Option<f64> {
        let start = Self::first_history_timestamp(model)?;
        let end = model.tracking.actual_delivery_date?;
        Some((end - start).num_seconds() as f64 / 60.0)
    }

    /// On time means delivered within 24 hours of the first tracking entry.
    fn is_on_time(model: &delivery::Model) -> bool {
        let (Some(start), Some(actual)) = (
            Self::first_history_timestamp(model),
            model.tracking.actual_delivery_date,
        ) else {
            return false;
        };
        actual <= start + chrono::Duration::hours(ON_TIME_WINDOW_HOURS)
    }

    fn in_window(model: &delivery::Model, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        model
            .tracking
            .history
            .iter()
            .any(|entry| entry.timestamp >= start && entry.timestamp <= end)
    }

    #[instrument(skip(self))]
    pub async fn performance_metrics(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<PerformanceMetrics, ServiceError> {
        let deliveries: Vec<delivery::Model> = DeliveryEntity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .filter(|d| Self::in_window(d, start, end))
            .collect();

        let mut completed = 0u64;
        let mut failed = 0u64;
        let mut on_time = 0u64;
        let mut total_minutes = 0.0;
        let mut timed = 0u64;

        for model in &deliveries {
            match model.status {
                DeliveryStatus::Delivered => {
                    completed += 1;
                    if Self::is_on_time(model) {
                        on_time += 1;
                    }
                    if let Some(minutes) = Self::delivery_time_minutes(model) {
                        total_minutes += minutes;
                        timed += 1;
                    }
                }
                DeliveryStatus::Failed => failed += 1,
                _ => {}
            }
        }

        let total = deliveries.len() as u64;
        Ok(PerformanceMetrics {
            total_deliveries: total,
            completed_deliveries: completed,
            failed_deliveries: failed,
            on_time_deliveries: on_time,
            average_delivery_time_minutes: if timed > 0 {
                total_minutes / timed as f64
            } else {
                0.0
            },
            // Divisions are intentionally unguarded; empty windows yield NaN.
            completion_rate: completed as f64 / total as f64,
            on_time_rate: on_time as f64 / completed as f64,
        })
    }

    #[instrument(skip(self))]
    pub async fn trends(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DeliveryTrends, ServiceError> {
        let deliveries: Vec<delivery::Model> = DeliveryEntity::find()
            .all(&*self.db)
            .await?
            .into_iter()
            .filter(|d| Self::in_window(d, start, end))
            .collect();

        let mut daily: Vec<DailyTrend> = Vec::new();
        for model in &deliveries {
            let Some(first) = Self::first_history_timestamp(model) else {
                continue;
            };
            let date = first.format("%Y-%m-%d").to_string();

            let idx = match daily.iter().position(|d| d.date == date) {
                Some(idx) => idx,
                None => {
                    daily.push(DailyTrend {
                        date,
                        deliveries: 0,
                        on_time: 0,
                        failed: 0,
                    });
                    daily.len() - 1
                }
            };
            let entry = &mut daily[idx];

            entry.deliveries += 1;
            match model.status {
                DeliveryStatus::Delivered if Self::is_on_time(model) => entry.on_time += 1,
                DeliveryStatus::Failed => entry.failed += 1,
                _ => {}
            }
        }

        let hourly = (0..24)
            .map(|hour| HourlyTrend {
                hour,
                deliveries: deliveries
                    .iter()
                    .filter(|d| {
                        d.tracking
                            .actual_delivery_date
                            .map(|ts| ts.hour() == hour)
                            .unwrap_or(false)
                    })
                    .count() as u64,
            })
            .collect();

        Ok(DeliveryTrends { daily, hourly })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::delivery::{
        DeliveryAddress, DeliveryItems, DeliveryTracking, TrackingEvent,
    };
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn delivery_with(
        status: DeliveryStatus,
        created: DateTime<Utc>,
        delivered: Option<DateTime<Utc>>,
    ) -> delivery::Model {
        delivery::Model {
            id: Uuid::new_v4(),
            invoice_number: Uuid::new_v4().to_string(),
            customer_name: "c".into(),
            customer_email: "c@example.com".into(),
            customer_phone: "+1".into(),
            delivery_address: DeliveryAddress {
                address: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                postal_code: "62701".into(),
                country: "US".into(),
            },
            items: DeliveryItems(vec![]),
            delivery_company_id: Uuid::new_v4(),
            vat_rate: dec!(0),
            additional_taxes: None,
            notes: None,
            preferred_delivery_date: None,
            status,
            tracking: DeliveryTracking {
                current_location: None,
                history: vec![TrackingEvent {
                    timestamp: created,
                    status: DeliveryStatus::Pending,
                    location: None,
                    notes: None,
                }],
                actual_delivery_date: delivered,
            },
            proof_of_delivery: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn on_time_is_within_24_hours_of_first_entry() {
        let start = Utc::now();
        let on_time = delivery_with(
            DeliveryStatus::Delivered,
            start,
            Some(start + chrono::Duration::hours(23)),
        );
        let late = delivery_with(
            DeliveryStatus::Delivered,
            start,
            Some(start + chrono::Duration::hours(25)),
        );

        assert!(DeliveryAnalyticsService::is_on_time(&on_time));
        assert!(!DeliveryAnalyticsService::is_on_time(&late));
    }

    #[test]
    fn delivery_time_needs_both_endpoints() {
        let start = Utc::now();
        let done = delivery_with(
            DeliveryStatus::Delivered,
            start,
            Some(start + chrono::Duration::minutes(90)),
        );
        let pending = delivery_with(DeliveryStatus::Pending, start, None);

        assert_eq!(
            DeliveryAnalyticsService::delivery_time_minutes(&done),
            Some(90.0)
        );
        assert_eq!(DeliveryAnalyticsService::delivery_time_minutes(&pending), None);
    }
}
