//! Shared test harness: in-memory SQLite database wired to the full service
//! container, with the event channel exposed for assertions.
#![allow(dead_code)]

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ConnectOptions, Database};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;
use warehouse_api::{
    db,
    entities::delivery::DeliveryAddress,
    entities::location::LocationType,
    events::{Event, EventSender},
    handlers::AppServices,
    services::deliveries::{NewDelivery, NewDeliveryItem},
    services::delivery_companies::NewDeliveryCompany,
    services::inventory::NewInventoryItem,
    services::locations::NewLocation,
};

pub struct TestApp {
    pub db: Arc<sea_orm::DatabaseConnection>,
    pub services: AppServices,
    pub events: mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_owned());
        // One pooled connection keeps every query on the same in-memory DB.
        opt.max_connections(1).sqlx_logging(false);
        let conn = Database::connect(opt).await.expect("sqlite connection");
        db::create_schema(&conn).await.expect("schema creation");

        let db = Arc::new(conn);
        let (tx, rx) = mpsc::channel(256);
        let services = AppServices::new(db.clone(), EventSender::new(tx));

        Self {
            db,
            services,
            events: rx,
        }
    }

    /// Drains every event currently buffered on the channel.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn seed_company(&self, code: &str) -> Uuid {
        self.services
            .delivery_companies
            .create(NewDeliveryCompany {
                name: format!("Carrier {}", code),
                code: code.to_string(),
                phone: "+15550100".to_string(),
                email: None,
                address: "12 Dock Rd".to_string(),
            })
            .await
            .expect("seed delivery company")
            .id
    }

    pub async fn seed_item(&self, sku: &str, current: i32, min: i32, max: i32) -> Uuid {
        self.services
            .inventory
            .create(NewInventoryItem {
                name: format!("Item {}", sku),
                sku: sku.to_string(),
                description: "test item".to_string(),
                category: "general".to_string(),
                current_stock: current,
                min_stock: min,
                max_stock: max,
                buying_price: dec!(10.00),
                unit_price: dec!(15.00),
                image: None,
                location_id: None,
            })
            .await
            .expect("seed inventory item")
            .id
    }

    pub async fn seed_location(&self, name: &str, capacity: i32) -> Uuid {
        self.services
            .locations
            .create(NewLocation {
                name: name.to_string(),
                address: "1 Warehouse Way".to_string(),
                capacity,
                location_type: LocationType::Warehouse,
                description: None,
            })
            .await
            .expect("seed location")
            .id
    }

    pub fn new_delivery(&self, company_id: Uuid) -> NewDelivery {
        NewDelivery {
            customer_name: "Ada Lovelace".to_string(),
            customer_email: "ada@example.com".to_string(),
            customer_phone: "+15550123".to_string(),
            delivery_address: DeliveryAddress {
                address: "10 Analytical St".to_string(),
                city: "London".to_string(),
                state: "LDN".to_string(),
                postal_code: "E1 6AN".to_string(),
                country: "UK".to_string(),
            },
            items: vec![NewDeliveryItem {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: dec!(25.00),
                tax_rate: dec!(20.0),
            }],
            delivery_company_id: company_id,
            vat_rate: dec!(20.0),
            additional_taxes: None,
            notes: None,
            preferred_delivery_date: Some(Utc::now()),
        }
    }
}

#[allow(dead_code)]
pub fn money(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}
