pub mod auth;
pub mod deliveries;
pub mod delivery_companies;
pub mod inventory;
pub mod locations;
pub mod movements;
pub mod stock_alerts;
pub mod supplier_invoices;
pub mod suppliers;
pub mod users;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub inventory: Arc<crate::services::inventory::InventoryService>,
    pub locations: Arc<crate::services::locations::LocationService>,
    pub movements: Arc<crate::services::stock_movements::StockMovementService>,
    pub deliveries: Arc<crate::services::deliveries::DeliveryService>,
    pub delivery_analytics: Arc<crate::services::delivery_analytics::DeliveryAnalyticsService>,
    pub route_optimization: Arc<crate::services::route_optimization::RouteOptimizationService>,
    pub stock_alerts: Arc<crate::services::stock_alerts::StockAlertService>,
    pub suppliers: Arc<crate::services::suppliers::SupplierService>,
    pub supplier_invoices: Arc<crate::services::supplier_invoices::SupplierInvoiceService>,
    pub delivery_companies: Arc<crate::services::delivery_companies::DeliveryCompanyService>,
    pub users: Arc<crate::services::users::UserService>,
}

impl AppServices {
    /// Builds the service container. Dependencies flow one way: the journal
    /// has no dependencies, the inventory store writes to the journal, and
    /// invoicing writes to the inventory store.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let geocoder = Arc::new(crate::services::geocoding::GeocodingService::new());

        let movements = Arc::new(crate::services::stock_movements::StockMovementService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let inventory = Arc::new(crate::services::inventory::InventoryService::new(
            db_pool.clone(),
            event_sender.clone(),
            movements.clone(),
        ));
        let locations = Arc::new(crate::services::locations::LocationService::new(
            db_pool.clone(),
        ));
        let deliveries = Arc::new(crate::services::deliveries::DeliveryService::new(
            db_pool.clone(),
            event_sender.clone(),
            geocoder.clone(),
        ));
        let delivery_analytics = Arc::new(
            crate::services::delivery_analytics::DeliveryAnalyticsService::new(db_pool.clone()),
        );
        let route_optimization = Arc::new(
            crate::services::route_optimization::RouteOptimizationService::new(
                db_pool.clone(),
                geocoder,
            ),
        );
        let stock_alerts = Arc::new(crate::services::stock_alerts::StockAlertService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let suppliers = Arc::new(crate::services::suppliers::SupplierService::new(
            db_pool.clone(),
        ));
        let supplier_invoices = Arc::new(
            crate::services::supplier_invoices::SupplierInvoiceService::new(
                db_pool.clone(),
                event_sender,
                inventory.clone(),
            ),
        );
        let delivery_companies = Arc::new(
            crate::services::delivery_companies::DeliveryCompanyService::new(db_pool.clone()),
        );
        let users = Arc::new(crate::services::users::UserService::new(db_pool));

        Self {
            inventory,
            locations,
            movements,
            deliveries,
            delivery_analytics,
            route_optimization,
            stock_alerts,
            suppliers,
            supplier_invoices,
            delivery_companies,
            users,
        }
    }
}
