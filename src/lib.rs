//! Warehouse API Library
//!
//! Inventory, locations, stock movements, deliveries and supplier invoicing
//! behind a JWT-authenticated REST surface.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod openapi;
pub mod rate_limiter;
pub mod services;

use axum::{extract::State, response::Json, routing::get, Router};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::consts as perm;
use crate::auth::AuthRouterExt;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

/// Common query parameters for list endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct ListQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    1
}
fn default_limit() -> u64 {
    10
}

/// Uniform response envelope.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
        }
    }

    pub fn validation_errors(errors: Vec<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some("Validation failed".to_string()),
            errors: Some(errors),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let limit = limit.max(1);
        let total_pages = (total + limit - 1) / limit;
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Full v1 API with per-resource permission gating.
pub fn api_v1_routes() -> Router<AppState> {
    // Deliveries
    let deliveries_read = Router::new()
        .route("/deliveries", get(handlers::deliveries::list_deliveries))
        .route("/deliveries/:id", get(handlers::deliveries::get_delivery))
        .route(
            "/deliveries/analytics/performance",
            get(handlers::deliveries::performance_metrics),
        )
        .route(
            "/deliveries/analytics/trends",
            get(handlers::deliveries::delivery_trends),
        )
        .route(
            "/deliveries/route/optimize",
            axum::routing::post(handlers::deliveries::optimize_route),
        )
        .with_permission(perm::DELIVERIES_READ);

    let deliveries_create = Router::new()
        .route(
            "/deliveries",
            axum::routing::post(handlers::deliveries::create_delivery),
        )
        .route(
            "/deliveries/bulk",
            axum::routing::post(handlers::deliveries::create_deliveries_bulk),
        )
        .with_permission(perm::DELIVERIES_CREATE);

    let deliveries_update = Router::new()
        .route(
            "/deliveries/:id",
            axum::routing::put(handlers::deliveries::update_delivery),
        )
        .route(
            "/deliveries/:id/status",
            axum::routing::put(handlers::deliveries::update_delivery_status),
        )
        .route(
            "/deliveries/:id/void",
            axum::routing::put(handlers::deliveries::void_delivery),
        )
        .route(
            "/deliveries/:id/proof-of-delivery",
            axum::routing::put(handlers::deliveries::add_proof_of_delivery),
        )
        .route(
            "/deliveries/:id/location",
            axum::routing::put(handlers::deliveries::update_delivery_location),
        )
        .route(
            "/deliveries/bulk",
            axum::routing::put(handlers::deliveries::update_deliveries_bulk),
        )
        .with_permission(perm::DELIVERIES_UPDATE);

    let deliveries_delete = Router::new()
        .route(
            "/deliveries/:id",
            axum::routing::delete(handlers::deliveries::delete_delivery),
        )
        .with_permission(perm::DELIVERIES_DELETE);

    // Stock movements
    let movements_read = Router::new()
        .route("/movements", get(handlers::movements::list_movements))
        .route("/movements/:id", get(handlers::movements::get_movement))
        .with_permission(perm::MOVEMENTS_READ);

    let movements_create = Router::new()
        .route(
            "/movements",
            axum::routing::post(handlers::movements::create_movement),
        )
        .route(
            "/movements/bulk",
            axum::routing::post(handlers::movements::create_movements_bulk),
        )
        .with_permission(perm::MOVEMENTS_CREATE);

    let movements_update = Router::new()
        .route(
            "/movements/:id",
            axum::routing::put(handlers::movements::update_movement),
        )
        .route(
            "/movements/bulk",
            axum::routing::put(handlers::movements::update_movements_bulk),
        )
        .route(
            "/movements/:id/void",
            axum::routing::put(handlers::movements::void_movement),
        )
        .route(
            "/movements/:id/cancel",
            axum::routing::put(handlers::movements::cancel_movement),
        )
        .with_permission(perm::MOVEMENTS_UPDATE);

    let movements_delete = Router::new()
        .route(
            "/movements/:id",
            axum::routing::delete(handlers::movements::delete_movement),
        )
        .route(
            "/movements",
            axum::routing::delete(handlers::movements::delete_movements_bulk),
        )
        .with_permission(perm::MOVEMENTS_DELETE);

    // Inventory
    let inventory_read = Router::new()
        .route("/inventory", get(handlers::inventory::list_inventory))
        .route(
            "/inventory/:id",
            get(handlers::inventory::get_inventory_item),
        )
        .with_permission(perm::INVENTORY_READ);

    let inventory_create = Router::new()
        .route(
            "/inventory",
            axum::routing::post(handlers::inventory::create_inventory_item),
        )
        .with_permission(perm::INVENTORY_CREATE);

    let inventory_update = Router::new()
        .route(
            "/inventory/:id",
            axum::routing::put(handlers::inventory::update_inventory_item),
        )
        .with_permission(perm::INVENTORY_UPDATE);

    let inventory_delete = Router::new()
        .route(
            "/inventory/:id",
            axum::routing::delete(handlers::inventory::delete_inventory_item),
        )
        .with_permission(perm::INVENTORY_DELETE);

    // Locations
    let locations_read = Router::new()
        .route("/locations", get(handlers::locations::list_locations))
        .route("/locations/:id", get(handlers::locations::get_location))
        .with_permission(perm::LOCATIONS_READ);

    let locations_create = Router::new()
        .route(
            "/locations",
            axum::routing::post(handlers::locations::create_location),
        )
        .with_permission(perm::LOCATIONS_CREATE);

    let locations_update = Router::new()
        .route(
            "/locations/:id",
            axum::routing::put(handlers::locations::update_location),
        )
        .route(
            "/locations/:id/capacity",
            axum::routing::put(handlers::locations::update_location_capacity),
        )
        .with_permission(perm::LOCATIONS_UPDATE);

    let locations_delete = Router::new()
        .route(
            "/locations/:id",
            axum::routing::delete(handlers::locations::delete_location),
        )
        .with_permission(perm::LOCATIONS_DELETE);

    // Stock alerts
    let stock_alerts = Router::new()
        .route(
            "/stock-alerts",
            get(handlers::stock_alerts::list_stock_alerts),
        )
        .route(
            "/stock-alerts/report",
            get(handlers::stock_alerts::stock_report),
        )
        .with_permission(perm::REPORTS_READ);

    // Suppliers
    let suppliers_read = Router::new()
        .route("/suppliers", get(handlers::suppliers::list_suppliers))
        .route("/suppliers/:id", get(handlers::suppliers::get_supplier))
        .with_permission(perm::SUPPLIERS_READ);

    let suppliers_write = Router::new()
        .route(
            "/suppliers",
            axum::routing::post(handlers::suppliers::create_supplier),
        )
        .route(
            "/suppliers/:id",
            axum::routing::put(handlers::suppliers::update_supplier),
        )
        .with_permission(perm::SUPPLIERS_UPDATE);

    let suppliers_delete = Router::new()
        .route(
            "/suppliers/:id",
            axum::routing::delete(handlers::suppliers::delete_supplier),
        )
        .with_permission(perm::SUPPLIERS_DELETE);

    // Supplier invoices
    let invoices_read = Router::new()
        .route(
            "/supplier-invoices",
            get(handlers::supplier_invoices::list_invoices),
        )
        .route(
            "/supplier-invoices/:id",
            get(handlers::supplier_invoices::get_invoice),
        )
        .with_permission(perm::INVOICES_READ);

    let invoices_write = Router::new()
        .route(
            "/supplier-invoices",
            axum::routing::post(handlers::supplier_invoices::create_invoice),
        )
        .with_permission(perm::INVOICES_CREATE);

    let invoices_update = Router::new()
        .route(
            "/supplier-invoices/:id",
            axum::routing::put(handlers::supplier_invoices::update_invoice),
        )
        .with_permission(perm::INVOICES_UPDATE);

    // Delivery companies
    let companies_read = Router::new()
        .route(
            "/delivery-companies",
            get(handlers::delivery_companies::list_companies),
        )
        .route(
            "/delivery-companies/:id",
            get(handlers::delivery_companies::get_company),
        )
        .with_permission(perm::COMPANIES_READ);

    let companies_write = Router::new()
        .route(
            "/delivery-companies",
            axum::routing::post(handlers::delivery_companies::create_company),
        )
        .route(
            "/delivery-companies/:id",
            axum::routing::put(handlers::delivery_companies::update_company),
        )
        .with_permission(perm::COMPANIES_UPDATE);

    let companies_delete = Router::new()
        .route(
            "/delivery-companies/:id",
            axum::routing::delete(handlers::delivery_companies::delete_company),
        )
        .with_permission(perm::COMPANIES_DELETE);

    // Users
    let users_read = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route("/users/:id", get(handlers::users::get_user))
        .with_permission(perm::USERS_READ);

    let users_write = Router::new()
        .route("/users", axum::routing::post(handlers::users::create_user))
        .route(
            "/users/:id",
            axum::routing::put(handlers::users::update_user),
        )
        .with_permission(perm::USERS_UPDATE);

    let users_delete = Router::new()
        .route(
            "/users/:id",
            axum::routing::delete(handlers::users::delete_user),
        )
        .with_permission(perm::USERS_DELETE);

    // Current-user endpoint only needs authentication, not a permission.
    let me = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .with_auth();

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(deliveries_read)
        .merge(deliveries_create)
        .merge(deliveries_update)
        .merge(deliveries_delete)
        .merge(movements_read)
        .merge(movements_create)
        .merge(movements_update)
        .merge(movements_delete)
        .merge(inventory_read)
        .merge(inventory_create)
        .merge(inventory_update)
        .merge(inventory_delete)
        .merge(locations_read)
        .merge(locations_create)
        .merge(locations_update)
        .merge(locations_delete)
        .merge(stock_alerts)
        .merge(suppliers_read)
        .merge(suppliers_write)
        .merge(suppliers_delete)
        .merge(invoices_read)
        .merge(invoices_write)
        .merge(invoices_update)
        .merge(companies_read)
        .merge(companies_write)
        .merge(companies_delete)
        .merge(users_read)
        .merge(users_write)
        .merge(users_delete)
        .merge(me)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "warehouse-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

#[cfg(test)]
mod response_tests {
    use super::*;

    #[test]
    fn success_envelope_carries_data() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        assert_eq!(response.data, Some("ok"));
        assert!(response.message.is_none());
    }

    #[test]
    fn validation_envelope_lists_errors() {
        let response = ApiResponse::<()>::validation_errors(vec!["missing field".into()]);
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Validation failed"));
        assert_eq!(response.errors.unwrap().len(), 1);
    }

    #[test]
    fn pagination_rounds_total_pages_up() {
        let page: PaginatedResponse<u8> = PaginatedResponse::new(vec![], 21, 1, 10);
        assert_eq!(page.total_pages, 3);

        let empty: PaginatedResponse<u8> = PaginatedResponse::new(vec![], 0, 1, 10);
        assert_eq!(empty.total_pages, 0);
    }
}
