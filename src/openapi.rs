use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

/// OpenAPI document for the v1 REST surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warehouse API",
        description = "Inventory, stock movements, deliveries and supplier invoicing",
        license(name = "MIT")
    ),
    paths(
        handlers::deliveries::list_deliveries,
        handlers::deliveries::get_delivery,
        handlers::deliveries::create_delivery,
        handlers::deliveries::update_delivery,
        handlers::deliveries::update_delivery_status,
        handlers::deliveries::void_delivery,
        handlers::deliveries::add_proof_of_delivery,
        handlers::deliveries::update_delivery_location,
        handlers::deliveries::create_deliveries_bulk,
        handlers::deliveries::update_deliveries_bulk,
        handlers::deliveries::delete_delivery,
        handlers::deliveries::performance_metrics,
        handlers::deliveries::delivery_trends,
        handlers::deliveries::optimize_route,
        handlers::movements::list_movements,
        handlers::movements::get_movement,
        handlers::movements::create_movement,
        handlers::movements::create_movements_bulk,
        handlers::movements::update_movement,
        handlers::movements::update_movements_bulk,
        handlers::movements::void_movement,
        handlers::movements::cancel_movement,
        handlers::movements::delete_movement,
        handlers::movements::delete_movements_bulk,
        handlers::inventory::list_inventory,
        handlers::inventory::get_inventory_item,
        handlers::inventory::create_inventory_item,
        handlers::inventory::update_inventory_item,
        handlers::inventory::delete_inventory_item,
        handlers::locations::list_locations,
        handlers::locations::get_location,
        handlers::locations::create_location,
        handlers::locations::update_location,
        handlers::locations::update_location_capacity,
        handlers::locations::delete_location,
        handlers::stock_alerts::list_stock_alerts,
        handlers::stock_alerts::stock_report,
        handlers::supplier_invoices::list_invoices,
        handlers::supplier_invoices::get_invoice,
        handlers::supplier_invoices::create_invoice,
        handlers::supplier_invoices::update_invoice,
    ),
    tags(
        (name = "deliveries", description = "Delivery lifecycle, tracking and analytics"),
        (name = "movements", description = "Stock movement journal"),
        (name = "inventory", description = "Inventory items"),
        (name = "locations", description = "Warehouse locations"),
        (name = "stock-alerts", description = "Threshold and expiry alerting"),
        (name = "supplier-invoices", description = "Supplier invoicing")
    )
)]
pub struct ApiDoc;

/// Swagger UI mount serving the generated document.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
