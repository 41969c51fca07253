//! Permission strings in `service:action` form.
//!
//! Route groups are gated on these constants; users carry explicit grants in
//! their permission list and the `admin` role bypasses the check entirely.

/// Permission string constants for compile-time safety.
pub mod consts {
    // Inventory
    pub const INVENTORY_READ: &str = "inventory:read";
    pub const INVENTORY_CREATE: &str = "inventory:create";
    pub const INVENTORY_UPDATE: &str = "inventory:update";
    pub const INVENTORY_DELETE: &str = "inventory:delete";

    // Locations
    pub const LOCATIONS_READ: &str = "locations:read";
    pub const LOCATIONS_CREATE: &str = "locations:create";
    pub const LOCATIONS_UPDATE: &str = "locations:update";
    pub const LOCATIONS_DELETE: &str = "locations:delete";

    // Stock movements
    pub const MOVEMENTS_READ: &str = "stock-movements:read";
    pub const MOVEMENTS_CREATE: &str = "stock-movements:create";
    pub const MOVEMENTS_UPDATE: &str = "stock-movements:update";
    pub const MOVEMENTS_DELETE: &str = "stock-movements:delete";

    // Deliveries
    pub const DELIVERIES_READ: &str = "deliveries:read";
    pub const DELIVERIES_CREATE: &str = "deliveries:create";
    pub const DELIVERIES_UPDATE: &str = "deliveries:update";
    pub const DELIVERIES_DELETE: &str = "deliveries:delete";

    // Suppliers
    pub const SUPPLIERS_READ: &str = "suppliers:read";
    pub const SUPPLIERS_CREATE: &str = "suppliers:create";
    pub const SUPPLIERS_UPDATE: &str = "suppliers:update";
    pub const SUPPLIERS_DELETE: &str = "suppliers:delete";

    // Supplier invoices
    pub const INVOICES_READ: &str = "supplier-invoices:read";
    pub const INVOICES_CREATE: &str = "supplier-invoices:create";
    pub const INVOICES_UPDATE: &str = "supplier-invoices:update";

    // Delivery companies
    pub const COMPANIES_READ: &str = "delivery-companies:read";
    pub const COMPANIES_CREATE: &str = "delivery-companies:create";
    pub const COMPANIES_UPDATE: &str = "delivery-companies:update";
    pub const COMPANIES_DELETE: &str = "delivery-companies:delete";

    // Users
    pub const USERS_READ: &str = "users:read";
    pub const USERS_CREATE: &str = "users:create";
    pub const USERS_UPDATE: &str = "users:update";
    pub const USERS_DELETE: &str = "users:delete";

    // Reports / alerts
    pub const REPORTS_READ: &str = "reports:read";
}
