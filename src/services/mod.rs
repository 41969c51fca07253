// Core warehouse services
pub mod deliveries;
pub mod inventory;
pub mod locations;
pub mod stock_movements;

// Analytics and alerting
pub mod delivery_analytics;
pub mod route_optimization;
pub mod stock_alerts;

// Procurement and partners
pub mod delivery_companies;
pub mod supplier_invoices;
pub mod suppliers;

// Accounts
pub mod users;

// External seams
pub mod geocoding;
