//! HTTP route handlers for the back office.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                              - Liveness
//! GET  /health/ready                        - Readiness (database ping)
//!
//! # Customers
//! POST /api/register?company_code=          - Register with a tenant
//! POST /api/login                           - Login
//! POST /api/logout                          - Logout
//! POST /submit-checkout?company_code=       - Checkout
//! POST /api/checkout?company_code=          - Checkout (same handler)
//! GET  /api/orders                          - Own orders
//! GET  /api/orders/{id}/invoice             - Own invoice PDF
//!
//! # Admins
//! POST /api/admin/login                     - Login
//! POST /api/admin/logout                    - Logout
//! POST /issue                               - Issue stock for an order
//! POST /api/admin/orders/{id}/issue         - Issue stock for an order
//! GET  /api/admin/orders                    - List orders
//! GET  /api/admin/orders/{id}               - Order with items and bookings
//! POST /api/admin/orders/{id}/status        - Change order status
//! GET  /api/admin/orders/{id}/invoice       - Invoice PDF
//! GET  /api/admin/orders/{id}/emails        - Invoice email outbox rows
//! GET|POST   /api/admin/attributes/{kind}
//! PUT|DELETE /api/admin/attributes/{kind}/{id}
//! GET|POST   /api/admin/styles
//! GET        /api/admin/styles/{id}
//! GET|POST   /api/admin/styles/{id}/variants
//! POST /api/admin/stock                     - Receive a lot
//! GET  /api/admin/stock/{sku}               - Available lots, FIFO order
//! ```

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    routing::{get, post, put},
};

use crate::error::AppError;
use crate::state::AppState;

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod issuing;
pub mod orders;
pub mod stock;

/// Build the router for all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        // Customer auth
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::customer_login))
        .route("/api/logout", post(auth::customer_logout))
        // Checkout
        .route("/submit-checkout", post(checkout::submit_checkout))
        .route("/api/checkout", post(checkout::submit_checkout))
        // Customer orders
        .route("/api/orders", get(orders::customer_index))
        .route("/api/orders/{id}/invoice", get(orders::customer_invoice))
        // Admin auth
        .route("/api/admin/login", post(auth::admin_login))
        .route("/api/admin/logout", post(auth::admin_logout))
        // Issuing
        .route("/issue", post(issuing::issue))
        .route("/api/admin/orders/{id}/issue", post(issuing::issue_for_order))
        // Admin orders
        .route("/api/admin/orders", get(orders::index))
        .route("/api/admin/orders/{id}", get(orders::show))
        .route("/api/admin/orders/{id}/status", post(orders::update_status))
        .route("/api/admin/orders/{id}/invoice", get(orders::invoice))
        .route("/api/admin/orders/{id}/emails", get(orders::emails))
        // Catalog
        .route(
            "/api/admin/attributes/{kind}",
            get(catalog::list_attributes).post(catalog::create_attribute),
        )
        .route(
            "/api/admin/attributes/{kind}/{id}",
            put(catalog::update_attribute).delete(catalog::delete_attribute),
        )
        .route(
            "/api/admin/styles",
            get(catalog::list_styles).post(catalog::create_style),
        )
        .route("/api/admin/styles/{id}", get(catalog::show_style))
        .route(
            "/api/admin/styles/{id}/variants",
            get(catalog::list_variants).post(catalog::create_variant),
        )
        // Stock
        .route("/api/admin/stock", post(stock::receive))
        .route("/api/admin/stock/{sku}", get(stock::available))
}

/// Unwrap a JSON body, reporting malformed input as 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}
