//! Back office library.
//!
//! Tenant-scoped e-commerce back office: checkout, FIFO stock issuing,
//! invoice numbering and PDFs, and invoice email delivery through an outbox.
//!
//! Every table carries a `company_code`; every query a handler runs is scoped
//! to the tenant of the signed-in admin or customer.

#![cfg_attr(not(test), forbid(unsafe_code))]

use axum::Router;

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use state::AppState;

/// All routes with state applied, before the session and tracing layers.
pub fn router(state: AppState) -> Router {
    routes::routes().with_state(state)
}
