//! HTTP middleware for the back office.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with `PostgreSQL` store)
//!
//! Authentication is enforced per handler with the extractors in [`auth`].

pub mod auth;
pub mod session;

pub use auth::{
    AuthRejection, RequireAdminAuth, RequireAdminWriter, RequireCustomerAuth,
    clear_current_admin, clear_current_customer, set_current_admin, set_current_customer,
};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
