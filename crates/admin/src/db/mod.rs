//! Database operations for the back office `PostgreSQL` schema.
//!
//! # Schema: `backoffice`
//!
//! ## Tables
//!
//! - `companies` - Tenants, keyed by `company_code`
//! - `admin_users`, `customers` - Password-authenticated principals
//! - `colors`, `sizes`, `fits`, `materials` - Catalog attributes
//! - `styles`, `style_variants` - Catalog products and their SKUs
//! - `main_stock` - Inbound stock lots
//! - `stock_issuing` - Append-only issuing ledger (trigger decrements lots)
//! - `addresses`, `payment_methods`, `orders`, `order_items`, `booking`,
//!   `payments`, `invoices` - The order aggregate
//! - `invoice_email_outbox` - Pending invoice emails
//! - `session` - tower-sessions store
//!
//! Every tenant query filters on `company_code`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run via:
//! ```bash
//! cargo run -p backoffice-cli -- migrate
//! ```

pub mod admin_users;
pub mod catalog;
pub mod checkout;
pub mod companies;
pub mod customers;
pub mod invoices;
pub mod orders;
pub mod outbox;
pub mod stock;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use admin_users::AdminUserRepository;
pub use catalog::CatalogRepository;
pub use companies::CompanyRepository;
pub use customers::CustomerRepository;
pub use invoices::InvoiceRepository;
pub use orders::OrderRepository;
pub use outbox::OutboxRepository;
pub use stock::StockRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate code, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Translate unique and foreign-key violations into `Conflict`.
    ///
    /// `what` names the entity for the conflict message, e.g. `"sku"`.
    pub(crate) fn from_constraint(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::Conflict(format!("{what} is referenced by other records"));
            }
        }
        Self::Database(err)
    }
}

/// Parse a status column read as text into its typed enum.
pub(crate) fn parse_column<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::DataCorruption(e.to_string()))
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use backoffice_core::OrderStatus;

    #[test]
    fn test_parse_column_maps_unknown_status_to_corruption() {
        let ok: Result<OrderStatus, _> = parse_column("In Transit");
        assert!(matches!(ok, Ok(OrderStatus::InTransit)));

        let bad: Result<OrderStatus, _> = parse_column("Shipped");
        assert!(matches!(bad, Err(RepositoryError::DataCorruption(_))));
    }

    #[test]
    fn test_from_constraint_passes_through_other_errors() {
        let err = RepositoryError::from_constraint(sqlx::Error::RowNotFound, "style");
        assert!(matches!(err, RepositoryError::Database(sqlx::Error::RowNotFound)));
    }
}
