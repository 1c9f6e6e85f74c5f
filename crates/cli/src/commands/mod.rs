//! CLI subcommand implementations.

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

pub mod admin;
pub mod company;
pub mod customer;
pub mod migrate;

/// Errors shared by every command that talks to the database.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Neither database URL variable is set.
    #[error("Missing environment variable: BACKOFFICE_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read the database URL, preferring `BACKOFFICE_DATABASE_URL`.
fn database_url() -> Result<SecretString, ConnectError> {
    dotenvy::dotenv().ok();

    std::env::var("BACKOFFICE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingDatabaseUrl)
}

/// Connect to the back office database.
async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url()?;
    tracing::info!("Connecting to back office database...");
    Ok(backoffice_admin::db::create_pool(&url).await?)
}
