//! Admin user management commands.
//!
//! # Usage
//!
//! ```bash
//! BO_PASSWORD=... bo-cli admin create -c CMP0001 -e admin@example.com -n "Admin Name" -r super_admin
//! ```
//!
//! # Environment Variables
//!
//! - `BACKOFFICE_DATABASE_URL` - `PostgreSQL` connection string
//! - `BO_PASSWORD` - Initial password, when `--password` is not given

use backoffice_admin::services::{AuthError, AuthService};
use backoffice_core::{AdminRole, AdminUserId, CompanyCode};
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    /// Invalid role.
    #[error("Invalid role: {0}. Valid roles: super_admin, admin, viewer")]
    InvalidRole(String),

    /// Invalid company code.
    #[error("Invalid company code: {0}")]
    InvalidCompany(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a new admin user.
///
/// # Arguments
///
/// * `company` - Tenant code, e.g. `CMP0001`
/// * `email` - Admin's email address
/// * `name` - Admin's display name
/// * `role` - Admin's role (`super_admin`, `admin`, or `viewer`)
/// * `password` - Initial password
///
/// # Returns
///
/// The ID of the created admin user.
pub async fn create_user(
    company: &str,
    email: &str,
    name: &str,
    role: &str,
    password: &str,
) -> Result<AdminUserId, AdminError> {
    let role: AdminRole = role
        .parse()
        .map_err(|_| AdminError::InvalidRole(role.to_owned()))?;
    let company_code =
        CompanyCode::parse(company).map_err(|_| AdminError::InvalidCompany(company.to_owned()))?;

    let pool = connect().await?;

    tracing::info!("Creating admin user: {} ({}) for {}", email, role, company_code);
    let admin = AuthService::new(&pool)
        .create_admin(&company_code, email, name, role, password)
        .await?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}, Role: {}",
        admin.id,
        admin.email,
        admin.role
    );
    Ok(admin.id)
}
