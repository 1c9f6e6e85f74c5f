//! Customer management commands.

use backoffice_admin::models::RegisterCustomerInput;
use backoffice_admin::services::{AuthError, AuthService};
use backoffice_core::{CompanyCode, CustomerId};
use thiserror::Error;

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum CustomerError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid company code: {0}")]
    InvalidCompany(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Register a customer with a tenant, as `POST /api/register` would.
///
/// # Errors
///
/// Returns an error if the company code is malformed or registration fails.
pub async fn create(
    company: &str,
    input: RegisterCustomerInput,
) -> Result<CustomerId, CustomerError> {
    let company_code = CompanyCode::parse(company)
        .map_err(|_| CustomerError::InvalidCompany(company.to_owned()))?;

    let pool = connect().await?;
    let customer = AuthService::new(&pool)
        .register_customer(&company_code, &input)
        .await?;

    tracing::info!(
        "Customer created successfully! ID: {}, Email: {}",
        customer.id,
        customer.email
    );
    Ok(customer.id)
}
