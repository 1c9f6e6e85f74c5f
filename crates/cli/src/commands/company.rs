//! Tenant management commands.

use backoffice_admin::db::companies::NewCompany;
use backoffice_admin::db::{CompanyRepository, RepositoryError};
use backoffice_core::CompanyCode;
use thiserror::Error;

use super::{ConnectError, connect};

/// Errors that can occur while creating a tenant.
#[derive(Debug, Error)]
pub enum CompanyError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Company name is required")]
    MissingName,

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Create a tenant and return its minted code.
///
/// # Errors
///
/// Returns an error if the name is blank or the insert fails.
pub async fn create(
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
) -> Result<CompanyCode, CompanyError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CompanyError::MissingName);
    }

    let pool = connect().await?;
    let company = CompanyRepository::new(&pool)
        .create(&NewCompany {
            name,
            email,
            phone,
            address_line: address,
        })
        .await?;

    tracing::info!(
        "Company created successfully! Code: {}, Name: {}",
        company.company_code,
        company.name
    );
    Ok(company.company_code)
}
