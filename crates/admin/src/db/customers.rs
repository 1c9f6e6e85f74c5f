//! Customer repository for database operations.

use sqlx::PgPool;

use backoffice_core::{CompanyCode, CustomerId, Email};

use super::RepositoryError;
use crate::models::Customer;

#[derive(Debug, sqlx::FromRow)]
struct CustomerCredentialRow {
    #[sqlx(flatten)]
    customer: Customer,
    password_hash: String,
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a customer of a tenant by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        company_code: &CompanyCode,
        id: CustomerId,
    ) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(
            r"
            SELECT id, company_code, email, first_name, last_name, phone, created_at
            FROM backoffice.customers
            WHERE id = $1 AND company_code = $2
            ",
        )
        .bind(id)
        .bind(company_code)
        .fetch_optional(self.pool)
        .await?;

        Ok(customer)
    }

    /// Get a customer and their password hash by email (for login).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_credentials(
        &self,
        company_code: &CompanyCode,
        email: &Email,
    ) -> Result<Option<(Customer, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerCredentialRow>(
            r"
            SELECT id, company_code, email, first_name, last_name, phone, created_at,
                   password_hash
            FROM backoffice.customers
            WHERE company_code = $1 AND email = $2
            ",
        )
        .bind(company_code)
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(|r| (r.customer, r.password_hash)))
    }

    /// Register a customer with a tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email is already registered
    /// with this tenant, or the tenant does not exist.
    pub async fn create(
        &self,
        company_code: &CompanyCode,
        email: &Email,
        first_name: &str,
        last_name: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(
            r"
            INSERT INTO backoffice.customers
                (company_code, email, first_name, last_name, phone, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, company_code, email, first_name, last_name, phone, created_at
            ",
        )
        .bind(company_code)
        .bind(email.as_str())
        .bind(first_name)
        .bind(last_name)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "customer email"))
    }
}
