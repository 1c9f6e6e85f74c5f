//! Company (tenant) repository.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use backoffice_core::CompanyCode;

use super::RepositoryError;

/// A tenant.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Company {
    pub company_code: CompanyCode,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Details supplied when creating a tenant.
#[derive(Debug, Clone, Default)]
pub struct NewCompany<'n> {
    pub name: &'n str,
    pub email: Option<&'n str>,
    pub phone: Option<&'n str>,
    pub address_line: Option<&'n str>,
}

/// Repository for tenant records.
pub struct CompanyRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompanyRepository<'a> {
    /// Create a new company repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a tenant, minting its code from `company_code_seq`.
    ///
    /// Concurrent creations always receive distinct codes.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, company: &NewCompany<'_>) -> Result<Company, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let next: i64 = sqlx::query_scalar("SELECT nextval('backoffice.company_code_seq')")
            .fetch_one(&mut *tx)
            .await?;
        let code = CompanyCode::from_sequence(next);

        let created = sqlx::query_as::<_, Company>(
            r"
            INSERT INTO backoffice.companies (company_code, name, email, phone, address_line)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING company_code, name, email, phone, address_line, created_at
            ",
        )
        .bind(&code)
        .bind(company.name)
        .bind(company.email)
        .bind(company.phone)
        .bind(company.address_line)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_constraint(e, "company code"))?;

        tx.commit().await?;
        Ok(created)
    }

    /// Get a tenant by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, code: &CompanyCode) -> Result<Option<Company>, RepositoryError> {
        let company = sqlx::query_as::<_, Company>(
            r"
            SELECT company_code, name, email, phone, address_line, created_at
            FROM backoffice.companies
            WHERE company_code = $1
            ",
        )
        .bind(code)
        .fetch_optional(self.pool)
        .await?;

        Ok(company)
    }
}
