//! Catalog repository: attributes, styles and variants.

use rust_decimal::Decimal;
use sqlx::PgPool;

use backoffice_core::{AttributeId, CompanyCode, Sku, StyleId};

use super::RepositoryError;
use crate::models::{Attribute, AttributeInput, AttributeKind, CreateStyleInput, Style, Variant};

const STYLE_COLUMNS: &str =
    "id, company_code, style_number, name, description, material_id, base_price, created_at";
const VARIANT_COLUMNS: &str =
    "id, style_id, style_number, sku, color_id, size_id, fit_id, unit_price, created_at";

/// Repository for catalog database operations.
pub struct CatalogRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CatalogRepository<'a> {
    /// Create a new catalog repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    /// List a tenant's attributes of one kind, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_attributes(
        &self,
        company_code: &CompanyCode,
        kind: AttributeKind,
    ) -> Result<Vec<Attribute>, RepositoryError> {
        let sql = format!(
            "SELECT id, company_code, code, name, created_at FROM {} \
             WHERE company_code = $1 ORDER BY code",
            kind.table()
        );
        let rows = sqlx::query_as::<_, Attribute>(&sql)
            .bind(company_code)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Get one attribute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_attribute(
        &self,
        company_code: &CompanyCode,
        kind: AttributeKind,
        id: AttributeId,
    ) -> Result<Option<Attribute>, RepositoryError> {
        let sql = format!(
            "SELECT id, company_code, code, name, created_at FROM {} \
             WHERE company_code = $1 AND id = $2",
            kind.table()
        );
        let row = sqlx::query_as::<_, Attribute>(&sql)
            .bind(company_code)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create an attribute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is already used by the tenant.
    pub async fn create_attribute(
        &self,
        company_code: &CompanyCode,
        kind: AttributeKind,
        input: &AttributeInput,
    ) -> Result<Attribute, RepositoryError> {
        let sql = format!(
            "INSERT INTO {} (company_code, code, name) VALUES ($1, $2, $3) \
             RETURNING id, company_code, code, name, created_at",
            kind.table()
        );
        sqlx::query_as::<_, Attribute>(&sql)
            .bind(company_code)
            .bind(&input.code)
            .bind(&input.name)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, kind.label()))
    }

    /// Update an attribute's code and name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the attribute does not exist in the tenant.
    /// Returns `RepositoryError::Conflict` if the new code is already used.
    pub async fn update_attribute(
        &self,
        company_code: &CompanyCode,
        kind: AttributeKind,
        id: AttributeId,
        input: &AttributeInput,
    ) -> Result<Attribute, RepositoryError> {
        let sql = format!(
            "UPDATE {} SET code = $3, name = $4 WHERE company_code = $1 AND id = $2 \
             RETURNING id, company_code, code, name, created_at",
            kind.table()
        );
        sqlx::query_as::<_, Attribute>(&sql)
            .bind(company_code)
            .bind(id)
            .bind(&input.code)
            .bind(&input.name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, kind.label()))?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete an attribute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the attribute does not exist in the tenant.
    /// Returns `RepositoryError::Conflict` if a style or variant still references it.
    pub async fn delete_attribute(
        &self,
        company_code: &CompanyCode,
        kind: AttributeKind,
        id: AttributeId,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            "DELETE FROM {} WHERE company_code = $1 AND id = $2",
            kind.table()
        );
        let result = sqlx::query(&sql)
            .bind(company_code)
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, kind.label()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Styles
    // =========================================================================

    /// List a tenant's styles.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_styles(&self, company_code: &CompanyCode) -> Result<Vec<Style>, RepositoryError> {
        let sql = format!(
            "SELECT {STYLE_COLUMNS} FROM backoffice.styles \
             WHERE company_code = $1 ORDER BY style_number"
        );
        let rows = sqlx::query_as::<_, Style>(&sql)
            .bind(company_code)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Get one style.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_style(
        &self,
        company_code: &CompanyCode,
        id: StyleId,
    ) -> Result<Option<Style>, RepositoryError> {
        let sql = format!(
            "SELECT {STYLE_COLUMNS} FROM backoffice.styles WHERE company_code = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, Style>(&sql)
            .bind(company_code)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Create a style.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the material does not exist in the tenant.
    /// Returns `RepositoryError::Conflict` if the style number is taken.
    pub async fn create_style(
        &self,
        company_code: &CompanyCode,
        input: &CreateStyleInput,
    ) -> Result<Style, RepositoryError> {
        if let Some(material_id) = input.material_id {
            let material = self
                .get_attribute(company_code, AttributeKind::Material, material_id)
                .await?;
            if material.is_none() {
                return Err(RepositoryError::NotFound);
            }
        }

        let sql = format!(
            "INSERT INTO backoffice.styles \
                 (company_code, style_number, name, description, material_id, base_price) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {STYLE_COLUMNS}"
        );
        sqlx::query_as::<_, Style>(&sql)
            .bind(company_code)
            .bind(input.style_number.trim())
            .bind(input.name.trim())
            .bind(input.description.as_deref())
            .bind(input.material_id)
            .bind(input.base_price)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "style number"))
    }

    // =========================================================================
    // Variants
    // =========================================================================

    /// List a style's variants.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_variants(
        &self,
        company_code: &CompanyCode,
        style_id: StyleId,
    ) -> Result<Vec<Variant>, RepositoryError> {
        let sql = format!(
            "SELECT {VARIANT_COLUMNS} FROM backoffice.style_variants \
             WHERE company_code = $1 AND style_id = $2 ORDER BY sku"
        );
        let rows = sqlx::query_as::<_, Variant>(&sql)
            .bind(company_code)
            .bind(style_id)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    /// Insert a variant with an already-built SKU.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU already exists in the tenant.
    pub async fn insert_variant(
        &self,
        style: &Style,
        sku: &Sku,
        color_id: AttributeId,
        size_id: AttributeId,
        fit_id: Option<AttributeId>,
        unit_price: Decimal,
    ) -> Result<Variant, RepositoryError> {
        let sql = format!(
            "INSERT INTO backoffice.style_variants \
                 (company_code, style_id, style_number, sku, color_id, size_id, fit_id, unit_price) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {VARIANT_COLUMNS}"
        );
        sqlx::query_as::<_, Variant>(&sql)
            .bind(&style.company_code)
            .bind(style.id)
            .bind(&style.style_number)
            .bind(sku.as_str())
            .bind(color_id)
            .bind(size_id)
            .bind(fit_id)
            .bind(unit_price)
            .fetch_one(self.pool)
            .await
            .map_err(|e| RepositoryError::from_constraint(e, "sku"))
    }
}
