//! Invoice repository: invoice lookup and the document read for rendering.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use backoffice_core::{CompanyCode, Email, InvoiceId, OrderAmounts, OrderId};

use super::RepositoryError;
use crate::models::{InvoiceDocument, InvoiceLine, InvoiceParty};

/// Identity of a persisted invoice.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct InvoiceHeader {
    pub id: InvoiceId,
    pub order_id: OrderId,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
}

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    order_id: OrderId,
    company_code: CompanyCode,
    order_number: String,
    created_at: DateTime<Utc>,
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    order_notes: Option<String>,
    company_name: String,
    company_email: Option<String>,
    company_phone: Option<String>,
    company_address: Option<String>,
    customer_email: String,
    first_name: String,
    last_name: String,
    customer_phone: Option<String>,
    full_name: String,
    line1: String,
    line2: Option<String>,
    city: String,
    state: Option<String>,
    postal_code: String,
    country: String,
    address_phone: Option<String>,
    method_type: String,
    card_last4: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    sku: String,
    style_number: String,
    style_name: String,
    color: String,
    size: String,
    fit: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
}

impl From<LineRow> for InvoiceLine {
    fn from(row: LineRow) -> Self {
        Self {
            sku: row.sku,
            style_number: row.style_number,
            style_name: row.style_name,
            color: row.color,
            size: row.size,
            fit: row.fit,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

/// "City, State Postal" with the optional state left out cleanly.
fn city_line(city: &str, state: Option<&str>, postal_code: &str) -> String {
    match state.filter(|s| !s.trim().is_empty()) {
        Some(state) => format!("{city}, {state} {postal_code}"),
        None => format!("{city} {postal_code}"),
    }
}

fn payment_label(method_type: &str, card_last4: Option<&str>) -> String {
    match card_last4 {
        Some(last4) => format!("{method_type} ending {last4}"),
        None => method_type.to_string(),
    }
}

impl DocumentRow {
    fn into_document(
        self,
        header: (&str, NaiveDate),
        items: Vec<InvoiceLine>,
    ) -> Result<InvoiceDocument, RepositoryError> {
        let customer_email = Email::parse(&self.customer_email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        let company = InvoiceParty {
            name: self.company_name,
            lines: self.company_address.into_iter().collect(),
            email: self.company_email,
            phone: self.company_phone,
        };
        let bill_to = InvoiceParty {
            name: format!("{} {}", self.first_name, self.last_name),
            lines: Vec::new(),
            email: Some(customer_email.to_string()),
            phone: self.customer_phone,
        };
        let mut ship_lines = vec![self.line1];
        ship_lines.extend(self.line2.filter(|l| !l.trim().is_empty()));
        ship_lines.push(city_line(&self.city, self.state.as_deref(), &self.postal_code));
        ship_lines.push(self.country);
        let ship_to = InvoiceParty {
            name: self.full_name,
            lines: ship_lines,
            email: None,
            phone: self.address_phone,
        };

        Ok(InvoiceDocument {
            invoice_number: header.0.to_string(),
            invoice_date: header.1,
            order_id: self.order_id,
            order_number: self.order_number,
            order_date: self.created_at,
            company_code: self.company_code,
            company,
            bill_to,
            ship_to,
            customer_email,
            payment_method: payment_label(&self.method_type, self.card_last4.as_deref()),
            items,
            amounts: OrderAmounts {
                subtotal: self.subtotal,
                shipping_fee: self.shipping_fee,
                tax_amount: self.tax_amount,
                total_amount: self.total_amount,
            },
            order_notes: self.order_notes,
        })
    }
}

/// Repository for invoice database operations.
pub struct InvoiceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> InvoiceRepository<'a> {
    /// Create a new invoice repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The most recently created invoice of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_invoice(
        &self,
        company_code: &CompanyCode,
        order_id: OrderId,
    ) -> Result<Option<InvoiceHeader>, RepositoryError> {
        let header = sqlx::query_as::<_, InvoiceHeader>(
            r"
            SELECT id, order_id, invoice_number, invoice_date
            FROM backoffice.invoices
            WHERE order_id = $1 AND company_code = $2
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            ",
        )
        .bind(order_id)
        .bind(company_code)
        .fetch_optional(self.pool)
        .await?;
        Ok(header)
    }

    /// The most recently created invoice number for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn latest_invoice_number(
        &self,
        company_code: &CompanyCode,
        order_id: OrderId,
    ) -> Result<Option<String>, RepositoryError> {
        Ok(self
            .latest_invoice(company_code, order_id)
            .await?
            .map(|header| header.invoice_number))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_header(
        &self,
        company_code: &CompanyCode,
        id: InvoiceId,
    ) -> Result<Option<InvoiceHeader>, RepositoryError> {
        let header = sqlx::query_as::<_, InvoiceHeader>(
            r"
            SELECT id, order_id, invoice_number, invoice_date
            FROM backoffice.invoices
            WHERE id = $1 AND company_code = $2
            ",
        )
        .bind(id)
        .bind(company_code)
        .fetch_optional(self.pool)
        .await?;
        Ok(header)
    }

    /// Gather everything printed on an order's invoice.
    ///
    /// Returns `None` when the order does not exist in the tenant.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if the customer email is invalid.
    pub async fn load_document(
        &self,
        company_code: &CompanyCode,
        order_id: OrderId,
        invoice_number: &str,
        invoice_date: NaiveDate,
    ) -> Result<Option<InvoiceDocument>, RepositoryError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r"
            SELECT o.id AS order_id, o.company_code, o.order_number, o.created_at,
                   o.subtotal, o.shipping_fee, o.tax_amount, o.total_amount, o.order_notes,
                   c.name AS company_name, c.email AS company_email,
                   c.phone AS company_phone, c.address_line AS company_address,
                   cu.email AS customer_email, cu.first_name, cu.last_name,
                   cu.phone AS customer_phone,
                   a.full_name, a.line1, a.line2, a.city, a.state, a.postal_code, a.country,
                   a.phone AS address_phone,
                   pm.method_type, pm.card_last4
            FROM backoffice.orders o
            JOIN backoffice.companies c ON c.company_code = o.company_code
            JOIN backoffice.customers cu ON cu.id = o.customer_id
            JOIN backoffice.addresses a ON a.id = o.address_id
            JOIN backoffice.payment_methods pm ON pm.id = o.payment_method_id
            WHERE o.id = $1 AND o.company_code = $2
            ",
        )
        .bind(order_id)
        .bind(company_code)
        .fetch_optional(self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, LineRow>(
            r"
            SELECT oi.sku, oi.style_number,
                   COALESCE(s.name, oi.style_number) AS style_name,
                   COALESCE(col.name, '') AS color,
                   COALESCE(sz.name, '') AS size,
                   f.name AS fit,
                   oi.quantity, oi.unit_price, oi.total_price
            FROM backoffice.order_items oi
            JOIN backoffice.style_variants v ON v.id = oi.variant_id
            LEFT JOIN backoffice.styles s ON s.id = v.style_id
            LEFT JOIN backoffice.colors col ON col.id = v.color_id
            LEFT JOIN backoffice.sizes sz ON sz.id = v.size_id
            LEFT JOIN backoffice.fits f ON f.id = v.fit_id
            WHERE oi.order_id = $1 AND oi.company_code = $2
            ORDER BY oi.line_no
            ",
        )
        .bind(order_id)
        .bind(company_code)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(InvoiceLine::from)
        .collect();

        row.into_document((invoice_number, invoice_date), items)
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_line_skips_blank_state() {
        assert_eq!(city_line("Leeds", None, "LS1 4AP"), "Leeds LS1 4AP");
        assert_eq!(city_line("Leeds", Some(" "), "LS1 4AP"), "Leeds LS1 4AP");
        assert_eq!(city_line("Austin", Some("TX"), "78701"), "Austin, TX 78701");
    }

    #[test]
    fn test_payment_label() {
        assert_eq!(payment_label("card", Some("4242")), "card ending 4242");
        assert_eq!(payment_label("bank_transfer", None), "bank_transfer");
    }
}
