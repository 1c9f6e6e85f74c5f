//! Invoice number resolution and on-demand invoice PDFs.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use backoffice_core::{CompanyCode, OrderId, numbering};

use super::invoice_pdf::{self, InvoiceRenderError};
use crate::db::invoices::InvoiceHeader;
use crate::db::{InvoiceRepository, RepositoryError};

/// The invoice number to print for an order.
///
/// Reuses the most recently persisted number, so repeated downloads of the
/// same invoice show the same number. If the order has no invoice row, or the
/// lookup fails, a fresh number is minted for `now`.
pub async fn resolve_invoice_number(
    pool: &PgPool,
    company_code: &CompanyCode,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> String {
    resolve_invoice(pool, company_code, order_id, now).await.0
}

/// The invoice number and date to print, from one lookup.
async fn resolve_invoice(
    pool: &PgPool,
    company_code: &CompanyCode,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> (String, NaiveDate) {
    let lookup = InvoiceRepository::new(pool)
        .latest_invoice(company_code, order_id)
        .await;
    number_or_mint(lookup, order_id, now)
}

fn number_or_mint(
    lookup: Result<Option<InvoiceHeader>, RepositoryError>,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> (String, NaiveDate) {
    match lookup {
        Ok(Some(header)) => (header.invoice_number, header.invoice_date),
        Ok(None) => {
            tracing::info!(order_id = %order_id, "No invoice on record, minting a number");
            (numbering::invoice_number(order_id, now), now.date_naive())
        }
        Err(e) => {
            tracing::warn!(order_id = %order_id, error = %e, "Invoice lookup failed, minting a number");
            (numbering::invoice_number(order_id, now), now.date_naive())
        }
    }
}

/// Errors from building an invoice download.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("order not found")]
    OrderNotFound,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Render(#[from] InvoiceRenderError),
}

/// A rendered invoice ready to send to a client.
#[derive(Debug, Clone)]
pub struct InvoicePdf {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Render an order's invoice.
///
/// # Errors
///
/// Returns `InvoiceError::OrderNotFound` if the order is not in the tenant.
pub async fn invoice_pdf(
    pool: &PgPool,
    company_code: &CompanyCode,
    order_id: OrderId,
    now: DateTime<Utc>,
) -> Result<InvoicePdf, InvoiceError> {
    let (invoice_number, invoice_date) = resolve_invoice(pool, company_code, order_id, now).await;
    let document = InvoiceRepository::new(pool)
        .load_document(company_code, order_id, &invoice_number, invoice_date)
        .await?
        .ok_or(InvoiceError::OrderNotFound)?;

    let bytes = invoice_pdf::render_pdf(&document)?;
    Ok(InvoicePdf {
        filename: numbering::invoice_filename(document.file_reference(), now),
        bytes,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use backoffice_core::InvoiceId;
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 11, 12).unwrap()
    }

    #[test]
    fn test_persisted_invoice_is_reused() {
        let header = InvoiceHeader {
            id: InvoiceId::new(3),
            order_id: OrderId::new(9),
            invoice_number: "INV-20240101-000000000-9".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        };
        let (number, date) = number_or_mint(Ok(Some(header)), OrderId::new(9), now());
        assert_eq!(number, "INV-20240101-000000000-9");
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_failed_lookup_mints_for_now() {
        let (number, date) =
            number_or_mint(Err(RepositoryError::NotFound), OrderId::new(9), now());
        assert_eq!(number, numbering::invoice_number(OrderId::new(9), now()));
        assert_eq!(date, now().date_naive());

        let (missing, _) = number_or_mint(Ok(None), OrderId::new(9), now());
        assert_eq!(missing, number);
    }
}
