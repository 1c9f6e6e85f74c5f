//! Invoice document and outbox types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use backoffice_core::{CompanyCode, Email, InvoiceId, OrderAmounts, OrderId, OutboxId, OutboxStatus};

/// Name and contact block printed on an invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InvoiceParty {
    pub name: String,
    /// Address lines, already formatted.
    pub lines: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// One printed invoice row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvoiceLine {
    pub sku: String,
    pub style_number: String,
    pub style_name: String,
    pub color: String,
    pub size: String,
    pub fit: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
}

/// Everything the renderer needs, gathered in one read.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub order_id: OrderId,
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    pub company_code: CompanyCode,
    pub company: InvoiceParty,
    pub bill_to: InvoiceParty,
    pub ship_to: InvoiceParty,
    /// Recipient of the invoice email.
    pub customer_email: Email,
    pub payment_method: String,
    pub items: Vec<InvoiceLine>,
    pub amounts: OrderAmounts,
    pub order_notes: Option<String>,
}

impl InvoiceDocument {
    /// Reference used in the PDF file name: the order number, or the invoice
    /// number when the order has none.
    #[must_use]
    pub fn file_reference(&self) -> &str {
        if self.order_number.trim().is_empty() {
            &self.invoice_number
        } else {
            &self.order_number
        }
    }
}

/// A row of `invoice_email_outbox`.
#[derive(Debug, Clone, Serialize)]
pub struct OutboxEntry {
    pub id: OutboxId,
    pub company_code: CompanyCode,
    pub order_id: OrderId,
    pub invoice_id: InvoiceId,
    pub status: OutboxStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub message_id: Option<String>,
    pub next_attempt_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}
