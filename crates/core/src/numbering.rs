//! Order numbers, invoice numbers and invoice file names.
//!
//! All builders are pure: the caller supplies the clock reading, which keeps
//! them deterministic under test. Timestamps are rendered in UTC.
//!
//! | value | format |
//! |---|---|
//! | order number | `ORD-<epoch_ms>-<customer_id>` |
//! | invoice number | `INV-YYYYMMDD-HHMMSSmmm-<order_id>` |
//! | invoice file name | `invoice-<reference>-YYYYMMDD-HHMMSS.pdf` |
//!
//! Order numbers are unique per customer per millisecond and invoice numbers
//! per order per millisecond; the `UNIQUE` constraints on `orders` and
//! `invoices` turn the (unlikely) collision into a failed checkout rather
//! than a duplicate.

use chrono::{DateTime, Utc};

use crate::{CustomerId, OrderId};

/// Prefix of every order number.
pub const ORDER_NUMBER_PREFIX: &str = "ORD";

/// Prefix of every invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "INV";

/// Build the order number for a checkout.
///
/// ```
/// use backoffice_core::{CustomerId, numbering::order_number};
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
/// assert_eq!(order_number(CustomerId::new(42), now), "ORD-1700000000123-42");
/// ```
#[must_use]
pub fn order_number(customer_id: CustomerId, now: DateTime<Utc>) -> String {
    format!(
        "{ORDER_NUMBER_PREFIX}-{}-{customer_id}",
        now.timestamp_millis()
    )
}

/// Build a time-based invoice number for an order.
///
/// ```
/// use backoffice_core::{OrderId, numbering::invoice_number};
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
///     + chrono::Duration::milliseconds(42);
/// assert_eq!(invoice_number(OrderId::new(17), now), "INV-20240309-140507042-17");
/// ```
#[must_use]
pub fn invoice_number(order_id: OrderId, now: DateTime<Utc>) -> String {
    format!(
        "{INVOICE_NUMBER_PREFIX}-{}-{order_id}",
        now.format("%Y%m%d-%H%M%S%3f")
    )
}

/// Build the download/attachment file name of an invoice PDF.
///
/// `reference` is the order number when known, otherwise the invoice number.
/// Characters that are unsafe in a `Content-Disposition` file name are
/// replaced with `_`.
///
/// ```
/// use backoffice_core::numbering::invoice_filename;
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
/// assert_eq!(
///     invoice_filename("ORD-1709993107000-42", now),
///     "invoice-ORD-1709993107000-42-20240309-140507.pdf"
/// );
/// ```
#[must_use]
pub fn invoice_filename(reference: &str, now: DateTime<Utc>) -> String {
    let safe: String = reference
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("invoice-{safe}-{}.pdf", now.format("%Y%m%d-%H%M%S"))
}

/// Whether `value` has the shape of an order number for `customer_id`.
#[must_use]
pub fn is_order_number_for(value: &str, customer_id: CustomerId) -> bool {
    let mut parts = value.splitn(3, '-');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(ORDER_NUMBER_PREFIX), Some(millis), Some(customer))
            if !millis.is_empty()
                && millis.chars().all(|c| c.is_ascii_digit())
                && customer == customer_id.to_string()
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_order_number_shape() {
        let number = order_number(CustomerId::new(5), at(1_712_000_000_001));
        assert_eq!(number, "ORD-1712000000001-5");
        assert!(is_order_number_for(&number, CustomerId::new(5)));
        assert!(!is_order_number_for(&number, CustomerId::new(6)));
    }

    #[test]
    fn test_is_order_number_rejects_malformed() {
        let customer = CustomerId::new(5);
        assert!(!is_order_number_for("ORD--5", customer));
        assert!(!is_order_number_for("INV-123-5", customer));
        assert!(!is_order_number_for("ORD-12a-5", customer));
    }

    #[test]
    fn test_invoice_number_pads_milliseconds() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(invoice_number(OrderId::new(9), now), "INV-20250102-030405000-9");
    }

    #[test]
    fn test_invoice_numbers_differ_across_milliseconds() {
        let a = invoice_number(OrderId::new(1), at(1_712_000_000_001));
        let b = invoice_number(OrderId::new(1), at(1_712_000_000_002));
        assert_ne!(a, b);
    }

    #[test]
    fn test_invoice_filename_sanitizes_reference() {
        let now = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            invoice_filename("INV/1 \"x\"", now),
            "invoice-INV_1__x_-20250102-030405.pdf"
        );
    }
}
