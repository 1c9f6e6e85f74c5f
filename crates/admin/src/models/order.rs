//! Order aggregate types: checkout input, receipts and order views.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{
    AddressId, BookingStatus, CompanyCode, CustomerId, InvoiceId, OrderAmounts, OrderId,
    OrderItemId, OrderStatus, PaymentStatus, VariantId,
};

/// A new shipping address submitted with a checkout.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressInput {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl AddressInput {
    /// # Errors
    ///
    /// Returns a message naming the first missing field.
    pub fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("full_name", &self.full_name),
            ("line1", &self.line1),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ] {
            if value.trim().is_empty() {
                return Err(format!("address.{field} is required"));
            }
        }
        Ok(())
    }
}

/// Payment method snapshot submitted with a checkout.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PaymentMethodInput {
    #[serde(default)]
    pub method_type: String,
    pub card_holder: Option<String>,
    pub card_last4: Option<String>,
    pub provider_reference: Option<String>,
}

/// One requested order line.
///
/// `total_price` defaults to `quantity * unit_price` when omitted.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutLine {
    pub variant_id: VariantId,
    pub sku: String,
    pub style_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Option<Decimal>,
}

impl CheckoutLine {
    /// Line total as stored on the order item, or `None` if computing it
    /// overflows.
    #[must_use]
    pub fn line_total(&self) -> Option<Decimal> {
        match self.total_price {
            Some(total) => Some(total),
            None => self.unit_price.checked_mul(Decimal::from(self.quantity)),
        }
    }
}

/// Body of `POST /submit-checkout`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    /// Reuse a saved address instead of submitting `address`.
    pub address_id: Option<AddressId>,
    pub address: Option<AddressInput>,
    #[serde(default)]
    pub payment_method: PaymentMethodInput,
    #[serde(default)]
    pub order_items: Vec<CheckoutLine>,
    #[serde(flatten)]
    pub amounts: OrderAmounts,
    pub order_notes: Option<String>,
}

/// Response of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    pub order_number: String,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    /// Order item ids in request order.
    pub order_item_ids: Vec<OrderItemId>,
    pub total_items: i32,
    pub total_amount: Decimal,
    /// `queued` when an invoice email will be delivered, `disabled` when SMTP
    /// is not configured.
    pub email_status: &'static str,
}

/// An order header.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub company_code: CompanyCode,
    pub customer_id: CustomerId,
    pub order_number: String,
    pub address_id: AddressId,
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub total_items: i32,
    pub order_status: OrderStatus,
    pub order_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order item together with its booking state.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDetail {
    pub id: OrderItemId,
    pub line_no: i32,
    pub variant_id: VariantId,
    pub sku: String,
    pub style_number: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    /// `None` when no booking row exists.
    pub booking_status: Option<BookingStatus>,
    /// Units already written to the issuing ledger.
    pub issued_qty: i64,
}

/// `GET /api/admin/orders/{id}` response.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemDetail>,
    pub invoice_number: Option<String>,
    /// `None` when no payment row exists.
    pub payment_status: Option<PaymentStatus>,
}

/// Query string of `GET /api/admin/orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl OrderListFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 200;

    /// Limit clamped to `1..=MAX_LIMIT`.
    #[must_use]
    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }

    #[must_use]
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_line_total_defaults_to_quantity_times_price() {
        let line = CheckoutLine {
            variant_id: VariantId::new(1),
            sku: "S1".to_string(),
            style_number: "ST1".to_string(),
            quantity: 3,
            unit_price: Decimal::new(1050, 2),
            total_price: None,
        };
        assert_eq!(line.line_total(), Some(Decimal::new(3150, 2)));
    }

    #[test]
    fn test_line_total_overflow_is_none() {
        let line = CheckoutLine {
            variant_id: VariantId::new(1),
            sku: "S1".to_string(),
            style_number: "ST1".to_string(),
            quantity: 1000,
            unit_price: Decimal::MAX,
            total_price: None,
        };
        assert_eq!(line.line_total(), None);
    }

    #[test]
    fn test_checkout_request_reads_flattened_amounts() {
        let request: CheckoutRequest = serde_json::from_value(serde_json::json!({
            "address_id": 7,
            "payment_method": {"method_type": "card", "card_last4": "4242"},
            "order_items": [
                {"variant_id": 1, "sku": "S1", "style_number": "ST1",
                 "quantity": 2, "unit_price": "10", "total_price": "20"}
            ],
            "subtotal": "20",
            "total_amount": "20"
        }))
        .unwrap();

        assert_eq!(request.address_id, Some(AddressId::new(7)));
        assert_eq!(request.amounts.total_amount, Decimal::new(20, 0));
        assert_eq!(request.amounts.shipping_fee, Decimal::ZERO);
        assert_eq!(request.order_items.len(), 1);
    }

    #[test]
    fn test_order_list_filter_clamps_limit() {
        let filter = OrderListFilter {
            status: None,
            limit: Some(10_000),
            offset: Some(-5),
        };
        assert_eq!(filter.limit(), OrderListFilter::MAX_LIMIT);
        assert_eq!(filter.offset(), 0);
        assert_eq!(OrderListFilter::default().limit(), 50);
    }
}
