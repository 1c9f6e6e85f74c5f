//! Checkout transaction orchestrator.
//!
//! A checkout writes the whole order aggregate in one transaction:
//! address, payment method, order header, order items, bookings, payment,
//! invoice and the queued invoice email. Any failing step drops the
//! transaction, which rolls every earlier step back.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use backoffice_core::{
    AddressId, CompanyCode, InvoiceId, MAX_AMOUNT, OrderId, OrderItemId, OutboxId, VariantId,
    fits_column, numbering,
};

use crate::db::checkout::{self as steps, LineVariant, NewOrder};
use crate::db::{RepositoryError, outbox};
use crate::models::{CheckoutLine, CheckoutReceipt, CheckoutRequest, CurrentCustomer};

/// The step a checkout was on when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Begin,
    Address,
    PaymentMethod,
    Order,
    OrderItems,
    Booking,
    Payment,
    Invoice,
    EmailOutbox,
    Commit,
}

impl CheckoutStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Address => "address",
            Self::PaymentMethod => "payment_method",
            Self::Order => "order",
            Self::OrderItems => "order_items",
            Self::Booking => "booking",
            Self::Payment => "payment",
            Self::Invoice => "invoice",
            Self::EmailOutbox => "email_outbox",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request failed validation; nothing was written.
    #[error("{0}")]
    Invalid(String),

    /// `company_code` names a different tenant than the customer's.
    #[error("company_code does not match the signed-in customer")]
    WrongTenant,

    /// `address_id` is not one of the customer's addresses.
    #[error("address {0} not found")]
    AddressNotFound(AddressId),

    /// A step failed and the transaction was rolled back.
    #[error("Checkout failed at {stage} step")]
    Failed {
        stage: CheckoutStage,
        #[source]
        source: RepositoryError,
    },
}

impl CheckoutError {
    /// The failing stage, for stage failures.
    #[must_use]
    pub const fn stage(&self) -> Option<CheckoutStage> {
        match self {
            Self::Failed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Wrap a step error with its stage and log it.
fn at(stage: CheckoutStage) -> impl FnOnce(RepositoryError) -> CheckoutError {
    move |source| {
        tracing::error!(stage = %stage, error = %source, "Checkout step failed, rolling back");
        CheckoutError::Failed { stage, source }
    }
}

/// Resolve the tenant named by the query string against the customer's.
///
/// # Errors
///
/// Returns `CheckoutError::Invalid` when the code is missing or malformed and
/// `CheckoutError::WrongTenant` when it is another tenant's.
pub fn resolve_tenant(
    customer: &CurrentCustomer,
    requested: Option<&str>,
) -> Result<CompanyCode, CheckoutError> {
    let requested = requested
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| CheckoutError::Invalid("company_code is required".to_string()))?;
    let code = CompanyCode::parse(requested)
        .map_err(|e| CheckoutError::Invalid(format!("invalid company_code: {e}")))?;
    if code != customer.company_code {
        return Err(CheckoutError::WrongTenant);
    }
    Ok(code)
}

/// Check a checkout request and return its `total_items`.
///
/// # Errors
///
/// Returns `CheckoutError::Invalid` describing the first problem found.
pub fn validate_request(request: &CheckoutRequest) -> Result<i32, CheckoutError> {
    let invalid = |msg: &str| CheckoutError::Invalid(msg.to_string());

    if request.payment_method.method_type.trim().is_empty() {
        return Err(invalid("payment_method.method_type is required"));
    }
    let bad_last4 = request
        .payment_method
        .card_last4
        .as_deref()
        .is_some_and(|l| l.len() != 4 || !l.chars().all(|c| c.is_ascii_digit()));
    if bad_last4 {
        return Err(invalid("payment_method.card_last4 must be four digits"));
    }
    if request.order_items.is_empty() {
        return Err(invalid("order_items must not be empty"));
    }
    request
        .amounts
        .validate()
        .map_err(|e| CheckoutError::Invalid(e.to_string()))?;

    match (&request.address_id, &request.address) {
        (Some(_), _) => {}
        (None, Some(address)) => address.validate().map_err(CheckoutError::Invalid)?,
        (None, None) => return Err(invalid("address_id or address is required")),
    }

    let mut total_items: i64 = 0;
    for (index, line) in request.order_items.iter().enumerate() {
        let line_no = index + 1;
        if line.quantity <= 0 {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].quantity must be greater than 0"
            )));
        }
        if line.unit_price < Decimal::ZERO {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].unit_price cannot be negative"
            )));
        }
        if !fits_column(line.unit_price) {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].unit_price exceeds {MAX_AMOUNT}"
            )));
        }
        let Some(line_total) = line.line_total().filter(|t| fits_column(*t)) else {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].total_price exceeds {MAX_AMOUNT}"
            )));
        };
        if line_total < Decimal::ZERO {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].total_price cannot be negative"
            )));
        }
        if line.sku.trim().is_empty() || line.style_number.trim().is_empty() {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}] requires sku and style_number"
            )));
        }
        total_items += i64::from(line.quantity);
    }

    i32::try_from(total_items).map_err(|_| invalid("total quantity is too large"))
}

/// Match each line against the tenant's catalog.
///
/// Every `variant_id` must be one of `variants`, and the line's `sku` and
/// `style_number` must be that variant's.
///
/// # Errors
///
/// Returns `CheckoutError::Invalid` naming the first line that does not match.
pub fn match_variants(
    lines: &[CheckoutLine],
    variants: &[LineVariant],
) -> Result<(), CheckoutError> {
    let by_id: HashMap<VariantId, &LineVariant> = variants.iter().map(|v| (v.id, v)).collect();
    for (index, line) in lines.iter().enumerate() {
        let line_no = index + 1;
        let Some(variant) = by_id.get(&line.variant_id) else {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}].variant_id {} not found",
                line.variant_id
            )));
        };
        if line.sku.trim() != variant.sku || line.style_number.trim() != variant.style_number {
            return Err(CheckoutError::Invalid(format!(
                "order_items[{line_no}] does not match variant {}: expected {} / {}",
                variant.id, variant.sku, variant.style_number
            )));
        }
    }
    Ok(())
}

/// A committed checkout.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: String,
    pub invoice_id: InvoiceId,
    pub invoice_number: String,
    pub order_item_ids: Vec<OrderItemId>,
    pub total_items: i32,
    pub total_amount: Decimal,
    pub outbox_id: OutboxId,
}

impl PlacedOrder {
    #[must_use]
    pub fn receipt(self, email_status: &'static str) -> CheckoutReceipt {
        CheckoutReceipt {
            order_id: self.order_id,
            order_number: self.order_number,
            invoice_id: self.invoice_id,
            invoice_number: self.invoice_number,
            order_item_ids: self.order_item_ids,
            total_items: self.total_items,
            total_amount: self.total_amount,
            email_status,
        }
    }
}

/// Runs checkouts.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Write the order aggregate for one checkout.
    ///
    /// `company_code` must already be resolved with [`resolve_tenant`].
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Invalid` before any write (including lines
    /// whose variant is not in the tenant's catalog), or a stage-tagged
    /// `CheckoutError::Failed` after rolling back.
    #[tracing::instrument(skip(self, customer, request), fields(company_code = %company_code, customer_id = %customer.id))]
    pub async fn submit(
        &self,
        customer: &CurrentCustomer,
        company_code: &CompanyCode,
        request: &CheckoutRequest,
        now: DateTime<Utc>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let total_items = validate_request(request)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| at(CheckoutStage::Begin)(e.into()))?;

        let variant_ids: Vec<VariantId> =
            request.order_items.iter().map(|l| l.variant_id).collect();
        let variants = steps::load_variants(&mut *tx, company_code, &variant_ids)
            .await
            .map_err(at(CheckoutStage::OrderItems))?;
        match_variants(&request.order_items, &variants)?;

        let address_id = match (request.address_id, &request.address) {
            (Some(address_id), _) => {
                match steps::verify_address(&mut *tx, company_code, customer.id, address_id).await {
                    Ok(id) => id,
                    Err(RepositoryError::NotFound) => {
                        return Err(CheckoutError::AddressNotFound(address_id));
                    }
                    Err(e) => return Err(at(CheckoutStage::Address)(e)),
                }
            }
            (None, Some(address)) => {
                steps::insert_address(&mut *tx, company_code, customer.id, address)
                    .await
                    .map_err(at(CheckoutStage::Address))?
            }
            (None, None) => {
                return Err(CheckoutError::Invalid(
                    "address_id or address is required".to_string(),
                ));
            }
        };

        let payment_method_id = steps::insert_payment_method(
            &mut *tx,
            company_code,
            customer.id,
            &request.payment_method,
        )
        .await
        .map_err(at(CheckoutStage::PaymentMethod))?;

        let order_number = numbering::order_number(customer.id, now);
        let order_id = steps::insert_order(
            &mut *tx,
            &NewOrder {
                company_code,
                customer_id: customer.id,
                order_number: &order_number,
                address_id,
                payment_method_id,
                amounts: &request.amounts,
                total_items,
                order_notes: request.order_notes.as_deref(),
            },
        )
        .await
        .map_err(at(CheckoutStage::Order))?;

        let order_item_ids =
            steps::insert_order_items(&mut *tx, company_code, order_id, &request.order_items)
                .await
                .map_err(at(CheckoutStage::OrderItems))?;

        steps::insert_bookings(&mut *tx, company_code, order_id)
            .await
            .map_err(at(CheckoutStage::Booking))?;

        steps::insert_payment(
            &mut *tx,
            company_code,
            order_id,
            payment_method_id,
            &request.amounts,
        )
        .await
        .map_err(at(CheckoutStage::Payment))?;

        let invoice_number = numbering::invoice_number(order_id, now);
        let invoice_id = steps::insert_invoice(
            &mut *tx,
            company_code,
            customer.id,
            order_id,
            &invoice_number,
            now.date_naive(),
            request.amounts.total_amount,
        )
        .await
        .map_err(at(CheckoutStage::Invoice))?;

        let outbox_id = outbox::enqueue(&mut *tx, company_code, order_id, invoice_id)
            .await
            .map_err(at(CheckoutStage::EmailOutbox))?;

        tx.commit()
            .await
            .map_err(|e| at(CheckoutStage::Commit)(e.into()))?;

        tracing::info!(
            order_id = %order_id,
            order_number = %order_number,
            invoice_number = %invoice_number,
            total_items,
            "Checkout committed"
        );

        Ok(PlacedOrder {
            order_id,
            order_number,
            invoice_id,
            invoice_number,
            order_item_ids,
            total_items,
            total_amount: request.amounts.total_amount,
            outbox_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use backoffice_core::{CustomerId, Email, OrderAmounts, VariantId};

    use super::*;
    use crate::models::{AddressInput, PaymentMethodInput};

    fn customer() -> CurrentCustomer {
        CurrentCustomer {
            id: CustomerId::new(42),
            company_code: CompanyCode::parse("CMP0001").unwrap(),
            email: Email::parse("buyer@shop.test").unwrap(),
        }
    }

    fn line(quantity: i32, unit_price: i64) -> CheckoutLine {
        CheckoutLine {
            variant_id: VariantId::new(1),
            sku: "ST100-NVY-M".to_string(),
            style_number: "ST100".to_string(),
            quantity,
            unit_price: Decimal::new(unit_price, 0),
            total_price: None,
        }
    }

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            address_id: None,
            address: Some(AddressInput {
                full_name: "Ada Buyer".to_string(),
                line1: "1 Market St".to_string(),
                line2: None,
                city: "Leeds".to_string(),
                state: None,
                postal_code: "LS1 4AP".to_string(),
                country: "GB".to_string(),
                phone: None,
            }),
            payment_method: PaymentMethodInput {
                method_type: "card".to_string(),
                card_holder: Some("Ada Buyer".to_string()),
                card_last4: Some("4242".to_string()),
                provider_reference: None,
            },
            order_items: vec![line(2, 10), line(3, 5)],
            amounts: OrderAmounts {
                subtotal: Decimal::new(35, 0),
                shipping_fee: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                total_amount: Decimal::new(35, 0),
            },
            order_notes: None,
        }
    }

    #[test]
    fn test_total_items_is_sum_of_quantities() {
        assert_eq!(validate_request(&request()).unwrap(), 5);
    }

    #[test]
    fn test_missing_method_type_is_rejected() {
        let mut req = request();
        req.payment_method.method_type = "  ".to_string();
        let err = validate_request(&req).unwrap_err();
        assert_eq!(err.to_string(), "payment_method.method_type is required");
    }

    #[test]
    fn test_empty_order_items_are_rejected() {
        let mut req = request();
        req.order_items.clear();
        assert_eq!(
            validate_request(&req).unwrap_err().to_string(),
            "order_items must not be empty"
        );
    }

    #[test]
    fn test_non_positive_total_is_rejected() {
        let mut req = request();
        req.amounts.total_amount = Decimal::ZERO;
        assert_eq!(
            validate_request(&req).unwrap_err().to_string(),
            "total_amount must be greater than 0"
        );
    }

    #[test]
    fn test_zero_quantity_line_is_rejected() {
        let mut req = request();
        req.order_items.push(line(0, 5));
        assert_eq!(
            validate_request(&req).unwrap_err().to_string(),
            "order_items[3].quantity must be greater than 0"
        );
    }

    #[test]
    fn test_overflowing_line_total_is_rejected() {
        let mut req = request();
        req.order_items[0].unit_price = Decimal::MAX;
        req.order_items[0].quantity = 1000;
        assert!(matches!(validate_request(&req), Err(CheckoutError::Invalid(_))));

        req.order_items[0].unit_price = MAX_AMOUNT;
        req.order_items[0].quantity = 2;
        assert_eq!(
            validate_request(&req).unwrap_err().to_string(),
            format!("order_items[1].total_price exceeds {MAX_AMOUNT}")
        );
    }

    #[test]
    fn test_address_or_address_id_required() {
        let mut req = request();
        req.address = None;
        assert!(matches!(validate_request(&req), Err(CheckoutError::Invalid(_))));

        req.address_id = Some(AddressId::new(3));
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn test_bad_card_last4_is_rejected() {
        let mut req = request();
        req.payment_method.card_last4 = Some("42a2".to_string());
        assert!(matches!(validate_request(&req), Err(CheckoutError::Invalid(_))));
    }

    fn variant(id: i32, sku: &str) -> LineVariant {
        LineVariant {
            id: VariantId::new(id),
            sku: sku.to_string(),
            style_number: "ST100".to_string(),
        }
    }

    #[test]
    fn test_lines_matching_catalog_are_accepted() {
        let mut lines = vec![line(1, 10), line(2, 10)];
        lines[0].sku = " ST100-NVY-M ".to_string();
        lines[1].variant_id = VariantId::new(2);
        lines[1].sku = "ST100-NVY-L".to_string();
        let variants = [variant(1, "ST100-NVY-M"), variant(2, "ST100-NVY-L")];
        assert!(match_variants(&lines, &variants).is_ok());
    }

    #[test]
    fn test_unknown_variant_is_rejected() {
        let lines = vec![line(1, 10)];
        assert_eq!(
            match_variants(&lines, &[]).unwrap_err().to_string(),
            "order_items[1].variant_id 1 not found"
        );
    }

    #[test]
    fn test_sku_not_matching_variant_is_rejected() {
        let mut lines = vec![line(1, 10)];
        lines[0].sku = "TOTALLY-DIFFERENT".to_string();
        assert!(matches!(
            match_variants(&lines, &[variant(1, "ST100-NVY-M")]),
            Err(CheckoutError::Invalid(_))
        ));

        let mut lines = vec![line(1, 10)];
        lines[0].style_number = "ST200".to_string();
        assert!(matches!(
            match_variants(&lines, &[variant(1, "ST100-NVY-M")]),
            Err(CheckoutError::Invalid(_))
        ));
    }

    #[test]
    fn test_resolve_tenant() {
        let customer = customer();
        assert_eq!(
            resolve_tenant(&customer, Some("cmp0001")).unwrap().as_str(),
            "CMP0001"
        );
        assert!(matches!(
            resolve_tenant(&customer, Some("CMP0002")),
            Err(CheckoutError::WrongTenant)
        ));
        assert!(matches!(
            resolve_tenant(&customer, None),
            Err(CheckoutError::Invalid(_))
        ));
        assert!(matches!(
            resolve_tenant(&customer, Some("bad code!")),
            Err(CheckoutError::Invalid(_))
        ));
    }

    #[test]
    fn test_stage_failure_message_names_stage() {
        let err = CheckoutError::Failed {
            stage: CheckoutStage::OrderItems,
            source: RepositoryError::NotFound,
        };
        assert_eq!(err.to_string(), "Checkout failed at order_items step");
        assert_eq!(err.stage(), Some(CheckoutStage::OrderItems));
    }
}
