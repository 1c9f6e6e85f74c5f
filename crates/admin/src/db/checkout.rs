//! Inserts that make up one checkout.
//!
//! Each function runs on the caller's transaction connection; the checkout
//! service sequences them and decides when to commit.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgConnection;

use backoffice_core::{
    AddressId, CompanyCode, CustomerId, InvoiceId, OrderAmounts, OrderId, OrderItemId, OutboxId,
    PaymentId, PaymentMethodId, PaymentStatus, VariantId,
};

use super::RepositoryError;
use crate::models::{AddressInput, CheckoutLine, PaymentMethodInput};

/// Confirm a saved address belongs to the customer.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if it belongs to someone else or does not exist.
pub async fn verify_address(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    customer_id: CustomerId,
    address_id: AddressId,
) -> Result<AddressId, RepositoryError> {
    sqlx::query_scalar::<_, AddressId>(
        r"
        SELECT id FROM backoffice.addresses
        WHERE id = $1 AND company_code = $2 AND customer_id = $3
        ",
    )
    .bind(address_id)
    .bind(company_code)
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_address(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    customer_id: CustomerId,
    address: &AddressInput,
) -> Result<AddressId, RepositoryError> {
    let id = sqlx::query_scalar::<_, AddressId>(
        r"
        INSERT INTO backoffice.addresses
            (company_code, customer_id, full_name, line1, line2, city, state, postal_code,
             country, phone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(customer_id)
    .bind(address.full_name.trim())
    .bind(address.line1.trim())
    .bind(address.line2.as_deref())
    .bind(address.city.trim())
    .bind(address.state.as_deref())
    .bind(address.postal_code.trim())
    .bind(address.country.trim())
    .bind(address.phone.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment_method(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    customer_id: CustomerId,
    method: &PaymentMethodInput,
) -> Result<PaymentMethodId, RepositoryError> {
    let id = sqlx::query_scalar::<_, PaymentMethodId>(
        r"
        INSERT INTO backoffice.payment_methods
            (company_code, customer_id, method_type, card_holder, card_last4, provider_reference)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(customer_id)
    .bind(method.method_type.trim())
    .bind(method.card_holder.as_deref())
    .bind(method.card_last4.as_deref())
    .bind(method.provider_reference.as_deref())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Columns of a new order header.
#[derive(Debug)]
pub struct NewOrder<'n> {
    pub company_code: &'n CompanyCode,
    pub customer_id: CustomerId,
    pub order_number: &'n str,
    pub address_id: AddressId,
    pub payment_method_id: PaymentMethodId,
    pub amounts: &'n OrderAmounts,
    pub total_items: i32,
    pub order_notes: Option<&'n str>,
}

/// Insert the order header with status `Pending` (the column default).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<OrderId, RepositoryError> {
    let id = sqlx::query_scalar::<_, OrderId>(
        r"
        INSERT INTO backoffice.orders
            (company_code, customer_id, order_number, address_id, payment_method_id,
             subtotal, shipping_fee, tax_amount, total_amount, total_items, order_notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING id
        ",
    )
    .bind(order.company_code)
    .bind(order.customer_id)
    .bind(order.order_number)
    .bind(order.address_id)
    .bind(order.payment_method_id)
    .bind(order.amounts.subtotal)
    .bind(order.amounts.shipping_fee)
    .bind(order.amounts.tax_amount)
    .bind(order.amounts.total_amount)
    .bind(order.total_items)
    .bind(order.order_notes)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// A catalog variant as referenced by an order line.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LineVariant {
    pub id: VariantId,
    pub sku: String,
    pub style_number: String,
}

/// Load the tenant's variants among `ids`, locking them against deletion
/// until the checkout commits.
///
/// Ids that are unknown or belong to another tenant are simply absent from
/// the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn load_variants(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    ids: &[VariantId],
) -> Result<Vec<LineVariant>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(VariantId::as_i32).collect();
    let variants = sqlx::query_as::<_, LineVariant>(
        r"
        SELECT id, sku, style_number FROM backoffice.style_variants
        WHERE id = ANY($1) AND company_code = $2
        FOR SHARE
        ",
    )
    .bind(&ids)
    .bind(company_code)
    .fetch_all(&mut *conn)
    .await?;
    Ok(variants)
}

/// Bulk-insert the order lines in one statement.
///
/// Each line gets an explicit `line_no` (1-based, request order). Ids are
/// returned sorted by `line_no`, so the result lines up with `lines` without
/// assuming anything about how ids were allocated.
///
/// Lines must already be matched against [`load_variants`].
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails and
/// `RepositoryError::Conflict` if a line total cannot be computed.
pub async fn insert_order_items(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
    lines: &[CheckoutLine],
) -> Result<Vec<OrderItemId>, RepositoryError> {
    let variant_ids: Vec<i32> = lines.iter().map(|l| l.variant_id.as_i32()).collect();
    let skus: Vec<&str> = lines.iter().map(|l| l.sku.trim()).collect();
    let style_numbers: Vec<&str> = lines.iter().map(|l| l.style_number.trim()).collect();
    let quantities: Vec<i32> = lines.iter().map(|l| l.quantity).collect();
    let unit_prices: Vec<Decimal> = lines.iter().map(|l| l.unit_price).collect();
    let totals = lines
        .iter()
        .map(|l| {
            l.line_total()
                .ok_or_else(|| RepositoryError::Conflict("order item total overflows".to_string()))
        })
        .collect::<Result<Vec<Decimal>, _>>()?;

    let rows = sqlx::query_as::<_, (OrderItemId, i32)>(
        r"
        INSERT INTO backoffice.order_items
            (order_id, company_code, line_no, variant_id, sku, style_number, quantity,
             unit_price, total_price)
        SELECT $1, $2, t.line_no::int, t.variant_id, t.sku, t.style_number, t.quantity,
               t.unit_price, t.total_price
        FROM UNNEST($3::int[], $4::text[], $5::text[], $6::int[], $7::numeric[], $8::numeric[])
            WITH ORDINALITY
            AS t(variant_id, sku, style_number, quantity, unit_price, total_price, line_no)
        RETURNING id, line_no
        ",
    )
    .bind(order_id)
    .bind(company_code)
    .bind(&variant_ids)
    .bind(&skus)
    .bind(&style_numbers)
    .bind(&quantities)
    .bind(&unit_prices)
    .bind(&totals)
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != lines.len() {
        return Err(RepositoryError::DataCorruption(format!(
            "inserted {} order items for {} lines",
            rows.len(),
            lines.len()
        )));
    }

    let mut rows = rows;
    rows.sort_by_key(|(_, line_no)| *line_no);
    Ok(rows.into_iter().map(|(id, _)| id).collect())
}

/// Create one `Not Booked` booking per order item of the order.
///
/// Reads the items back by `order_id` rather than deriving their ids.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_bookings(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO backoffice.booking (company_code, order_item_id, sku, style_number, ordered_qty)
        SELECT company_code, id, sku, style_number, quantity
        FROM backoffice.order_items
        WHERE order_id = $1 AND company_code = $2
        ORDER BY line_no
        ",
    )
    .bind(order_id)
    .bind(company_code)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Record the payment with status `Pending`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_payment(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
    payment_method_id: PaymentMethodId,
    amounts: &OrderAmounts,
) -> Result<PaymentId, RepositoryError> {
    let id = sqlx::query_scalar::<_, PaymentId>(
        r"
        INSERT INTO backoffice.payments
            (company_code, order_id, payment_method_id, subtotal, shipping_fee, tax_amount,
             total_amount, payment_status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(order_id)
    .bind(payment_method_id)
    .bind(amounts.subtotal)
    .bind(amounts.shipping_fee)
    .bind(amounts.tax_amount)
    .bind(amounts.total_amount)
    .bind(PaymentStatus::Pending.as_str())
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// # Errors
///
/// Returns `RepositoryError::Conflict` if the invoice number is already taken.
pub async fn insert_invoice(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    customer_id: CustomerId,
    order_id: OrderId,
    invoice_number: &str,
    invoice_date: NaiveDate,
    total_amount: Decimal,
) -> Result<InvoiceId, RepositoryError> {
    sqlx::query_scalar::<_, InvoiceId>(
        r"
        INSERT INTO backoffice.invoices
            (company_code, customer_id, order_id, invoice_number, invoice_date, total_amount)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(customer_id)
    .bind(order_id)
    .bind(invoice_number)
    .bind(invoice_date)
    .bind(total_amount)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_constraint(e, "invoice number"))
}
