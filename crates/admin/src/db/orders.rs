//! Order repository: order views and status changes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use backoffice_core::{
    AddressId, CompanyCode, CustomerId, OrderId, OrderItemId, OrderStatus, VariantId,
};

use super::{RepositoryError, parse_column};
use crate::models::{Order, OrderDetail, OrderItemDetail, OrderListFilter};

const ORDER_COLUMNS: &str = "id, company_code, customer_id, order_number, address_id, subtotal, \
                             shipping_fee, tax_amount, total_amount, total_items, order_status, \
                             order_notes, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    company_code: CompanyCode,
    customer_id: CustomerId,
    order_number: String,
    address_id: AddressId,
    subtotal: Decimal,
    shipping_fee: Decimal,
    tax_amount: Decimal,
    total_amount: Decimal,
    total_items: i32,
    order_status: String,
    order_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            company_code: row.company_code,
            customer_id: row.customer_id,
            order_number: row.order_number,
            address_id: row.address_id,
            subtotal: row.subtotal,
            shipping_fee: row.shipping_fee,
            tax_amount: row.tax_amount,
            total_amount: row.total_amount,
            total_items: row.total_items,
            order_status: parse_column(&row.order_status)?,
            order_notes: row.order_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    line_no: i32,
    variant_id: VariantId,
    sku: String,
    style_number: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    booking_status: Option<String>,
    issued_qty: i64,
}

impl TryFrom<OrderItemRow> for OrderItemDetail {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            line_no: row.line_no,
            variant_id: row.variant_id,
            sku: row.sku,
            style_number: row.style_number,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            booking_status: row.booking_status.as_deref().map(parse_column).transpose()?,
            issued_qty: row.issued_qty,
        })
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a tenant's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn list(
        &self,
        company_code: &CompanyCode,
        filter: &OrderListFilter,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM backoffice.orders \
             WHERE company_code = $1 AND ($2::text IS NULL OR order_status = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(company_code)
            .bind(filter.status.as_ref().map(OrderStatus::as_str))
            .bind(filter.limit())
            .bind(filter.offset())
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// List one customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn list_for_customer(
        &self,
        company_code: &CompanyCode,
        customer_id: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM backoffice.orders \
             WHERE company_code = $1 AND customer_id = $2 \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(company_code)
            .bind(customer_id)
            .fetch_all(self.pool)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get an order header.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored status is unknown.
    pub async fn get(
        &self,
        company_code: &CompanyCode,
        id: OrderId,
    ) -> Result<Option<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM backoffice.orders WHERE company_code = $1 AND id = $2"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(company_code)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get an order with its items, booking states and latest invoice number.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored status is unknown.
    pub async fn get_detail(
        &self,
        company_code: &CompanyCode,
        id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(order) = self.get(company_code, id).await? else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.line_no, oi.variant_id, oi.sku, oi.style_number, oi.quantity,
                   oi.unit_price, oi.total_price,
                   b.status AS booking_status,
                   COALESCE((SELECT SUM(si.issuing_qty) FROM backoffice.stock_issuing si
                             WHERE si.order_item_id = oi.id), 0)::bigint AS issued_qty
            FROM backoffice.order_items oi
            LEFT JOIN backoffice.booking b ON b.order_item_id = oi.id
            WHERE oi.order_id = $1 AND oi.company_code = $2
            ORDER BY oi.line_no
            ",
        )
        .bind(id)
        .bind(company_code)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(TryInto::try_into)
        .collect::<Result<Vec<_>, _>>()?;

        let invoice_number = super::InvoiceRepository::new(self.pool)
            .latest_invoice_number(company_code, id)
            .await?;

        let payment_status = sqlx::query_scalar::<_, String>(
            r"
            SELECT payment_status FROM backoffice.payments
            WHERE order_id = $1 AND company_code = $2
            ",
        )
        .bind(id)
        .bind(company_code)
        .fetch_optional(self.pool)
        .await?
        .as_deref()
        .map(parse_column)
        .transpose()?;

        Ok(Some(OrderDetail {
            order,
            items,
            invoice_number,
            payment_status,
        }))
    }

    /// Move an order to `next`, enforcing the transition rules.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order is not in the tenant.
    /// Returns `RepositoryError::Conflict` if the transition is not allowed.
    pub async fn update_status(
        &self,
        company_code: &CompanyCode,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let current = lock_order_status(&mut *tx, company_code, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "order cannot move from {current} to {next}"
            )));
        }
        set_order_status(&mut *tx, company_code, id, next).await?;
        tx.commit().await?;

        self.get(company_code, id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Lock an order row and return its status.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
/// Returns `RepositoryError::DataCorruption` if the stored status is unknown.
pub async fn lock_order_status(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    id: OrderId,
) -> Result<Option<OrderStatus>, RepositoryError> {
    let status = sqlx::query_scalar::<_, String>(
        r"
        SELECT order_status FROM backoffice.orders
        WHERE id = $1 AND company_code = $2
        FOR UPDATE
        ",
    )
    .bind(id)
    .bind(company_code)
    .fetch_optional(&mut *conn)
    .await?;

    status.as_deref().map(parse_column).transpose()
}

/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn set_order_status(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE backoffice.orders
        SET order_status = $3, updated_at = now()
        WHERE id = $1 AND company_code = $2
        ",
    )
    .bind(id)
    .bind(company_code)
    .bind(status.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// An order item as seen by the stock allocator.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct IssuableItem {
    pub id: OrderItemId,
    pub sku: String,
    pub style_number: String,
    pub quantity: i32,
    /// Units already written to the issuing ledger.
    pub issued_qty: i64,
}

/// The order's items with the quantity already issued against each.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn issuable_items(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
) -> Result<Vec<IssuableItem>, RepositoryError> {
    let items = sqlx::query_as::<_, IssuableItem>(
        r"
        SELECT oi.id, oi.sku, oi.style_number, oi.quantity,
               COALESCE((SELECT SUM(si.issuing_qty) FROM backoffice.stock_issuing si
                         WHERE si.order_item_id = oi.id), 0)::bigint AS issued_qty
        FROM backoffice.order_items oi
        WHERE oi.order_id = $1 AND oi.company_code = $2
        ORDER BY oi.line_no
        ",
    )
    .bind(order_id)
    .bind(company_code)
    .fetch_all(&mut *conn)
    .await?;
    Ok(items)
}
