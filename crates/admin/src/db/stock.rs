//! Stock lot repository and the issuing ledger writes.
//!
//! Lots are consumed oldest first (`created_at, id`). The ledger insert
//! trigger `decrement_main_stock` draws the quantity down from the lot; the
//! application never updates `main_stock_qty` directly.

use sqlx::{PgConnection, PgPool};

use backoffice_core::{BookingStatus, CompanyCode, OrderId, OrderItemId, StockIssuingId};

use super::RepositoryError;
use crate::models::{LotAllocation, ReceiveLotInput, StockLot};

const LOT_COLUMNS: &str = "id, company_code, style_number, sku, batch_number, lot_no, \
                           unit_price, main_stock_qty, created_at";

/// Repository for stock lot database operations.
pub struct StockRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockRepository<'a> {
    /// Create a new stock repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Receive an inbound lot into `main_stock`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn receive_lot(
        &self,
        company_code: &CompanyCode,
        input: &ReceiveLotInput,
    ) -> Result<StockLot, RepositoryError> {
        let sql = format!(
            "INSERT INTO backoffice.main_stock \
                 (company_code, style_number, sku, batch_number, lot_no, unit_price, main_stock_qty) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {LOT_COLUMNS}"
        );
        let lot = sqlx::query_as::<_, StockLot>(&sql)
            .bind(company_code)
            .bind(input.style_number.trim())
            .bind(input.sku.trim())
            .bind(input.batch_number.trim())
            .bind(input.lot_no.trim())
            .bind(input.unit_price)
            .bind(input.quantity)
            .fetch_one(self.pool)
            .await?;
        Ok(lot)
    }

    /// Lots of a SKU that still hold stock, in FIFO order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn available_lots(
        &self,
        company_code: &CompanyCode,
        sku: &str,
    ) -> Result<Vec<StockLot>, RepositoryError> {
        let sql = format!(
            "SELECT {LOT_COLUMNS} FROM backoffice.main_stock \
             WHERE company_code = $1 AND sku = $2 AND main_stock_qty > 0 \
             ORDER BY created_at ASC, id ASC"
        );
        let lots = sqlx::query_as::<_, StockLot>(&sql)
            .bind(company_code)
            .bind(sku)
            .fetch_all(self.pool)
            .await?;
        Ok(lots)
    }
}

// =============================================================================
// Transaction-scoped operations (issuing)
// =============================================================================

/// Lock every lot with stock for the given `(style_number, sku)` pairs.
///
/// Rows are locked `FOR UPDATE` in FIFO order so that two concurrent issuing
/// batches serialize on the same lots instead of both reading the same
/// quantity.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_available_lots(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    style_numbers: &[String],
    skus: &[String],
) -> Result<Vec<StockLot>, RepositoryError> {
    let sql = format!(
        "SELECT {LOT_COLUMNS} FROM backoffice.main_stock \
         WHERE company_code = $1 \
           AND (style_number, sku) IN (SELECT * FROM UNNEST($2::text[], $3::text[])) \
           AND main_stock_qty > 0 \
         ORDER BY created_at ASC, id ASC \
         FOR UPDATE"
    );
    let lots = sqlx::query_as::<_, StockLot>(&sql)
        .bind(company_code)
        .bind(style_numbers)
        .bind(skus)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lots)
}

/// Append one ledger row; the trigger decrements the source lot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails, including when the
/// lot would go negative.
pub async fn insert_issuing(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_id: OrderId,
    allocation: &LotAllocation,
) -> Result<StockIssuingId, RepositoryError> {
    let id = sqlx::query_scalar::<_, StockIssuingId>(
        r"
        INSERT INTO backoffice.stock_issuing
            (company_code, order_id, order_item_id, main_stock_id, style_number, sku,
             batch_number, lot_no, unit_price, issuing_qty)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING id
        ",
    )
    .bind(company_code)
    .bind(order_id)
    .bind(allocation.order_item_id)
    .bind(allocation.main_stock_id)
    .bind(&allocation.style_number)
    .bind(&allocation.sku)
    .bind(&allocation.batch_number)
    .bind(&allocation.lot_no)
    .bind(allocation.unit_price)
    .bind(allocation.issuing_qty)
    .fetch_one(&mut *conn)
    .await?;
    Ok(id)
}

/// Mark an order item's booking as issued, creating the row if checkout
/// never did.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order item is not in the tenant.
/// Returns `RepositoryError::Database` if the query fails.
pub async fn mark_booking_issued(
    conn: &mut PgConnection,
    company_code: &CompanyCode,
    order_item_id: OrderItemId,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        INSERT INTO backoffice.booking (company_code, order_item_id, sku, style_number, ordered_qty, status)
        SELECT oi.company_code, oi.id, oi.sku, oi.style_number, oi.quantity, $3
        FROM backoffice.order_items oi
        WHERE oi.id = $1 AND oi.company_code = $2
        ON CONFLICT (order_item_id)
        DO UPDATE SET status = EXCLUDED.status, updated_at = now()
        ",
    )
    .bind(order_item_id)
    .bind(company_code)
    .bind(BookingStatus::Issued.as_str())
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
