//! Stock allocator: FIFO issuing of order items from stock lots.
//!
//! An issuing batch is all-or-nothing. Every item is planned against the
//! locked lots before anything is written; if any item cannot be covered the
//! batch is abandoned and every shortfall is reported together.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;

use backoffice_core::{CompanyCode, OrderId, OrderItemId, OrderStatus, StockLotId};

use crate::db::orders::{self, IssuableItem};
use crate::db::{RepositoryError, stock};
use crate::models::{IssueReceipt, IssuedAllocation, IssuingItem, LotAllocation, StockLot};

/// Why one requested item could not be issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub order_item_id: OrderItemId,
    pub sku: String,
    pub error: String,
}

/// Errors from an issuing batch.
#[derive(Debug, Error)]
pub enum IssueError {
    /// The request itself is malformed.
    #[error("{0}")]
    Invalid(String),

    /// No such order in the tenant.
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The order's status does not allow issuing.
    #[error("order is {0} and cannot be issued")]
    InvalidStatus(OrderStatus),

    /// Some `order_item_id`s are not items of the order.
    #[error("order items do not belong to the order: {}", join_ids(.0))]
    ForeignOrderItems(Vec<OrderItemId>),

    /// Stock could not cover at least one item; nothing was issued.
    #[error("insufficient stock for {} item(s)", .0.len())]
    Unavailable(Vec<ItemFailure>),

    /// Database failure; the batch was rolled back.
    #[error("database error: {0}")]
    Database(#[from] RepositoryError),
}

impl From<sqlx::Error> for IssueError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(err))
    }
}

fn join_ids(ids: &[OrderItemId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check the shape of an issuing request before touching the database.
///
/// # Errors
///
/// Returns `IssueError::Invalid` describing the first problem found.
pub fn validate_items(items: &[IssuingItem]) -> Result<(), IssueError> {
    if items.is_empty() {
        return Err(IssueError::Invalid("issuing_items must not be empty".to_string()));
    }
    for item in items {
        if item.issuing_qty <= 0 {
            return Err(IssueError::Invalid(format!(
                "issuing_qty for order item {} must be greater than 0",
                item.order_item_id
            )));
        }
        if item.sku.trim().is_empty() || item.style_number.trim().is_empty() {
            return Err(IssueError::Invalid(format!(
                "sku and style_number are required for order item {}",
                item.order_item_id
            )));
        }
    }
    Ok(())
}

/// Check a batch against the order's own items.
///
/// Every `order_item_id` must be an item of the order, the submitted `sku`
/// and `style_number` must be that item's, and the quantity requested for an
/// item (summed over the batch) must not exceed what was ordered less what
/// has already been issued.
///
/// # Errors
///
/// Returns `IssueError::ForeignOrderItems` listing every unknown id, or
/// `IssueError::Invalid` for the first mismatched or over-issued item.
pub fn check_against_order(
    items: &[IssuingItem],
    ordered: &[IssuableItem],
) -> Result<(), IssueError> {
    let by_id: HashMap<OrderItemId, &IssuableItem> = ordered.iter().map(|o| (o.id, o)).collect();

    let foreign: BTreeSet<OrderItemId> = items
        .iter()
        .map(|i| i.order_item_id)
        .filter(|id| !by_id.contains_key(id))
        .collect();
    if !foreign.is_empty() {
        return Err(IssueError::ForeignOrderItems(foreign.into_iter().collect()));
    }

    let mut requested: BTreeMap<OrderItemId, i64> = BTreeMap::new();
    for item in items {
        let Some(order_item) = by_id.get(&item.order_item_id) else {
            continue;
        };
        if item.sku.trim() != order_item.sku || item.style_number.trim() != order_item.style_number
        {
            return Err(IssueError::Invalid(format!(
                "order item {} is {} / {}, not {} / {}",
                order_item.id,
                order_item.sku,
                order_item.style_number,
                item.sku.trim(),
                item.style_number.trim()
            )));
        }
        *requested.entry(item.order_item_id).or_default() += i64::from(item.issuing_qty);
    }

    for (id, qty) in requested {
        let Some(order_item) = by_id.get(&id) else {
            continue;
        };
        let open = i64::from(order_item.quantity) - order_item.issued_qty;
        if qty > open {
            return Err(IssueError::Invalid(format!(
                "issuing_qty {qty} for order item {id} exceeds the {open} unit(s) left to issue"
            )));
        }
    }
    Ok(())
}

/// Plan a batch against the available lots, oldest lot first.
///
/// Lots are matched on `(style_number, sku)` and consumed in
/// `(created_at, id)` order whatever order they are passed in. A request
/// larger than the oldest lot continues into the next-oldest lots. Quantity
/// taken by one item is no longer available to later items in the same
/// batch. An item that cannot be covered in full takes nothing.
///
/// # Errors
///
/// Returns every item that could not be covered, in request order.
pub fn plan_fifo(
    items: &[IssuingItem],
    lots: &[StockLot],
) -> Result<Vec<LotAllocation>, Vec<ItemFailure>> {
    let mut ordered: Vec<&StockLot> = lots.iter().filter(|l| l.main_stock_qty > 0).collect();
    ordered.sort_by_key(|l| (l.created_at, l.id));

    let mut remaining: HashMap<StockLotId, i32> =
        ordered.iter().map(|l| (l.id, l.main_stock_qty)).collect();
    let mut allocations = Vec::new();
    let mut failures = Vec::new();

    for item in items {
        let sku = item.sku.trim();
        let style_number = item.style_number.trim();
        let candidates: Vec<&StockLot> = ordered
            .iter()
            .copied()
            .filter(|l| l.sku == sku && l.style_number == style_number)
            .filter(|l| remaining.get(&l.id).copied().unwrap_or(0) > 0)
            .collect();

        let available: i64 = candidates
            .iter()
            .map(|l| i64::from(remaining.get(&l.id).copied().unwrap_or(0)))
            .sum();

        if candidates.is_empty() {
            failures.push(ItemFailure {
                order_item_id: item.order_item_id,
                sku: sku.to_string(),
                error: "no available stock".to_string(),
            });
            continue;
        }
        if available < i64::from(item.issuing_qty) {
            failures.push(ItemFailure {
                order_item_id: item.order_item_id,
                sku: sku.to_string(),
                error: format!(
                    "insufficient stock: required {}, available {available}",
                    item.issuing_qty
                ),
            });
            continue;
        }

        let mut needed = item.issuing_qty;
        for lot in candidates {
            if needed == 0 {
                break;
            }
            let Some(left) = remaining.get_mut(&lot.id) else {
                continue;
            };
            let take = needed.min(*left);
            *left -= take;
            needed -= take;
            allocations.push(LotAllocation {
                order_item_id: item.order_item_id,
                main_stock_id: lot.id,
                style_number: lot.style_number.clone(),
                sku: lot.sku.clone(),
                batch_number: lot.batch_number.clone(),
                lot_no: lot.lot_no.clone(),
                unit_price: lot.unit_price,
                issuing_qty: take,
            });
        }
    }

    if failures.is_empty() {
        Ok(allocations)
    } else {
        Err(failures)
    }
}

/// Issues stock for order items inside one transaction.
pub struct StockAllocator<'a> {
    pool: &'a PgPool,
}

impl<'a> StockAllocator<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Issue every item of the batch or none of them.
    ///
    /// On success each allocation has a ledger row, every issued order item's
    /// booking is `Issued` and the order is `In Transit`.
    ///
    /// # Errors
    ///
    /// See [`IssueError`]. On any error the transaction is rolled back.
    #[tracing::instrument(skip(self, items), fields(company_code = %company_code, order_id = %order_id, items = items.len()))]
    pub async fn issue(
        &self,
        company_code: &CompanyCode,
        order_id: OrderId,
        items: &[IssuingItem],
    ) -> Result<IssueReceipt, IssueError> {
        validate_items(items)?;

        let mut tx = self.pool.begin().await?;

        let status = orders::lock_order_status(&mut *tx, company_code, order_id)
            .await?
            .ok_or(IssueError::OrderNotFound(order_id))?;
        if !status.can_transition_to(OrderStatus::InTransit) {
            return Err(IssueError::InvalidStatus(status));
        }

        let ordered = orders::issuable_items(&mut *tx, company_code, order_id).await?;
        check_against_order(items, &ordered)?;

        let pairs: BTreeSet<(String, String)> = items
            .iter()
            .map(|i| (i.style_number.trim().to_string(), i.sku.trim().to_string()))
            .collect();
        let (style_numbers, skus): (Vec<String>, Vec<String>) = pairs.into_iter().unzip();
        let lots = stock::lock_available_lots(&mut *tx, company_code, &style_numbers, &skus).await?;

        let plan = plan_fifo(items, &lots).map_err(|failures| {
            tracing::warn!(failures = failures.len(), "Issuing rejected, stock unavailable");
            IssueError::Unavailable(failures)
        })?;

        let mut issued = Vec::with_capacity(plan.len());
        for allocation in plan {
            let stock_issuing_id =
                stock::insert_issuing(&mut *tx, company_code, order_id, &allocation).await?;
            issued.push(IssuedAllocation {
                stock_issuing_id,
                allocation,
            });
        }

        let issued_items: BTreeSet<OrderItemId> = items.iter().map(|i| i.order_item_id).collect();
        for order_item_id in &issued_items {
            stock::mark_booking_issued(&mut *tx, company_code, *order_item_id).await?;
        }

        orders::set_order_status(&mut *tx, company_code, order_id, OrderStatus::InTransit).await?;
        tx.commit().await?;

        tracing::info!(
            issued_count = issued_items.len(),
            ledger_rows = issued.len(),
            "Order items issued"
        );

        Ok(IssueReceipt {
            order_id,
            issued_count: issued_items.len(),
            allocations: issued,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn lot(id: i32, sku: &str, qty: i32, day: u32) -> StockLot {
        StockLot {
            id: StockLotId::new(id),
            company_code: CompanyCode::parse("CMP0001").unwrap(),
            style_number: "ST100".to_string(),
            sku: sku.to_string(),
            batch_number: format!("B{id}"),
            lot_no: format!("L{id}"),
            unit_price: Decimal::new(1000, 2),
            main_stock_qty: qty,
            created_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap(),
        }
    }

    fn item(order_item_id: i32, sku: &str, qty: i32) -> IssuingItem {
        IssuingItem {
            order_item_id: OrderItemId::new(order_item_id),
            style_number: "ST100".to_string(),
            sku: sku.to_string(),
            issuing_qty: qty,
        }
    }

    fn drawn(plan: &[LotAllocation]) -> Vec<(i32, i32)> {
        plan.iter()
            .map(|a| (a.main_stock_id.as_i32(), a.issuing_qty))
            .collect()
    }

    #[test]
    fn test_oldest_lot_is_used_first_regardless_of_input_order() {
        let lots = vec![lot(2, "S1", 10, 5), lot(1, "S1", 10, 1), lot(3, "S1", 10, 3)];
        let plan = plan_fifo(&[item(1, "S1", 4)], &lots).unwrap();
        assert_eq!(drawn(&plan), vec![(1, 4)]);
        assert_eq!(plan[0].lot_no, "L1");
    }

    #[test]
    fn test_same_day_lots_break_ties_on_id() {
        let lots = vec![lot(9, "S1", 5, 1), lot(4, "S1", 5, 1)];
        let plan = plan_fifo(&[item(1, "S1", 5)], &lots).unwrap();
        assert_eq!(drawn(&plan), vec![(4, 5)]);
    }

    #[test]
    fn test_request_larger_than_oldest_lot_splits_across_lots() {
        // Two lots of 10, fifteen requested: ten from the oldest, five from the next.
        let lots = vec![lot(1, "S1", 10, 1), lot(2, "S1", 10, 2)];
        let plan = plan_fifo(&[item(1, "S1", 15)], &lots).unwrap();
        assert_eq!(drawn(&plan), vec![(1, 10), (2, 5)]);
        let total: i32 = plan.iter().map(|a| a.issuing_qty).sum();
        assert_eq!(total, 15);
    }

    #[test]
    fn test_no_lots_reports_no_available_stock() {
        let failures = plan_fifo(&[item(7, "S1", 5)], &[]).unwrap_err();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].order_item_id, OrderItemId::new(7));
        assert_eq!(failures[0].error, "no available stock");
    }

    #[test]
    fn test_empty_lots_count_as_no_stock() {
        let failures = plan_fifo(&[item(7, "S1", 1)], &[lot(1, "S1", 0, 1)]).unwrap_err();
        assert_eq!(failures[0].error, "no available stock");
    }

    #[test]
    fn test_shortfall_reports_required_and_available() {
        let lots = vec![lot(1, "S1", 3, 1), lot(2, "S1", 4, 2)];
        let failures = plan_fifo(&[item(1, "S1", 10)], &lots).unwrap_err();
        assert_eq!(failures[0].error, "insufficient stock: required 10, available 7");
    }

    #[test]
    fn test_every_failing_item_is_reported() {
        let lots = vec![lot(1, "S1", 10, 1)];
        let failures = plan_fifo(
            &[item(1, "S1", 5), item(2, "S2", 1), item(3, "S1", 50)],
            &lots,
        )
        .unwrap_err();
        let ids: Vec<i32> = failures.iter().map(|f| f.order_item_id.as_i32()).collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_items_sharing_a_sku_draw_down_the_same_lots() {
        let lots = vec![lot(1, "S1", 6, 1), lot(2, "S1", 6, 2)];
        let plan = plan_fifo(&[item(1, "S1", 4), item(2, "S1", 5)], &lots).unwrap();
        assert_eq!(drawn(&plan), vec![(1, 4), (1, 2), (2, 3)]);

        let err = plan_fifo(&[item(1, "S1", 10), item(2, "S1", 5)], &lots).unwrap_err();
        assert_eq!(err[0].order_item_id, OrderItemId::new(2));
        assert_eq!(err[0].error, "insufficient stock: required 5, available 2");
    }

    #[test]
    fn test_lots_of_other_skus_are_ignored() {
        let lots = vec![lot(1, "S2", 100, 1), lot(2, "S1", 5, 2)];
        let plan = plan_fifo(&[item(1, "S1", 5)], &lots).unwrap();
        assert_eq!(drawn(&plan), vec![(2, 5)]);
    }

    #[test]
    fn test_validate_items_rejects_empty_and_non_positive() {
        assert!(matches!(validate_items(&[]), Err(IssueError::Invalid(_))));
        assert!(matches!(
            validate_items(&[item(1, "S1", 0)]),
            Err(IssueError::Invalid(_))
        ));
        assert!(validate_items(&[item(1, "S1", 1)]).is_ok());
    }

    fn ordered(id: i32, sku: &str, quantity: i32, issued_qty: i64) -> IssuableItem {
        IssuableItem {
            id: OrderItemId::new(id),
            sku: sku.to_string(),
            style_number: "ST100".to_string(),
            quantity,
            issued_qty,
        }
    }

    #[test]
    fn test_batch_within_ordered_quantity_is_accepted() {
        let order = [ordered(1, "S1", 5, 0), ordered(2, "S2", 3, 1)];
        assert!(check_against_order(&[item(1, "S1", 5), item(2, "S2", 2)], &order).is_ok());
    }

    #[test]
    fn test_unknown_items_are_listed() {
        let order = [ordered(1, "S1", 5, 0)];
        let err = check_against_order(&[item(9, "S1", 1), item(3, "S1", 1)], &order).unwrap_err();
        assert!(matches!(
            err,
            IssueError::ForeignOrderItems(ref ids) if ids == &[OrderItemId::new(3), OrderItemId::new(9)]
        ));
    }

    #[test]
    fn test_sku_other_than_the_ordered_one_is_rejected() {
        let order = [ordered(1, "ST100-NVY-M", 2, 0)];
        let err = check_against_order(&[item(1, "OTHER-SKU", 1)], &order).unwrap_err();
        assert_eq!(
            err.to_string(),
            "order item 1 is ST100-NVY-M / ST100, not OTHER-SKU / ST100"
        );
    }

    #[test]
    fn test_issuing_more_than_ordered_is_rejected() {
        let order = [ordered(1, "S1", 2, 0)];
        let err = check_against_order(&[item(1, "S1", 40)], &order).unwrap_err();
        assert_eq!(
            err.to_string(),
            "issuing_qty 40 for order item 1 exceeds the 2 unit(s) left to issue"
        );

        // Repeated lines for one item are summed, and earlier issues count.
        assert!(check_against_order(&[item(1, "S1", 1), item(1, "S1", 2)], &order).is_err());
        let part_issued = [ordered(1, "S1", 2, 1)];
        assert!(check_against_order(&[item(1, "S1", 2)], &part_issued).is_err());
        assert!(check_against_order(&[item(1, "S1", 1)], &part_issued).is_ok());
    }

    #[test]
    fn test_foreign_items_message_lists_ids() {
        let err = IssueError::ForeignOrderItems(vec![OrderItemId::new(3), OrderItemId::new(9)]);
        assert_eq!(err.to_string(), "order items do not belong to the order: 3, 9");
    }
}
