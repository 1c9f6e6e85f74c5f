//! FIFO issuing against a real database.
//!
//! Run with: `DATABASE_URL=... cargo test -p backoffice-integration-tests --test issuing -- --ignored`

#![allow(clippy::unwrap_used)]

use backoffice_admin::db::{OrderRepository, StockRepository};
use backoffice_admin::models::IssuingItem;
use backoffice_admin::services::{CheckoutService, IssueError, PlacedOrder, StockAllocator};
use backoffice_core::{BookingStatus, OrderStatus};
use backoffice_integration_tests::{Tenant, checkout_request, count, receive_lot, seed_tenant};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

async fn place(pool: &PgPool, tenant: &Tenant, quantity: i32) -> PlacedOrder {
    CheckoutService::new(pool)
        .submit(
            &tenant.customer,
            &tenant.company_code,
            &checkout_request(&tenant.variant, quantity, Decimal::new(1000, 2)),
            Utc::now(),
        )
        .await
        .unwrap()
}

fn issuing(tenant: &Tenant, placed: &PlacedOrder, qty: i32) -> Vec<IssuingItem> {
    vec![IssuingItem {
        order_item_id: placed.order_item_ids[0],
        style_number: tenant.variant.style_number.clone(),
        sku: tenant.variant.sku.clone(),
        issuing_qty: qty,
    }]
}

async fn order_status(pool: &PgPool, tenant: &Tenant, placed: &PlacedOrder) -> OrderStatus {
    OrderRepository::new(pool)
        .get(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap()
        .order_status
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_oldest_lot_is_drawn_first(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    // Newest received first, so insertion order disagrees with FIFO order.
    let newer = receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L2",
        10,
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
    )
    .await;
    let older = receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 4).await;

    let receipt = StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 4))
        .await
        .unwrap();

    assert_eq!(receipt.allocations.len(), 1);
    assert_eq!(receipt.allocations[0].allocation.main_stock_id, older.id);

    let lots = StockRepository::new(&pool)
        .available_lots(&tenant.company_code, &tenant.variant.sku)
        .await
        .unwrap();
    let remaining: Vec<_> = lots.iter().map(|l| (l.id, l.main_stock_qty)).collect();
    assert_eq!(remaining, vec![(older.id, 6), (newer.id, 10)]);
}

/// Scenario A followed by issuing: the order moves to In Transit and the
/// booking to Issued.
#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_issuing_updates_booking_and_order_status(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 2).await;
    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::Pending);

    StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 2))
        .await
        .unwrap();

    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::InTransit);
    let detail = OrderRepository::new(&pool)
        .get_detail(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.items[0].booking_status, Some(BookingStatus::Issued));
    assert_eq!(detail.items[0].issued_qty, 2);
}

/// Fifteen units against two lots of ten: the request spans both lots,
/// ten from the oldest and five from the next.
#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_request_spanning_lots_writes_one_ledger_row_per_lot(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let first = receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let second = receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L2",
        10,
        Utc.with_ymd_and_hms(2024, 3, 2, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 15).await;

    let receipt = StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 15))
        .await
        .unwrap();

    let drawn: Vec<_> = receipt
        .allocations
        .iter()
        .map(|a| (a.allocation.main_stock_id, a.allocation.issuing_qty))
        .collect();
    assert_eq!(drawn, vec![(first.id, 10), (second.id, 5)]);
    assert_eq!(count(&pool, "stock_issuing").await, 2);

    let lots = StockRepository::new(&pool)
        .available_lots(&tenant.company_code, &tenant.variant.sku)
        .await
        .unwrap();
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].main_stock_qty, 5);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_insufficient_stock_writes_nothing(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        3,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 5).await;

    let err = StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 5))
        .await
        .unwrap_err();

    let IssueError::Unavailable(failures) = err else {
        panic!("expected Unavailable, got {err:?}");
    };
    assert_eq!(failures.len(), 1);
    assert!(failures[0].error.contains("insufficient stock"));
    assert_eq!(count(&pool, "stock_issuing").await, 0);
    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::Pending);

    let lots = StockRepository::new(&pool)
        .available_lots(&tenant.company_code, &tenant.variant.sku)
        .await
        .unwrap();
    assert_eq!(lots[0].main_stock_qty, 3);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_no_stock_reports_no_available_stock(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let placed = place(&pool, &tenant, 5).await;

    let err = StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 5))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, IssueError::Unavailable(f) if f[0].error.contains("no available stock")),
        "{err:?}"
    );
    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::Pending);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_other_tenants_stock_is_invisible(pool: PgPool) {
    let acme = seed_tenant(&pool, "Acme Apparel").await;
    let other = seed_tenant(&pool, "Other Outfitters").await;
    // Same style number and SKU, different tenant.
    receive_lot(
        &pool,
        &other.company_code,
        &other.variant,
        "L1",
        50,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &acme, 1).await;

    let err = StockAllocator::new(&pool)
        .issue(&acme.company_code, placed.order_id, &issuing(&acme, &placed, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Unavailable(_)));

    let err = StockAllocator::new(&pool)
        .issue(&other.company_code, placed.order_id, &issuing(&acme, &placed, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::OrderNotFound(_)));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_items_not_matching_the_order_are_rejected(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        50,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 2).await;
    let allocator = StockAllocator::new(&pool);

    let mut wrong_sku = issuing(&tenant, &placed, 1);
    wrong_sku[0].sku = "OTHER-SKU".to_string();
    let err = allocator
        .issue(&tenant.company_code, placed.order_id, &wrong_sku)
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Invalid(_)), "{err:?}");

    let err = allocator
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 40))
        .await
        .unwrap_err();
    assert!(matches!(err, IssueError::Invalid(_)), "{err:?}");

    assert_eq!(count(&pool, "stock_issuing").await, 0);
    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::Pending);
    let lots = StockRepository::new(&pool)
        .available_lots(&tenant.company_code, &tenant.variant.sku)
        .await
        .unwrap();
    assert_eq!(lots[0].main_stock_qty, 50);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_missing_booking_row_is_created_as_issued(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        10,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let placed = place(&pool, &tenant, 3).await;
    sqlx::query("DELETE FROM backoffice.booking WHERE order_item_id = $1")
        .bind(placed.order_item_ids[0])
        .execute(&pool)
        .await
        .unwrap();

    StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &issuing(&tenant, &placed, 3))
        .await
        .unwrap();

    assert_eq!(count(&pool, "booking").await, 1);
    let detail = OrderRepository::new(&pool)
        .get_detail(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.items[0].booking_status, Some(BookingStatus::Issued));
}

/// Two items share a lot of four: the first (two units) fits, the second
/// (five units) does not, so neither is issued.
#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_one_uncoverable_item_blocks_the_whole_batch(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    receive_lot(
        &pool,
        &tenant.company_code,
        &tenant.variant,
        "L1",
        4,
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
    )
    .await;
    let mut request = checkout_request(&tenant.variant, 2, Decimal::new(1000, 2));
    let mut second = request.order_items[0].clone();
    second.quantity = 5;
    second.total_price = None;
    request.order_items.push(second);
    request.amounts.subtotal = Decimal::new(7000, 2);
    request.amounts.total_amount = Decimal::new(7000, 2);
    let placed = CheckoutService::new(&pool)
        .submit(&tenant.customer, &tenant.company_code, &request, Utc::now())
        .await
        .unwrap();

    let mut items = issuing(&tenant, &placed, 2);
    items.push(IssuingItem {
        order_item_id: placed.order_item_ids[1],
        issuing_qty: 5,
        ..items[0].clone()
    });
    let err = StockAllocator::new(&pool)
        .issue(&tenant.company_code, placed.order_id, &items)
        .await
        .unwrap_err();

    let IssueError::Unavailable(failures) = err else {
        panic!("expected Unavailable, got {err:?}");
    };
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].order_item_id, placed.order_item_ids[1]);
    assert_eq!(count(&pool, "stock_issuing").await, 0);
    assert_eq!(order_status(&pool, &tenant, &placed).await, OrderStatus::Pending);

    let detail = OrderRepository::new(&pool)
        .get_detail(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert!(
        detail
            .items
            .iter()
            .all(|i| i.booking_status == Some(BookingStatus::NotBooked))
    );
    let lots = StockRepository::new(&pool)
        .available_lots(&tenant.company_code, &tenant.variant.sku)
        .await
        .unwrap();
    assert_eq!(lots[0].main_stock_qty, 4);
}
