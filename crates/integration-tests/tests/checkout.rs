//! Checkout against a real database.
//!
//! Run with: `DATABASE_URL=... cargo test -p backoffice-integration-tests --test checkout -- --ignored`

#![allow(clippy::unwrap_used)]

use backoffice_admin::db::{OrderRepository, RepositoryError};
use backoffice_admin::services::{CheckoutError, CheckoutService, CheckoutStage};
use backoffice_core::{BookingStatus, OrderId, OrderStatus, PaymentStatus, VariantId, numbering};
use backoffice_integration_tests::{checkout_request, count, seed_tenant};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_checkout_writes_one_of_each_row(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let request = checkout_request(&tenant.variant, 2, Decimal::new(1000, 2));

    let placed = CheckoutService::new(&pool)
        .submit(&tenant.customer, &tenant.company_code, &request, Utc::now())
        .await
        .unwrap();

    assert!(numbering::is_order_number_for(
        &placed.order_number,
        tenant.customer.id
    ));
    assert_eq!(placed.total_amount, Decimal::new(2000, 2));
    assert_eq!(placed.order_item_ids.len(), 1);

    for table in ["orders", "order_items", "booking", "payments", "invoices", "invoice_email_outbox"] {
        assert_eq!(count(&pool, table).await, 1, "{table}");
    }

    let detail = OrderRepository::new(&pool)
        .get_detail(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.order.order_status, OrderStatus::Pending);
    assert_eq!(detail.items[0].booking_status, Some(BookingStatus::NotBooked));
    assert_eq!(detail.invoice_number.as_deref(), Some(placed.invoice_number.as_str()));
    assert_eq!(detail.payment_status, Some(PaymentStatus::Pending));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_total_items_is_sum_of_quantities(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let mut request = checkout_request(&tenant.variant, 3, Decimal::new(500, 2));
    let mut second = request.order_items[0].clone();
    second.quantity = 4;
    second.total_price = None;
    request.order_items.push(second);
    request.amounts.subtotal = Decimal::new(3500, 2);
    request.amounts.total_amount = Decimal::new(3500, 2);

    let placed = CheckoutService::new(&pool)
        .submit(&tenant.customer, &tenant.company_code, &request, Utc::now())
        .await
        .unwrap();

    assert_eq!(placed.total_items, 7);
    assert_eq!(count(&pool, "booking").await, 2);

    let detail = OrderRepository::new(&pool)
        .get_detail(&tenant.company_code, placed.order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(detail.order.total_items, 7);
    // Items come back in request order.
    let ids: Vec<_> = detail.items.iter().map(|i| i.id).collect();
    assert_eq!(ids, placed.order_item_ids);
    assert_eq!(detail.items[1].total_price, Decimal::new(2000, 2));
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_failed_invoice_step_rolls_back_earlier_steps(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let service = CheckoutService::new(&pool);
    let first = service
        .submit(
            &tenant.customer,
            &tenant.company_code,
            &checkout_request(&tenant.variant, 1, Decimal::new(1000, 2)),
            Utc::now(),
        )
        .await
        .unwrap();

    // Take the invoice number the next order will be given.
    let now = Utc::now() + Duration::seconds(5);
    let next_order = OrderId::new(first.order_id.as_i32() + 1);
    sqlx::query("UPDATE backoffice.invoices SET invoice_number = $1 WHERE id = $2")
        .bind(numbering::invoice_number(next_order, now))
        .bind(first.invoice_id)
        .execute(&pool)
        .await
        .unwrap();

    let err = service
        .submit(
            &tenant.customer,
            &tenant.company_code,
            &checkout_request(&tenant.variant, 2, Decimal::new(1000, 2)),
            now,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CheckoutError::Failed {
            source: RepositoryError::Conflict(_),
            ..
        }
    ));
    assert_eq!(err.stage(), Some(CheckoutStage::Invoice));
    for table in [
        "addresses",
        "payment_methods",
        "orders",
        "order_items",
        "booking",
        "payments",
        "invoices",
        "invoice_email_outbox",
    ] {
        assert_eq!(count(&pool, table).await, 1, "{table}");
    }
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_unknown_variant_leaves_no_rows(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let mut request = checkout_request(&tenant.variant, 1, Decimal::new(1000, 2));
    request.order_items[0].variant_id = VariantId::new(i32::MAX);

    let err = CheckoutService::new(&pool)
        .submit(&tenant.customer, &tenant.company_code, &request, Utc::now())
        .await
        .unwrap_err();

    assert!(matches!(err, CheckoutError::Invalid(_)));
    for table in ["addresses", "payment_methods", "orders", "order_items", "invoices"] {
        assert_eq!(count(&pool, table).await, 0, "{table}");
    }
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_other_tenants_variant_is_rejected(pool: PgPool) {
    let acme = seed_tenant(&pool, "Acme Apparel").await;
    let other = seed_tenant(&pool, "Other Outfitters").await;

    let mut request = checkout_request(&acme.variant, 1, Decimal::new(1000, 2));
    request.order_items[0].variant_id = other.variant.id;
    let err = CheckoutService::new(&pool)
        .submit(&acme.customer, &acme.company_code, &request, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Invalid(_)));

    let mut request = checkout_request(&acme.variant, 1, Decimal::new(1000, 2));
    request.order_items[0].sku = "TOTALLY-DIFFERENT".to_string();
    let err = CheckoutService::new(&pool)
        .submit(&acme.customer, &acme.company_code, &request, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Invalid(_)));

    assert_eq!(count(&pool, "orders").await, 0);
    assert_eq!(count(&pool, "order_items").await, 0);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_another_customers_address_is_rejected(pool: PgPool) {
    let acme = seed_tenant(&pool, "Acme Apparel").await;
    let first = CheckoutService::new(&pool)
        .submit(
            &acme.customer,
            &acme.company_code,
            &checkout_request(&acme.variant, 1, Decimal::new(1000, 2)),
            Utc::now(),
        )
        .await
        .unwrap();
    let detail = OrderRepository::new(&pool)
        .get_detail(&acme.company_code, first.order_id)
        .await
        .unwrap()
        .unwrap();

    let other = seed_tenant(&pool, "Other Outfitters").await;
    let mut request = checkout_request(&other.variant, 1, Decimal::new(1000, 2));
    request.address = None;
    request.address_id = Some(detail.order.address_id);

    let err = CheckoutService::new(&pool)
        .submit(&other.customer, &other.company_code, &request, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::AddressNotFound(_)));
    assert_eq!(count(&pool, "orders").await, 1);
}
