//! Invoice numbering against a real database.
//!
//! Run with: `DATABASE_URL=... cargo test -p backoffice-integration-tests --test invoices -- --ignored`

#![allow(clippy::unwrap_used)]

use backoffice_admin::services::CheckoutService;
use backoffice_admin::services::invoices::resolve_invoice_number;
use backoffice_core::OrderId;
use backoffice_integration_tests::{checkout_request, seed_tenant};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_lookup_returns_persisted_number_every_time(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;
    let placed = CheckoutService::new(&pool)
        .submit(
            &tenant.customer,
            &tenant.company_code,
            &checkout_request(&tenant.variant, 1, Decimal::new(1000, 2)),
            Utc::now(),
        )
        .await
        .unwrap();

    let later = Utc::now() + Duration::hours(3);
    let first = resolve_invoice_number(&pool, &tenant.company_code, placed.order_id, later).await;
    let second = resolve_invoice_number(
        &pool,
        &tenant.company_code,
        placed.order_id,
        later + Duration::days(1),
    )
    .await;

    assert_eq!(first, placed.invoice_number);
    assert_eq!(second, placed.invoice_number);
}

#[sqlx::test(migrations = "../admin/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn test_lookup_without_invoice_mints_a_number(pool: PgPool) {
    let tenant = seed_tenant(&pool, "Acme Apparel").await;

    let number =
        resolve_invoice_number(&pool, &tenant.company_code, OrderId::new(4242), Utc::now()).await;

    assert!(number.starts_with("INV-"));
    assert!(number.ends_with("-4242"));
}
