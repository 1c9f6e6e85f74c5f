//! Integration tests for the back office.
//!
//! # Running Tests
//!
//! ```bash
//! # Database tests: sqlx creates a throwaway database per test
//! DATABASE_URL=postgres://localhost/postgres cargo test -p backoffice-integration-tests -- --ignored
//!
//! # API tests additionally need a running server
//! cargo run -p backoffice-admin &
//! BACKOFFICE_TEST_URL=http://localhost:3001 cargo test -p backoffice-integration-tests --test api -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `checkout` - Checkout atomicity and the order aggregate
//! - `issuing` - FIFO allocation and the issuing ledger
//! - `invoices` - Invoice numbering
//! - `api` - HTTP flow against a running server
//!
//! This library holds the fixtures those tests share.

use backoffice_admin::db::companies::NewCompany;
use backoffice_admin::db::{CatalogRepository, CompanyRepository, StockRepository};
use backoffice_admin::models::{
    AddressInput, AttributeInput, AttributeKind, CheckoutLine, CheckoutRequest, CreateStyleInput,
    CurrentCustomer, PaymentMethodInput, ReceiveLotInput, RegisterCustomerInput, StockLot, Variant,
};
use backoffice_admin::services::AuthService;
use backoffice_core::{CompanyCode, OrderAmounts, Sku};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Password used by every fixture principal.
pub const PASSWORD: &str = "fixture-password-1";

/// A tenant with one customer and one sellable variant.
pub struct Tenant {
    pub company_code: CompanyCode,
    pub customer: CurrentCustomer,
    pub variant: Variant,
}

/// Create a tenant, a customer and the `ST100-NVY-M` variant.
///
/// # Panics
///
/// Panics if any fixture insert fails.
pub async fn seed_tenant(pool: &PgPool, name: &str) -> Tenant {
    let company = CompanyRepository::new(pool)
        .create(&NewCompany {
            name,
            email: Some("orders@tenant.test"),
            ..NewCompany::default()
        })
        .await
        .expect("create company");
    let company_code = company.company_code;

    let customer = AuthService::new(pool)
        .register_customer(
            &company_code,
            &RegisterCustomerInput {
                email: "jo@example.com".to_string(),
                password: PASSWORD.to_string(),
                first_name: "Jo".to_string(),
                last_name: "Smith".to_string(),
                phone: None,
            },
        )
        .await
        .expect("register customer");

    let catalog = CatalogRepository::new(pool);
    let color = catalog
        .create_attribute(
            &company_code,
            AttributeKind::Color,
            &AttributeInput {
                code: "NVY".to_string(),
                name: "Navy".to_string(),
            },
        )
        .await
        .expect("create color");
    let size = catalog
        .create_attribute(
            &company_code,
            AttributeKind::Size,
            &AttributeInput {
                code: "M".to_string(),
                name: "Medium".to_string(),
            },
        )
        .await
        .expect("create size");
    let style = catalog
        .create_style(
            &company_code,
            &CreateStyleInput {
                style_number: "ST100".to_string(),
                name: "Crew Tee".to_string(),
                description: None,
                material_id: None,
                base_price: Decimal::new(1000, 2),
            },
        )
        .await
        .expect("create style");
    let sku = Sku::for_variant(&style.style_number, &color.code, &size.code, None)
        .expect("build sku");
    let variant = catalog
        .insert_variant(&style, &sku, color.id, size.id, None, style.base_price)
        .await
        .expect("insert variant");

    Tenant {
        company_code,
        customer: CurrentCustomer {
            id: customer.id,
            company_code: customer.company_code,
            email: customer.email,
        },
        variant,
    }
}

/// A checkout of `quantity` units of `variant` at `unit_price`, shipped to a
/// new address.
#[must_use]
pub fn checkout_request(variant: &Variant, quantity: i32, unit_price: Decimal) -> CheckoutRequest {
    let total = unit_price * Decimal::from(quantity);
    CheckoutRequest {
        address_id: None,
        address: Some(AddressInput {
            full_name: "Jo Smith".to_string(),
            line1: "1 Harbour St".to_string(),
            line2: None,
            city: "Wellington".to_string(),
            state: None,
            postal_code: "6011".to_string(),
            country: "NZ".to_string(),
            phone: None,
        }),
        payment_method: PaymentMethodInput {
            method_type: "card".to_string(),
            card_holder: Some("Jo Smith".to_string()),
            card_last4: Some("4242".to_string()),
            provider_reference: None,
        },
        order_items: vec![CheckoutLine {
            variant_id: variant.id,
            sku: variant.sku.clone(),
            style_number: variant.style_number.clone(),
            quantity,
            unit_price,
            total_price: Some(total),
        }],
        amounts: OrderAmounts {
            subtotal: total,
            total_amount: total,
            ..OrderAmounts::default()
        },
        order_notes: None,
    }
}

/// Receive a lot of `variant` and backdate it to `received_at`.
///
/// # Panics
///
/// Panics if the insert or the backdating update fails.
pub async fn receive_lot(
    pool: &PgPool,
    company_code: &CompanyCode,
    variant: &Variant,
    lot_no: &str,
    quantity: i32,
    received_at: DateTime<Utc>,
) -> StockLot {
    let mut lot = StockRepository::new(pool)
        .receive_lot(
            company_code,
            &ReceiveLotInput {
                style_number: variant.style_number.clone(),
                sku: variant.sku.clone(),
                batch_number: format!("B-{lot_no}"),
                lot_no: lot_no.to_string(),
                unit_price: Decimal::new(450, 2),
                quantity,
            },
        )
        .await
        .expect("receive lot");

    sqlx::query("UPDATE backoffice.main_stock SET created_at = $1 WHERE id = $2")
        .bind(received_at)
        .bind(lot.id)
        .execute(pool)
        .await
        .expect("backdate lot");
    lot.created_at = received_at;
    lot
}

/// Count rows of a `backoffice` table.
///
/// # Panics
///
/// Panics if the query fails.
pub async fn count(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM backoffice.{table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}
