//! HTTP tests against a running back office server.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`bo-cli migrate`)
//! - The server running (`cargo run -p backoffice-admin`)
//! - For the customer flow, a customer created with
//!   `bo-cli customer create` and its credentials in
//!   `BACKOFFICE_TEST_COMPANY`, `BACKOFFICE_TEST_EMAIL` and `BACKOFFICE_TEST_PASSWORD`
//!
//! Run with: `cargo test -p backoffice-integration-tests --test api -- --ignored`

#![allow(clippy::unwrap_used)]

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

/// Base URL of the server (configurable via environment).
fn base_url() -> String {
    std::env::var("BACKOFFICE_TEST_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Log in the customer named by the environment, or `None` when unset.
async fn customer_client() -> Option<(Client, String)> {
    let company = std::env::var("BACKOFFICE_TEST_COMPANY").ok()?;
    let email = std::env::var("BACKOFFICE_TEST_EMAIL").ok()?;
    let password = std::env::var("BACKOFFICE_TEST_PASSWORD").ok()?;

    let client = client();
    let resp = client
        .post(format!("{}/api/login", base_url()))
        .json(&json!({"company_code": company, "email": email, "password": password}))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), StatusCode::OK);
    Some((client, company))
}

#[tokio::test]
#[ignore = "Requires running back office server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health/ready", base_url()))
        .send()
        .await
        .expect("Failed to reach server");

    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running back office server"]
async fn test_checkout_without_session_is_unauthorized() {
    let resp = client()
        .post(format!("{}/submit-checkout?company_code=CMP0001", base_url()))
        .json(&json!({}))
        .send()
        .await
        .expect("Failed to submit checkout");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = resp.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running back office server"]
async fn test_wrong_login_is_unauthorized() {
    let resp = client()
        .post(format!("{}/api/admin/login", base_url()))
        .json(&json!({"email": "nobody@example.com", "password": "not-the-password"}))
        .send()
        .await
        .expect("Failed to log in");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running back office server and BACKOFFICE_TEST_* credentials"]
async fn test_checkout_with_wrong_tenant_is_forbidden() {
    let Some((client, company)) = customer_client().await else {
        return;
    };
    let other = if company == "CMP0001" { "CMP0002" } else { "CMP0001" };

    let resp = client
        .post(format!("{}/submit-checkout?company_code={other}", base_url()))
        .json(&json!({
            "address": {
                "full_name": "Jo Smith", "line1": "1 Harbour St", "city": "Wellington",
                "postal_code": "6011", "country": "NZ"
            },
            "payment_method": {"method_type": "card"},
            "order_items": [{
                "variant_id": 1, "sku": "ST100-NVY-M", "style_number": "ST100",
                "quantity": 1, "unit_price": "10.00"
            }],
            "total_amount": "10.00"
        }))
        .send()
        .await
        .expect("Failed to submit checkout");

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running back office server and BACKOFFICE_TEST_* credentials"]
async fn test_customer_orders_and_invoice_download() {
    let Some((client, _)) = customer_client().await else {
        return;
    };

    let resp = client
        .get(format!("{}/api/orders", base_url()))
        .send()
        .await
        .expect("Failed to list orders");
    assert_eq!(resp.status(), StatusCode::OK);
    let orders: Vec<Value> = resp.json().await.unwrap();

    let Some(order_id) = orders.first().and_then(|o| o["id"].as_i64()) else {
        return;
    };
    let resp = client
        .get(format!("{}/api/orders/{order_id}/invoice", base_url()))
        .send()
        .await
        .expect("Failed to download invoice");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    let bytes = resp.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}
