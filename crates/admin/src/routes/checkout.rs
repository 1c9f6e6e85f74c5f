//! Checkout route handler.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use super::json_body;
use crate::error::AppError;
use crate::middleware::RequireCustomerAuth;
use crate::models::{CheckoutReceipt, CheckoutRequest};
use crate::services::CheckoutService;
use crate::services::checkout::resolve_tenant;
use crate::state::AppState;

/// `?company_code=` on tenant-scoped customer routes.
#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub company_code: Option<String>,
}

/// Place an order.
///
/// Writes the order aggregate in one transaction, then tries to send the
/// invoice email in the background. The response never waits on SMTP.
#[instrument(skip(state, customer, body), fields(customer_id = %customer.id))]
pub async fn submit_checkout(
    State(state): State<AppState>,
    RequireCustomerAuth(customer): RequireCustomerAuth,
    Query(query): Query<TenantQuery>,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), AppError> {
    let company_code = resolve_tenant(&customer, query.company_code.as_deref())?;
    let request = json_body(body)?;

    let placed = CheckoutService::new(state.pool())
        .submit(&customer, &company_code, &request, Utc::now())
        .await?;

    let email_status = if state.outbox().is_enabled() {
        let outbox = state.outbox().clone();
        let outbox_id = placed.outbox_id;
        tokio::spawn(async move {
            if let Err(e) = outbox.deliver_now(outbox_id).await {
                tracing::warn!(outbox_id = %outbox_id, error = %e, "Immediate invoice email attempt failed");
            }
        });
        "queued"
    } else {
        "disabled"
    };

    Ok((StatusCode::CREATED, Json(placed.receipt(email_status))))
}
