//! Stock issuing route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use tracing::instrument;

use backoffice_core::OrderId;

use super::json_body;
use crate::error::AppError;
use crate::middleware::RequireAdminWriter;
use crate::models::{IssueReceipt, IssueRequest};
use crate::services::StockAllocator;
use crate::state::AppState;

/// Issue stock for order items, with the order in the body.
#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn issue(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<IssueReceipt>, AppError> {
    let request = json_body(body)?;
    let order_id = request
        .order_id
        .ok_or_else(|| AppError::BadRequest("order_id is required".to_string()))?;

    let receipt = StockAllocator::new(state.pool())
        .issue(&admin.company_code, order_id, &request.issuing_items)
        .await?;
    Ok(Json(receipt))
}

/// Issue stock for order items of the order in the path.
#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn issue_for_order(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path(order_id): Path<OrderId>,
    body: Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<IssueReceipt>, AppError> {
    let request = json_body(body)?;
    if request.order_id.is_some_and(|id| id != order_id) {
        return Err(AppError::BadRequest(
            "order_id in the body does not match the path".to_string(),
        ));
    }

    let receipt = StockAllocator::new(state.pool())
        .issue(&admin.company_code, order_id, &request.issuing_items)
        .await?;
    Ok(Json(receipt))
}
