//! Stock lot route handlers.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use super::json_body;
use crate::db::StockRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, RequireAdminWriter};
use crate::models::{ReceiveLotInput, StockLot};
use crate::state::AppState;

/// Receive a lot into main stock.
#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn receive(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    body: Result<Json<ReceiveLotInput>, JsonRejection>,
) -> Result<(StatusCode, Json<StockLot>), AppError> {
    let input = json_body(body)?;
    input.validate().map_err(AppError::BadRequest)?;

    let lot = StockRepository::new(state.pool())
        .receive_lot(&admin.company_code, &input)
        .await?;

    tracing::info!(
        lot_id = %lot.id,
        sku = %lot.sku,
        quantity = lot.main_stock_qty,
        "Stock lot received"
    );
    Ok((StatusCode::CREATED, Json(lot)))
}

/// Lots with stock left for a SKU, in the order they will be issued.
#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn available(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(sku): Path<String>,
) -> Result<Json<Vec<StockLot>>, AppError> {
    let lots = StockRepository::new(state.pool())
        .available_lots(&admin.company_code, sku.trim())
        .await?;
    Ok(Json(lots))
}
