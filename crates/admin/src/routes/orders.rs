//! Order route handlers for admins and customers.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use backoffice_core::{OrderId, OrderStatus};

use super::json_body;
use crate::db::{OrderRepository, OutboxRepository};
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, RequireAdminWriter, RequireCustomerAuth};
use crate::models::{Order, OrderDetail, OrderListFilter, OutboxEntry};
use crate::services::InvoicePdf;
use crate::services::invoices::invoice_pdf;
use crate::state::AppState;

/// Body of `POST /api/admin/orders/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusInput {
    pub status: OrderStatus,
}

fn pdf_response(pdf: InvoicePdf) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", pdf.filename),
            ),
        ],
        pdf.bytes,
    )
        .into_response()
}

// =============================================================================
// Admin
// =============================================================================

/// List the tenant's orders, newest first.
#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn index(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Query(filter): Query<OrderListFilter>,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list(&admin.company_code, &filter)
        .await?;
    Ok(Json(orders))
}

/// An order with its items, booking statuses and invoice number.
#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn show(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetail>, AppError> {
    let detail = OrderRepository::new(state.pool())
        .get_detail(&admin.company_code, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    Ok(Json(detail))
}

/// Move an order to a new status.
#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path(id): Path<OrderId>,
    body: Result<Json<StatusInput>, JsonRejection>,
) -> Result<Json<Order>, AppError> {
    let input = json_body(body)?;
    let order = OrderRepository::new(state.pool())
        .update_status(&admin.company_code, id, input.status)
        .await?;

    tracing::info!(order_id = %id, status = %order.order_status, admin_id = %admin.id, "Order status changed");
    Ok(Json(order))
}

/// Download an order's invoice.
#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn invoice(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let pdf = invoice_pdf(state.pool(), &admin.company_code, id, Utc::now()).await?;
    Ok(pdf_response(pdf))
}

/// Invoice email delivery attempts for an order.
#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn emails(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<OrderId>,
) -> Result<Json<Vec<OutboxEntry>>, AppError> {
    OrderRepository::new(state.pool())
        .get(&admin.company_code, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;

    let entries = OutboxRepository::new(state.pool())
        .list_for_order(&admin.company_code, id)
        .await?;
    Ok(Json(entries))
}

// =============================================================================
// Customer
// =============================================================================

/// The signed-in customer's orders.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn customer_index(
    State(state): State<AppState>,
    RequireCustomerAuth(customer): RequireCustomerAuth,
) -> Result<Json<Vec<Order>>, AppError> {
    let orders = OrderRepository::new(state.pool())
        .list_for_customer(&customer.company_code, customer.id)
        .await?;
    Ok(Json(orders))
}

/// Download the invoice of one of the customer's own orders.
#[instrument(skip(state, customer), fields(customer_id = %customer.id))]
pub async fn customer_invoice(
    State(state): State<AppState>,
    RequireCustomerAuth(customer): RequireCustomerAuth,
    Path(id): Path<OrderId>,
) -> Result<Response, AppError> {
    let owned = OrderRepository::new(state.pool())
        .get(&customer.company_code, id)
        .await?
        .is_some_and(|order| order.customer_id == customer.id);
    if !owned {
        return Err(AppError::NotFound(format!("order {id}")));
    }

    let pdf = invoice_pdf(state.pool(), &customer.company_code, id, Utc::now()).await?;
    Ok(pdf_response(pdf))
}
