//! Login, logout and registration handlers.

use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use backoffice_core::CompanyCode;

use super::checkout::TenantQuery;
use super::json_body;
use crate::error::{AppError, clear_sentry_user};
use crate::middleware::{
    clear_current_admin, clear_current_customer, set_current_admin, set_current_customer,
};
use crate::models::{CurrentAdmin, CurrentCustomer, Customer, RegisterCustomerInput};
use crate::services::AuthService;
use crate::state::AppState;

/// Body of `POST /api/admin/login`.
#[derive(Deserialize)]
pub struct AdminLoginInput {
    pub email: String,
    pub password: String,
}

/// Body of `POST /api/login`.
#[derive(Deserialize)]
pub struct CustomerLoginInput {
    pub company_code: String,
    pub email: String,
    pub password: String,
}

fn parse_company_code(raw: Option<&str>) -> Result<CompanyCode, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("company_code is required".to_string()))?;
    CompanyCode::parse(raw).map_err(|e| AppError::BadRequest(format!("invalid company_code: {e}")))
}

// =============================================================================
// Customers
// =============================================================================

/// Register a customer with the tenant in the query string.
#[instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    Query(query): Query<TenantQuery>,
    body: Result<Json<RegisterCustomerInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let company_code = parse_company_code(query.company_code.as_deref())?;
    let input = json_body(body)?;

    let customer = AuthService::new(state.pool())
        .register_customer(&company_code, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

#[instrument(skip(state, session, body))]
pub async fn customer_login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<CustomerLoginInput>, JsonRejection>,
) -> Result<Json<CurrentCustomer>, AppError> {
    let input = json_body(body)?;
    let company_code = parse_company_code(Some(&input.company_code))?;

    let customer = AuthService::new(state.pool())
        .login_customer(&company_code, &input.email, &input.password)
        .await?;
    set_current_customer(&session, &customer).await?;
    Ok(Json(customer))
}

#[instrument(skip(session))]
pub async fn customer_logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_customer(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Admins
// =============================================================================

#[instrument(skip(state, session, body))]
pub async fn admin_login(
    State(state): State<AppState>,
    session: Session,
    body: Result<Json<AdminLoginInput>, JsonRejection>,
) -> Result<Json<CurrentAdmin>, AppError> {
    let input = json_body(body)?;

    let admin = AuthService::new(state.pool())
        .login_admin(&input.email, &input.password)
        .await?;
    set_current_admin(&session, &admin).await?;
    Ok(Json(admin))
}

#[instrument(skip(session))]
pub async fn admin_logout(session: Session) -> Result<StatusCode, AppError> {
    clear_current_admin(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}
