//! Catalog administration: attributes, styles and variants.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::instrument;

use backoffice_core::{AttributeId, CompanyCode, Sku, StyleId};

use super::json_body;
use crate::db::CatalogRepository;
use crate::error::AppError;
use crate::middleware::{RequireAdminAuth, RequireAdminWriter};
use crate::models::{
    Attribute, AttributeInput, AttributeKind, CreateStyleInput, CreateVariantInput, Style, Variant,
};
use crate::state::AppState;

fn attribute_kind(segment: &str) -> Result<AttributeKind, AppError> {
    AttributeKind::from_path(segment)
        .ok_or_else(|| AppError::NotFound(format!("attribute kind {segment}")))
}

async fn require_attribute(
    repo: &CatalogRepository<'_>,
    company_code: &CompanyCode,
    kind: AttributeKind,
    id: AttributeId,
) -> Result<Attribute, AppError> {
    repo.get_attribute(company_code, kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {id}", kind.label())))
}

// =============================================================================
// Attributes
// =============================================================================

#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn list_attributes(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(kind): Path<String>,
) -> Result<Json<Vec<Attribute>>, AppError> {
    let kind = attribute_kind(&kind)?;
    let attributes = CatalogRepository::new(state.pool())
        .list_attributes(&admin.company_code, kind)
        .await?;
    Ok(Json(attributes))
}

#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn create_attribute(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path(kind): Path<String>,
    body: Result<Json<AttributeInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Attribute>), AppError> {
    let kind = attribute_kind(&kind)?;
    let input = json_body(body)?
        .normalized()
        .map_err(AppError::BadRequest)?;

    let attribute = CatalogRepository::new(state.pool())
        .create_attribute(&admin.company_code, kind, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn update_attribute(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path((kind, id)): Path<(String, AttributeId)>,
    body: Result<Json<AttributeInput>, JsonRejection>,
) -> Result<Json<Attribute>, AppError> {
    let kind = attribute_kind(&kind)?;
    let input = json_body(body)?
        .normalized()
        .map_err(AppError::BadRequest)?;

    let attribute = CatalogRepository::new(state.pool())
        .update_attribute(&admin.company_code, kind, id, &input)
        .await?;
    Ok(Json(attribute))
}

#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn delete_attribute(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path((kind, id)): Path<(String, AttributeId)>,
) -> Result<StatusCode, AppError> {
    let kind = attribute_kind(&kind)?;
    CatalogRepository::new(state.pool())
        .delete_attribute(&admin.company_code, kind, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Styles
// =============================================================================

#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn list_styles(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
) -> Result<Json<Vec<Style>>, AppError> {
    let styles = CatalogRepository::new(state.pool())
        .list_styles(&admin.company_code)
        .await?;
    Ok(Json(styles))
}

#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn show_style(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(id): Path<StyleId>,
) -> Result<Json<Style>, AppError> {
    let style = CatalogRepository::new(state.pool())
        .get_style(&admin.company_code, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("style {id}")))?;
    Ok(Json(style))
}

#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn create_style(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    body: Result<Json<CreateStyleInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Style>), AppError> {
    let input = json_body(body)?;
    input.validate().map_err(AppError::BadRequest)?;

    let style = CatalogRepository::new(state.pool())
        .create_style(&admin.company_code, &input)
        .await?;
    Ok((StatusCode::CREATED, Json(style)))
}

// =============================================================================
// Variants
// =============================================================================

#[instrument(skip(state, admin), fields(company_code = %admin.company_code))]
pub async fn list_variants(
    State(state): State<AppState>,
    RequireAdminAuth(admin): RequireAdminAuth,
    Path(style_id): Path<StyleId>,
) -> Result<Json<Vec<Variant>>, AppError> {
    let repo = CatalogRepository::new(state.pool());
    repo.get_style(&admin.company_code, style_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("style {style_id}")))?;

    let variants = repo.list_variants(&admin.company_code, style_id).await?;
    Ok(Json(variants))
}

/// Create a variant; its SKU is built from the style number and attribute codes.
#[instrument(skip(state, admin, body), fields(company_code = %admin.company_code))]
pub async fn create_variant(
    State(state): State<AppState>,
    RequireAdminWriter(admin): RequireAdminWriter,
    Path(style_id): Path<StyleId>,
    body: Result<Json<CreateVariantInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Variant>), AppError> {
    let input = json_body(body)?;
    let company_code = &admin.company_code;
    let repo = CatalogRepository::new(state.pool());

    let style = repo
        .get_style(company_code, style_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("style {style_id}")))?;
    let color = require_attribute(&repo, company_code, AttributeKind::Color, input.color_id).await?;
    let size = require_attribute(&repo, company_code, AttributeKind::Size, input.size_id).await?;
    let fit = match input.fit_id {
        Some(fit_id) => Some(require_attribute(&repo, company_code, AttributeKind::Fit, fit_id).await?),
        None => None,
    };

    let unit_price = input.unit_price.unwrap_or(style.base_price);
    if unit_price.is_sign_negative() {
        return Err(AppError::BadRequest("unit_price cannot be negative".to_string()));
    }

    let sku = Sku::for_variant(
        &style.style_number,
        &color.code,
        &size.code,
        fit.as_ref().map(|f| f.code.as_str()),
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let variant = repo
        .insert_variant(&style, &sku, color.id, size.id, input.fit_id, unit_price)
        .await?;

    tracing::info!(sku = %variant.sku, style_id = %style_id, "Variant created");
    Ok((StatusCode::CREATED, Json(variant)))
}
