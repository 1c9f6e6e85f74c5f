//! Catalog domain types: attributes, styles and style variants.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use backoffice_core::{AttributeId, CompanyCode, StyleId, VariantId};

/// The four attribute tables share one shape and one set of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Color,
    Size,
    Fit,
    Material,
}

impl AttributeKind {
    /// Parse the plural path segment used by `/api/admin/attributes/{kind}`.
    #[must_use]
    pub fn from_path(segment: &str) -> Option<Self> {
        match segment {
            "colors" => Some(Self::Color),
            "sizes" => Some(Self::Size),
            "fits" => Some(Self::Fit),
            "materials" => Some(Self::Material),
            _ => None,
        }
    }

    /// Fully-qualified table name.
    ///
    /// Only ever interpolated from this fixed set, never from user input.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Color => "backoffice.colors",
            Self::Size => "backoffice.sizes",
            Self::Fit => "backoffice.fits",
            Self::Material => "backoffice.materials",
        }
    }

    /// Human-readable singular name for error messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Size => "size",
            Self::Fit => "fit",
            Self::Material => "material",
        }
    }
}

/// A color, size, fit or material.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Attribute {
    pub id: AttributeId,
    pub company_code: CompanyCode,
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Body for creating or updating an attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeInput {
    pub code: String,
    pub name: String,
}

impl AttributeInput {
    /// Trim both fields and upper-case the code.
    ///
    /// # Errors
    ///
    /// Returns a message naming the empty field.
    pub fn normalized(self) -> Result<Self, String> {
        let code: String = self
            .code
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase();
        let name = self.name.trim().to_string();
        if code.is_empty() {
            return Err("code is required".to_string());
        }
        if name.is_empty() {
            return Err("name is required".to_string());
        }
        Ok(Self { code, name })
    }
}

/// A style: the sellable product, independent of color and size.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Style {
    pub id: StyleId,
    pub company_code: CompanyCode,
    pub style_number: String,
    pub name: String,
    pub description: Option<String>,
    pub material_id: Option<AttributeId>,
    pub base_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/admin/styles`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStyleInput {
    pub style_number: String,
    pub name: String,
    pub description: Option<String>,
    pub material_id: Option<AttributeId>,
    #[serde(default)]
    pub base_price: Decimal,
}

impl CreateStyleInput {
    /// # Errors
    ///
    /// Returns a message describing the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.style_number.trim().is_empty() {
            return Err("style_number is required".to_string());
        }
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        if self.base_price < Decimal::ZERO {
            return Err("base_price cannot be negative".to_string());
        }
        Ok(())
    }
}

/// A concrete SKU of a style (one color, one size, optionally one fit).
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Variant {
    pub id: VariantId,
    pub style_id: StyleId,
    pub style_number: String,
    pub sku: String,
    pub color_id: AttributeId,
    pub size_id: AttributeId,
    pub fit_id: Option<AttributeId>,
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /api/admin/styles/{id}/variants`.
///
/// `unit_price` defaults to the style's `base_price`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateVariantInput {
    pub color_id: AttributeId,
    pub size_id: AttributeId,
    pub fit_id: Option<AttributeId>,
    pub unit_price: Option<Decimal>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_kind_from_path() {
        assert_eq!(AttributeKind::from_path("colors"), Some(AttributeKind::Color));
        assert_eq!(AttributeKind::from_path("materials"), Some(AttributeKind::Material));
        assert_eq!(AttributeKind::from_path("color"), None);
        assert_eq!(AttributeKind::from_path("users; drop"), None);
    }

    #[test]
    fn test_attribute_input_normalizes_code() {
        let input = AttributeInput {
            code: " nv y ".to_string(),
            name: "  Navy ".to_string(),
        }
        .normalized()
        .unwrap();
        assert_eq!(input.code, "NVY");
        assert_eq!(input.name, "Navy");
    }

    #[test]
    fn test_attribute_input_rejects_blank_fields() {
        let err = AttributeInput {
            code: "  ".to_string(),
            name: "Navy".to_string(),
        }
        .normalized()
        .unwrap_err();
        assert_eq!(err, "code is required");
    }

    #[test]
    fn test_style_input_rejects_negative_price() {
        let input = CreateStyleInput {
            style_number: "ST100".to_string(),
            name: "Oxford shirt".to_string(),
            description: None,
            material_id: None,
            base_price: Decimal::new(-1, 0),
        };
        assert_eq!(input.validate().unwrap_err(), "base_price cannot be negative");
    }
}
