//! Stock keeping units.
//!
//! A variant's SKU is derived from its style number and the codes of its
//! colour, size and (optional) fit, e.g. `TS100-BLK-M-SLIM`.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Sku`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SkuError {
    /// One of the segments is empty after whitespace removal.
    #[error("SKU segment `{0}` cannot be empty")]
    EmptySegment(&'static str),
    /// The assembled SKU is too long.
    #[error("SKU must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
}

/// A stock keeping unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Maximum length of a SKU.
    pub const MAX_LENGTH: usize = 64;

    /// Build the SKU of a style variant.
    ///
    /// Segments are stripped of whitespace and upper-cased before joining
    /// with `-`.
    ///
    /// ```
    /// use backoffice_core::Sku;
    ///
    /// let sku = Sku::for_variant("ts 100", "blk", "m", Some("slim")).unwrap();
    /// assert_eq!(sku.as_str(), "TS100-BLK-M-SLIM");
    ///
    /// let sku = Sku::for_variant("TS100", "WHT", "XL", None).unwrap();
    /// assert_eq!(sku.as_str(), "TS100-WHT-XL");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`SkuError::EmptySegment`] if a required segment (or a
    /// provided fit code) is blank, and [`SkuError::TooLong`] if the result
    /// exceeds [`Sku::MAX_LENGTH`].
    pub fn for_variant(
        style_number: &str,
        color_code: &str,
        size_code: &str,
        fit_code: Option<&str>,
    ) -> Result<Self, SkuError> {
        let mut segments = vec![
            segment("style_number", style_number)?,
            segment("color_code", color_code)?,
            segment("size_code", size_code)?,
        ];
        if let Some(fit) = fit_code {
            segments.push(segment("fit_code", fit)?);
        }

        let sku = segments.join("-");
        if sku.len() > Self::MAX_LENGTH {
            return Err(SkuError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(sku))
    }

    /// Returns the SKU as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn segment(name: &'static str, raw: &str) -> Result<String, SkuError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    if cleaned.is_empty() {
        return Err(SkuError::EmptySegment(name));
    }
    Ok(cleaned)
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_segments_are_rejected() {
        assert_eq!(
            Sku::for_variant("TS100", "  ", "M", None),
            Err(SkuError::EmptySegment("color_code"))
        );
        assert_eq!(
            Sku::for_variant("TS100", "BLK", "M", Some("")),
            Err(SkuError::EmptySegment("fit_code"))
        );
    }

    #[test]
    fn test_length_limit() {
        let long_style = "S".repeat(60);
        assert!(matches!(
            Sku::for_variant(&long_style, "BLK", "M", None),
            Err(SkuError::TooLong { max: 64 })
        ));
    }
}
