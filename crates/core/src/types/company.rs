//! Tenant identifier.
//!
//! Every tenant-owned row carries a `company_code`. Codes are minted by the
//! database sequence `company_code_seq` and rendered as `CMP` followed by a
//! zero-padded number, but codes imported from older systems only need to
//! satisfy [`CompanyCode::parse`].

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CompanyCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CompanyCodeError {
    /// The input is empty (after trimming).
    #[error("company_code is required")]
    Empty,
    /// The input is longer than [`CompanyCode::MAX_LENGTH`].
    #[error("company_code must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains a character outside `[A-Za-z0-9_-]`.
    #[error("company_code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A tenant's company code, stored upper-cased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyCode(String);

impl CompanyCode {
    /// Maximum length of a company code.
    pub const MAX_LENGTH: usize = 16;

    /// Prefix of sequence-minted codes.
    pub const PREFIX: &'static str = "CMP";

    /// Parse a company code from user input.
    ///
    /// # Errors
    ///
    /// Returns an error if the trimmed input is empty, too long, or contains
    /// characters other than ASCII letters, digits, `-` and `_`.
    pub fn parse(s: &str) -> Result<Self, CompanyCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CompanyCodeError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(CompanyCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(bad) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(CompanyCodeError::InvalidCharacter(bad));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Render the code for a value drawn from `company_code_seq`.
    ///
    /// ```
    /// use backoffice_core::CompanyCode;
    ///
    /// assert_eq!(CompanyCode::from_sequence(7).as_str(), "CMP0007");
    /// assert_eq!(CompanyCode::from_sequence(12345).as_str(), "CMP12345");
    /// ```
    #[must_use]
    pub fn from_sequence(value: i64) -> Self {
        Self(format!("{}{value:04}", Self::PREFIX))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for CompanyCode {
    type Err = CompanyCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CompanyCode {
    type Error = CompanyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CompanyCode> for String {
    fn from(code: CompanyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CompanyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for CompanyCode {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for CompanyCode {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for CompanyCode {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_uppercases_and_trims() {
        let code = CompanyCode::parse(" cmp0001 ").unwrap();
        assert_eq!(code.as_str(), "CMP0001");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(CompanyCode::parse(""), Err(CompanyCodeError::Empty));
        assert_eq!(CompanyCode::parse("  "), Err(CompanyCodeError::Empty));
    }

    #[test]
    fn test_parse_rejects_injection_characters() {
        assert_eq!(
            CompanyCode::parse("CMP1' OR 1=1"),
            Err(CompanyCodeError::InvalidCharacter('\''))
        );
    }

    #[test]
    fn test_parse_rejects_long_codes() {
        assert!(matches!(
            CompanyCode::parse(&"A".repeat(17)),
            Err(CompanyCodeError::TooLong { max: 16 })
        ));
    }

    #[test]
    fn test_sequence_codes_are_zero_padded() {
        assert_eq!(CompanyCode::from_sequence(1).as_str(), "CMP0001");
        assert!(CompanyCode::parse(CompanyCode::from_sequence(9999).as_str()).is_ok());
    }
}
