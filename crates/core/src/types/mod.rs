//! Core types for the back office.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod amount;
pub mod company;
pub mod email;
pub mod id;
pub mod sku;
pub mod status;

pub use amount::{AmountError, MAX_AMOUNT, OrderAmounts, fits_column};
pub use company::{CompanyCode, CompanyCodeError};
pub use email::{Email, EmailError};
pub use id::*;
pub use sku::{Sku, SkuError};
pub use status::*;
