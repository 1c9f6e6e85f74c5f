//! Back office core - shared domain types.
//!
//! This crate provides the types used across the back office components:
//! - `admin` - Tenant-scoped HTTP API (checkout, stock issuing, invoicing)
//! - `cli` - Command-line tools for migrations and tenant management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a
//! running `PostgreSQL`.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, tenant codes, emails, SKUs, statuses and amounts
//! - [`numbering`] - Order numbers, invoice numbers and invoice file names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod numbering;
pub mod types;

pub use types::*;
