//! Session-related types for admin and customer authentication.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use backoffice_core::{AdminUserId, CompanyCode, CustomerId, Email};

use super::admin_user::AdminRole;

/// Session-stored admin identity.
///
/// Every admin belongs to exactly one tenant; all admin routes are scoped to
/// `company_code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAdmin {
    /// Admin's database ID.
    pub id: AdminUserId,
    /// Tenant the admin manages.
    pub company_code: CompanyCode,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
}

/// Session-stored customer identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentCustomer {
    /// Customer's database ID.
    pub id: CustomerId,
    /// Tenant the customer registered with.
    pub company_code: CompanyCode,
    /// Customer's email address (invoice recipient).
    pub email: Email,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in admin.
    pub const CURRENT_ADMIN: &str = "current_admin";

    /// Key for storing the current logged-in customer.
    pub const CURRENT_CUSTOMER: &str = "current_customer";
}
