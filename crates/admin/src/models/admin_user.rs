//! Admin user domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use backoffice_core::{AdminUserId, CompanyCode, Email};

// Re-export AdminRole from core for convenience
pub use backoffice_core::AdminRole;

/// An admin user (domain type).
#[derive(Debug, Clone, Serialize)]
pub struct AdminUser {
    /// Unique admin user ID.
    pub id: AdminUserId,
    /// Tenant the admin manages.
    pub company_code: CompanyCode,
    /// Admin's email address.
    pub email: Email,
    /// Admin's display name.
    pub name: String,
    /// Admin's role/permission level.
    pub role: AdminRole,
    /// When the admin was created.
    pub created_at: DateTime<Utc>,
}
