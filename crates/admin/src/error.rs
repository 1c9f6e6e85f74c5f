//! Unified error handling for the back office API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, CheckoutError, InvoiceError, IssueError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Checkout failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Stock issuing failed.
    #[error(transparent)]
    Issue(#[from] IssueError),

    /// Invoice download failed.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User lacks permission.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request conflicts with existing data.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("resource".to_string()),
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Database(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("invalid credentials".to_string()),
            AuthError::UserAlreadyExists => Self::Conflict("user already exists".to_string()),
            AuthError::InvalidEmail(_) | AuthError::WeakPassword(_) | AuthError::MissingField(_) => {
                Self::BadRequest(err.to_string())
            }
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal(err.to_string()),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Checkout(err) => match err {
                CheckoutError::Invalid(_) | CheckoutError::AddressNotFound(_) => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::WrongTenant => StatusCode::FORBIDDEN,
                CheckoutError::Failed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Issue(err) => match err {
                IssueError::Invalid(_) | IssueError::ForeignOrderItems(_) => {
                    StatusCode::BAD_REQUEST
                }
                IssueError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                IssueError::InvalidStatus(_) => StatusCode::CONFLICT,
                IssueError::Unavailable(_) => StatusCode::UNPROCESSABLE_ENTITY,
                IssueError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Invoice(err) => match err {
                InvoiceError::OrderNotFound => StatusCode::NOT_FOUND,
                InvoiceError::Repository(_) | InvoiceError::Render(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// The JSON body sent to the client.
    fn body(&self) -> serde_json::Value {
        match self {
            // Don't expose internal error details to clients
            Self::Database(_) | Self::Internal(_) => json!({ "error": "Internal server error" }),
            Self::Checkout(err @ CheckoutError::Failed { stage, .. }) => {
                json!({ "error": err.to_string(), "stage": stage })
            }
            Self::Issue(IssueError::Unavailable(failures)) => json!({
                "error": "Insufficient stock, nothing was issued",
                "details": failures,
            }),
            Self::Issue(IssueError::Database(_))
            | Self::Invoice(InvoiceError::Repository(_) | InvoiceError::Render(_)) => {
                json!({ "error": "Internal server error" })
            }
            Self::Checkout(err) => json!({ "error": err.to_string() }),
            Self::Issue(err) => json!({ "error": err.to_string() }),
            Self::Invoice(err) => json!({ "error": err.to_string() }),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => json!({ "error": msg }),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log server errors with Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

/// Set the Sentry user context from a signed-in principal.
pub fn set_sentry_user(user_id: i32, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
