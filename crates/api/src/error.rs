//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Error bodies use the same envelope as successful responses:
//! `{"success": false, "error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use techmart_core::rules::{CouponRejection, ReturnIneligible};
use techmart_core::{AttributeError, EmailError};

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::momo::MomoError;
use crate::services::orders::OrderError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Payment gateway operation failed.
    #[error("Payment error: {0}")]
    Payment(#[from] MomoError),

    /// Request body or parameters failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A business rule refused the request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Duplicate or already-processed resource.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(RepositoryError::Conflict(_)) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => auth_status(err),
            Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message shown to the client. Internal details never leave the server.
    fn public_message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_owned(),
            Self::Database(RepositoryError::Conflict(msg))
            | Self::Validation(msg)
            | Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Auth(err) => auth_message(err),
            Self::Payment(MomoError::AmountOutOfRange(_)) => {
                "This order total cannot be paid with MoMo".to_owned()
            }
            Self::Payment(_) => "Payment service error, please try again".to_owned(),
            Self::RateLimited => "Too many requests, please slow down".to_owned(),
        }
    }
}

const fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::InvalidCredentials
        | AuthError::MissingToken
        | AuthError::InvalidToken
        | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
        AuthError::AccountDisabled | AuthError::NotAdmin => StatusCode::FORBIDDEN,
        AuthError::UserAlreadyExists => StatusCode::CONFLICT,
        AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        AuthError::InvalidResetToken | AuthError::GoogleDisabled | AuthError::GoogleTokenInvalid => {
            StatusCode::BAD_REQUEST
        }
        AuthError::GoogleUnavailable(_) => StatusCode::BAD_GATEWAY,
        AuthError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AuthError::Repository(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
        AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidCredentials => "Invalid email or password".to_owned(),
        AuthError::UserAlreadyExists => "An account with this email already exists".to_owned(),
        AuthError::WeakPassword(msg) => msg.clone(),
        AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
        AuthError::MissingToken => "Authentication required".to_owned(),
        AuthError::InvalidToken => "Invalid authentication token".to_owned(),
        AuthError::TokenExpired => "Session expired, please sign in again".to_owned(),
        AuthError::AccountDisabled => "This account has been disabled".to_owned(),
        AuthError::NotAdmin => "Admin access required".to_owned(),
        AuthError::InvalidResetToken => "This reset link is invalid or has expired".to_owned(),
        AuthError::GoogleDisabled => "Google sign-in is not available".to_owned(),
        AuthError::GoogleTokenInvalid => "Google sign-in failed".to_owned(),
        AuthError::GoogleUnavailable(_) => "Google sign-in is temporarily unavailable".to_owned(),
        AuthError::Repository(RepositoryError::NotFound) => "Not found".to_owned(),
        AuthError::Repository(RepositoryError::Conflict(msg)) => msg.clone(),
        AuthError::Repository(_) | AuthError::PasswordHash | AuthError::TokenSigning => {
            "Internal server error".to_owned()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = json!({
            "success": false,
            "error": self.public_message(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(msg) => Self::Validation(msg),
            OrderError::Rejected(msg) => Self::BadRequest(msg),
            OrderError::Coupon(rejection) => rejection.into(),
            OrderError::ReturnIneligible(reason) => reason.into(),
            OrderError::NotFound(what) => Self::NotFound(format!("{what} not found")),
            OrderError::PaymentUnavailable => {
                Self::BadRequest("MoMo payments are not available".to_owned())
            }
            OrderError::Payment(e) => Self::Payment(e),
            OrderError::Repository(e) => Self::Database(e),
        }
    }
}

impl From<CouponRejection> for AppError {
    fn from(err: CouponRejection) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<ReturnIneligible> for AppError {
    fn from(err: ReturnIneligible) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl From<AttributeError> for AppError {
    fn from(err: AttributeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<EmailError> for AppError {
    fn from(err: EmailError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Payment(MomoError::InvalidSignature)),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_errors_map_to_http() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("dup".to_owned()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".to_owned()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_auth_errors_map_to_http() {
        assert_eq!(get_status(AuthError::MissingToken.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::TokenExpired.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(get_status(AuthError::NotAdmin.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AuthError::AccountDisabled.into()), StatusCode::FORBIDDEN);
        assert_eq!(get_status(AuthError::UserAlreadyExists.into()), StatusCode::CONFLICT);
    }

    #[test]
    fn test_order_errors_map_to_http() {
        assert_eq!(
            get_status(OrderError::Coupon(CouponRejection::Expired).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::ReturnIneligible(ReturnIneligible::WindowClosed).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::NotFound("order").into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(OrderError::Validation("phone is required".to_owned()).into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(OrderError::PaymentUnavailable.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_error_envelope_hides_internal_details() {
        let response = AppError::Internal("connection refused to 10.0.0.5".to_owned()).into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Internal server error"})
        );
    }
}
