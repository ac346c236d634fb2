//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Failures render as
//!
//! ```json
//! { "error": { "message": "...", "code": "NOT_FOUND", "details": { } } }
//! ```
//!
//! Server errors are captured to Sentry before responding, and their message
//! is replaced with a generic one.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use storekeep_core::{CouponRejection, StatusTransitionError};

use crate::db::RepositoryError;
use crate::services::StockShortage;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::coupons::CouponError;
use crate::services::orders::OrderError;
use crate::validation::FieldErrors;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or invalid input.
    #[error("{message}")]
    Validation {
        message: String,
        fields: Option<FieldErrors>,
    },

    /// No session, or bad credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Coupon(CouponRejection),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(StockShortage),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InvalidTransition(StatusTransitionError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    error: ErrorBody<'a>,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: String,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Value>,
}

impl AppError {
    /// Validation failure without per-field details.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            fields: None,
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::Coupon(rejection) => rejection.code(),
            Self::InsufficientStock(_) => "INSUFFICIENT_STOCK",
            Self::EmptyCart => "EMPTY_CART",
            Self::InvalidTransition(_) => "INVALID_STATUS_TRANSITION",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::Coupon(_)
            | Self::InsufficientStock(_)
            | Self::EmptyCart
            | Self::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            Self::Validation {
                fields: Some(fields),
                ..
            } => serde_json::to_value(fields).ok(),
            Self::Coupon(CouponRejection::MinOrderNotMet { required, subtotal }) => Some(json!({
                "minOrderAmount": required,
                "subtotal": subtotal,
            })),
            Self::InsufficientStock(shortage) => serde_json::to_value(shortage).ok(),
            Self::InvalidTransition(err) => Some(json!({
                "from": err.from,
                "to": err.to,
            })),
            _ => None,
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

        // Don't expose internal error details to clients
        let message = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorEnvelope {
            error: ErrorBody {
                message,
                code: self.code(),
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Conversions
// =============================================================================

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("Resource not found".to_string()),
            RepositoryError::Conflict(message) => Self::Conflict(message),
            other => Self::Database(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::Unauthorized("Invalid credentials".to_string()),
            AuthError::UserAlreadyExists => {
                Self::Conflict("An account with this email already exists".to_string())
            }
            AuthError::InvalidEmail(e) => {
                Self::Validation {
                    message: "Invalid email address".to_string(),
                    fields: Some(FieldErrors::single("email", e.to_string())),
                }
            }
            AuthError::WeakPassword(message) => Self::Validation {
                fields: Some(FieldErrors::single("password", message.clone())),
                message,
            },
            AuthError::InvalidName(message) => Self::Validation {
                fields: Some(FieldErrors::single("name", message.clone())),
                message,
            },
            AuthError::Repository(e) => e.into(),
            AuthError::PasswordHash => Self::Internal("password hashing failed".to_string()),
        }
    }
}

impl From<CartError> for AppError {
    fn from(err: CartError) -> Self {
        match err {
            CartError::ProductNotFound(_) => Self::NotFound("Product not found".to_string()),
            CartError::LineNotFound(_) => Self::NotFound("Product is not in the cart".to_string()),
            CartError::InvalidQuantity => Self::Validation {
                message: "Quantity must be at least 1".to_string(),
                fields: Some(FieldErrors::single("quantity", "must be at least 1")),
            },
            CartError::InsufficientStock(shortage) => Self::InsufficientStock(shortage),
            CartError::Repository(e) => e.into(),
        }
    }
}

impl From<CouponError> for AppError {
    fn from(err: CouponError) -> Self {
        match err {
            CouponError::Rejected(rejection) => Self::Coupon(rejection),
            CouponError::EmptyCart => Self::EmptyCart,
            CouponError::NotFound => Self::NotFound("Coupon not found".to_string()),
            CouponError::DuplicateCode => Self::Conflict("Coupon code already exists".to_string()),
            CouponError::PercentageTooLarge => Self::Validation {
                message: "Validation failed".to_string(),
                fields: Some(FieldErrors::single("discount", "percentage cannot exceed 100")),
            },
            CouponError::Repository(e) => e.into(),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart => Self::EmptyCart,
            OrderError::InsufficientStock(shortage) => Self::InsufficientStock(shortage),
            OrderError::Coupon(rejection) => Self::Coupon(rejection),
            OrderError::NotFound => Self::NotFound("Order not found".to_string()),
            OrderError::Transition(e) => Self::InvalidTransition(e),
            OrderError::Repository(e) => e.into(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

// =============================================================================
// Sentry context
// =============================================================================

/// Set the Sentry user context.
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

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;
    use rust_decimal::Decimal;
    use storekeep_core::{OrderStatus, ProductId};

    use super::*;

    async fn render(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = render(AppError::NotFound("Product not found".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            json!({ "error": { "message": "Product not found", "code": "NOT_FOUND" } })
        );
    }

    #[tokio::test]
    async fn test_internal_errors_are_redacted() {
        let (status, body) = render(AppError::Internal("pool exhausted".to_string())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"]["code"], "INTERNAL_ERROR");
        assert_eq!(body["error"]["message"], "Internal server error");
    }

    #[tokio::test]
    async fn test_coupon_rejection_details() {
        let err = AppError::Coupon(CouponRejection::MinOrderNotMet {
            required: Decimal::from(50),
            subtotal: Decimal::from(40),
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MIN_ORDER_NOT_MET");
        assert_eq!(body["error"]["details"]["minOrderAmount"], "50");
        assert_eq!(body["error"]["details"]["subtotal"], "40");
    }

    #[tokio::test]
    async fn test_stock_shortage_details() {
        let err = AppError::InsufficientStock(StockShortage {
            product_id: ProductId::new(4),
            product_name: "Tea Towel".to_string(),
            requested: 5,
            available: 2,
        });
        let (status, body) = render(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
        assert_eq!(body["error"]["details"]["productId"], 4);
        assert_eq!(body["error"]["details"]["available"], 2);
    }

    #[tokio::test]
    async fn test_transition_details() {
        let err = OrderStatus::Delivered
            .transition_to(OrderStatus::Cancelled)
            .unwrap_err();
        let (status, body) = render(AppError::from(OrderError::from(err))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_STATUS_TRANSITION");
        assert_eq!(body["error"]["details"]["from"], "delivered");
        assert_eq!(body["error"]["details"]["to"], "cancelled");
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".to_string()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".to_string()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (AppError::EmptyCart, StatusCode::BAD_REQUEST),
            (AppError::Coupon(CouponRejection::Expired), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err.code());
        }
    }

    #[test]
    fn test_auth_error_mapping() {
        assert_eq!(
            AppError::from(AuthError::InvalidCredentials).code(),
            "UNAUTHORIZED"
        );
        assert_eq!(AppError::from(AuthError::UserAlreadyExists).code(), "CONFLICT");
        assert_eq!(
            AppError::from(AuthError::WeakPassword("too short".to_string())).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        assert_eq!(AppError::from(RepositoryError::NotFound).code(), "NOT_FOUND");
        assert_eq!(
            AppError::from(RepositoryError::Conflict("email already exists".to_string())).code(),
            "CONFLICT"
        );
        assert_eq!(
            AppError::from(RepositoryError::DataCorruption("bad row".to_string())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_service_validation_errors_name_the_field() {
        let (status, body) = render(AppError::from(CartError::InvalidQuantity)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["details"]["quantity"], "must be at least 1");

        let (_, body) = render(AppError::from(CouponError::PercentageTooLarge)).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"]["discount"], "percentage cannot exceed 100");
    }
}
