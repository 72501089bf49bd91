//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Every error response has the body `{"error": "<message>"}`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use furnish_core::CouponError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::cart::CartError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is authenticated but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Request conflicts with current state.
    #[error("Conflict: {0}")]
    Conflict(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const INVALID_COUPON_MESSAGE: &str = "Invalid or expired coupon code";

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Auth(err) => match err {
                AuthError::MissingToken | AuthError::InvalidToken(_) | AuthError::Expired => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::Signing(_) | AuthError::Clock => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                OrderError::EmptyCart
                | OrderError::AddressNotFound(_)
                | OrderError::InvalidCoupon
                | OrderError::Coupon(_)
                | OrderError::NotCancellable
                | OrderError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    /// Message safe to show the client. Server errors never leak details.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return INTERNAL_MESSAGE.to_string();
        }

        match self {
            Self::Auth(AuthError::MissingToken) => "No token provided".to_string(),
            Self::Auth(_) => "Invalid token".to_string(),
            Self::Order(err) => match err {
                OrderError::EmptyCart => "Cart is empty".to_string(),
                OrderError::AddressNotFound(kind) => format!("{kind} address not found"),
                OrderError::InvalidCoupon
                | OrderError::Coupon(
                    CouponError::Inactive | CouponError::NotYetValid(_) | CouponError::Expired(_),
                ) => INVALID_COUPON_MESSAGE.to_string(),
                OrderError::Coupon(CouponError::BelowMinimum { minimum }) => {
                    format!("Order subtotal does not meet the coupon minimum of {minimum}")
                }
                OrderError::NotFound => "Order not found".to_string(),
                OrderError::NotCancellable => "Order cannot be cancelled at this stage".to_string(),
                OrderError::InvalidTransition(e) => {
                    format!("Cannot move order from {} to {}", e.from, e.to)
                }
                OrderError::Repository(_) => INTERNAL_MESSAGE.to_string(),
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound => "Product not found".to_string(),
                CartError::ItemNotFound => "Cart item not found".to_string(),
                CartError::InvalidQuantity => "Valid quantity is required".to_string(),
                CartError::Repository(_) => INTERNAL_MESSAGE.to_string(),
            },
            Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Conflict(msg) => msg.clone(),
            Self::Database(_) => INTERNAL_MESSAGE.to_string(),
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

        let body = Json(serde_json::json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "12")]));
/// ```
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
    use furnish_core::{OrderStatus, StatusTransitionError};
    use rust_decimal::Decimal;

    use super::*;
    use crate::services::orders::AddressKind;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("Product not found".to_string());
        assert_eq!(err.to_string(), "Not found: Product not found");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Forbidden("test".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::BadRequest("test".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Conflict("test".to_string()).status(),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_order_errors_map_to_client_messages() {
        let (status, body) = body_of(OrderError::EmptyCart.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cart is empty");

        let (status, body) = body_of(OrderError::NotCancellable.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Order cannot be cancelled at this stage");

        let (status, body) = body_of(OrderError::NotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Order not found");

        let (_, body) = body_of(OrderError::AddressNotFound(AddressKind::Billing).into()).await;
        assert_eq!(body["error"], "Billing address not found");
    }

    #[tokio::test]
    async fn test_coupon_errors_map_to_client_messages() {
        let (status, body) = body_of(OrderError::InvalidCoupon.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], INVALID_COUPON_MESSAGE);

        let (_, body) = body_of(OrderError::Coupon(CouponError::Inactive).into()).await;
        assert_eq!(body["error"], INVALID_COUPON_MESSAGE);

        let below = CouponError::BelowMinimum {
            minimum: Decimal::new(10_000, 2),
        };
        let (status, body) = body_of(OrderError::Coupon(below).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Order subtotal does not meet the coupon minimum of 100.00"
        );
    }

    #[tokio::test]
    async fn test_invalid_transition_message() {
        let err = OrderError::InvalidTransition(StatusTransitionError {
            from: OrderStatus::Shipped,
            to: OrderStatus::Processing,
        });
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Cannot move order from shipped to processing");
    }

    #[tokio::test]
    async fn test_storage_errors_are_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "order 9 references missing address 4".to_string(),
        ));
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");

        let err = OrderError::Repository(RepositoryError::NotFound);
        let (status, body) = body_of(err.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[tokio::test]
    async fn test_auth_errors_are_unauthorized() {
        let (status, body) = body_of(AuthError::MissingToken.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "No token provided");

        let (status, body) = body_of(AuthError::Expired.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid token");
    }

    #[tokio::test]
    async fn test_cart_errors() {
        let (status, body) = body_of(CartError::ItemNotFound.into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Cart item not found");

        let (status, _) = body_of(CartError::InvalidQuantity.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
