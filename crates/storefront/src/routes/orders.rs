//! Order route handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use furnish_core::{AddressId, OrderId, OrderStatus, PaymentStatus, UserId};

use super::cart::ensure_caller;
use super::extract::{ApiJson, ApiPath, require_fields};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, OrderDetail, OrderSummary, PlaceOrder, PlacedOrder, StatusUpdate};
use crate::services::OrderService;
use crate::state::AppState;

/// Body of `POST /api/orders/create`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: Option<UserId>,
    pub billing_address_id: Option<AddressId>,
    pub shipping_address_id: Option<AddressId>,
    pub payment_method: Option<String>,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    /// Check required fields and ownership, producing the checkout input.
    ///
    /// A blank coupon code counts as no coupon.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming missing fields, or
    /// `AppError::Forbidden` if `userId` names another user.
    pub fn validate(self, caller: UserId) -> Result<PlaceOrder> {
        let payment_method = self.payment_method.filter(|m| !m.trim().is_empty());
        require_fields(&[
            ("billingAddressId", self.billing_address_id.is_some()),
            ("shippingAddressId", self.shipping_address_id.is_some()),
            ("paymentMethod", payment_method.is_some()),
        ])?;

        if ensure_caller(self.user_id, caller).is_err() {
            return Err(AppError::Forbidden(
                "Cannot place orders for another user".to_string(),
            ));
        }

        match (self.billing_address_id, self.shipping_address_id, payment_method) {
            (Some(billing_address_id), Some(shipping_address_id), Some(payment_method)) => {
                Ok(PlaceOrder {
                    billing_address_id,
                    shipping_address_id,
                    payment_method,
                    coupon_code: self
                        .coupon_code
                        .map(|c| c.trim().to_owned())
                        .filter(|c| !c.is_empty()),
                    notes: self.notes,
                })
            }
            _ => Err(AppError::BadRequest("Missing required fields".to_string())),
        }
    }
}

/// Body of `PUT /api/orders/{id}/status`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateStatusRequest {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

impl From<UpdateStatusRequest> for StatusUpdate {
    fn from(req: UpdateStatusRequest) -> Self {
        Self {
            order_status: req.order_status,
            payment_status: req.payment_status,
            tracking_number: req.tracking_number,
            carrier: req.carrier,
        }
    }
}

/// Response of `POST /api/orders/create`.
#[derive(Debug, Serialize)]
pub struct CreatedOrderResponse {
    pub message: &'static str,
    pub order: PlacedOrder,
}

/// Response of `PUT /api/orders/{id}/status`.
#[derive(Debug, Serialize)]
pub struct UpdatedOrderResponse {
    pub message: &'static str,
    pub order: Order,
}

/// Place an order from the caller's cart.
///
/// POST /api/orders/create
#[instrument(skip(state, auth, body), fields(user_id = %auth.user_id()))]
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<CreateOrderRequest>,
) -> Result<(StatusCode, Json<CreatedOrderResponse>)> {
    let input = body.validate(auth.user_id())?;

    let order = OrderService::new(state.pool(), state.pricing())
        .place_order(auth.user_id(), &input)
        .await?;

    let number = order.order_number.to_string();
    add_breadcrumb("order", "Order placed", Some(&[("order_number", number.as_str())]));

    Ok((
        StatusCode::CREATED,
        Json(CreatedOrderResponse {
            message: "Order created successfully",
            order,
        }),
    ))
}

/// The caller's order history.
///
/// GET /api/orders
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn index(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Vec<OrderSummary>>> {
    let orders = OrderService::new(state.pool(), state.pricing())
        .list_orders(auth.user_id())
        .await?;
    Ok(Json(orders))
}

/// GET /api/orders/{id}
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn show(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<OrderDetail>> {
    let order = OrderService::new(state.pool(), state.pricing())
        .get_order(auth.user_id(), order_id)
        .await?;
    Ok(Json(order))
}

/// Cancel one of the caller's orders while it is still pending or confirmed.
///
/// PUT /api/orders/{id}/cancel
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn cancel(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(order_id): ApiPath<OrderId>,
) -> Result<Json<Value>> {
    OrderService::new(state.pool(), state.pricing())
        .cancel_order(auth.user_id(), order_id)
        .await?;

    Ok(Json(json!({ "message": "Order cancelled successfully" })))
}

/// Admin update of status, payment and tracking.
///
/// PUT /api/orders/{id}/status
#[instrument(skip(state, admin, body), fields(admin_id = %admin.0.sub))]
pub async fn update_status(
    State(state): State<AppState>,
    admin: RequireAdmin,
    ApiPath(order_id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Json<UpdatedOrderResponse>> {
    let update = StatusUpdate::from(body);
    if update.is_empty() {
        return Err(AppError::BadRequest("No updates provided".to_string()));
    }

    let order = OrderService::new(state.pool(), state.pricing())
        .update_status(order_id, &update)
        .await?;

    Ok(Json(UpdatedOrderResponse {
        message: "Order updated successfully",
        order,
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: Value) -> CreateOrderRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_validate_create_request() {
        let input = request(json!({
            "billingAddressId": 3,
            "shippingAddressId": 4,
            "paymentMethod": "card",
            "couponCode": "  SAVE10 ",
        }))
        .validate(UserId::new(1))
        .unwrap();

        assert_eq!(input.billing_address_id, AddressId::new(3));
        assert_eq!(input.shipping_address_id, AddressId::new(4));
        assert_eq!(input.coupon_code.as_deref(), Some("SAVE10"));
        assert!(input.notes.is_none());
    }

    #[test]
    fn test_blank_coupon_is_no_coupon() {
        let input = request(json!({
            "billingAddressId": 3,
            "shippingAddressId": 3,
            "paymentMethod": "card",
            "couponCode": "",
        }))
        .validate(UserId::new(1))
        .unwrap();
        assert!(input.coupon_code.is_none());
    }

    #[test]
    fn test_validate_create_request_missing_fields() {
        let err = request(json!({ "billingAddressId": 3, "paymentMethod": " " }))
            .validate(UserId::new(1))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.client_message(),
            "Missing required fields: shippingAddressId, paymentMethod"
        );
    }

    #[test]
    fn test_validate_create_request_other_user() {
        let err = request(json!({
            "userId": 7,
            "billingAddressId": 3,
            "shippingAddressId": 3,
            "paymentMethod": "card",
        }))
        .validate(UserId::new(1))
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.client_message(), "Cannot place orders for another user");
    }

    #[test]
    fn test_status_request_parses_snake_case() {
        let req: UpdateStatusRequest = serde_json::from_value(json!({
            "order_status": "shipped",
            "tracking_number": "1Z999",
        }))
        .unwrap();
        let update = StatusUpdate::from(req);

        assert_eq!(update.order_status, Some(OrderStatus::Shipped));
        assert_eq!(update.tracking_number.as_deref(), Some("1Z999"));
        assert!(!update.is_empty());
        assert!(StatusUpdate::from(UpdateStatusRequest::default()).is_empty());
    }
}
