//! Cart route handlers.
//!
//! Every route acts on the cart of the user named in the bearer token.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::instrument;

use furnish_core::{CartLineId, ProductId, UserId, VariantId};

use super::extract::{ApiJson, ApiPath, require_fields};
use crate::db::cart::CartAddition;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{AddToCart, CartLine, CartView};
use crate::services::CartService;
use crate::state::AppState;

/// Body of `POST /api/cart/add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    /// Accepted for older clients; must match the token when present.
    pub user_id: Option<UserId>,
    pub product_id: Option<ProductId>,
    pub variant_id: Option<VariantId>,
    pub quantity: Option<u32>,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl AddToCartRequest {
    /// Check required fields and ownership, producing the service input.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` naming missing fields, or
    /// `AppError::Forbidden` if `userId` names another user.
    pub fn validate(self, caller: UserId) -> Result<AddToCart> {
        let color = self.color.filter(|c| !c.trim().is_empty());
        require_fields(&[
            ("productId", self.product_id.is_some()),
            ("quantity", self.quantity.is_some_and(|q| q > 0)),
            ("color", color.is_some()),
        ])?;
        ensure_caller(self.user_id, caller)?;

        match (self.product_id, self.quantity, color) {
            (Some(product_id), Some(quantity), Some(color)) => Ok(AddToCart {
                product_id,
                variant_id: self.variant_id,
                quantity,
                color,
                size: self.size.filter(|s| !s.trim().is_empty()),
            }),
            _ => Err(AppError::BadRequest("Missing required fields".to_string())),
        }
    }
}

/// Body of `PUT /api/cart/item/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: Option<u32>,
}

/// Response of `POST /api/cart/add`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineResponse {
    pub message: &'static str,
    pub cart_item: CartLine,
}

/// Reject a body `userId` that does not match the authenticated user.
///
/// # Errors
///
/// Returns `AppError::Forbidden` on mismatch.
pub fn ensure_caller(claimed: Option<UserId>, caller: UserId) -> Result<()> {
    match claimed {
        Some(claimed) if claimed != caller => {
            tracing::warn!(%claimed, %caller, "Request body names a different user");
            Err(AppError::Forbidden("Access denied".to_string()))
        }
        _ => Ok(()),
    }
}

/// Add a product to the cart.
///
/// POST /api/cart/add
///
/// Responds `201` when a new line is created and `200` when an existing line
/// for the same product and color is incremented.
#[instrument(skip(state, auth, body), fields(user_id = %auth.user_id()))]
pub async fn add(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiJson(body): ApiJson<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartLineResponse>)> {
    let item = body.validate(auth.user_id())?;
    let product_id = item.product_id.to_string();

    let addition = CartService::new(state.pool(), state.pricing())
        .add(auth.user_id(), &item)
        .await?;

    add_breadcrumb("cart", "Added item", Some(&[("product_id", product_id.as_str())]));

    Ok(match addition {
        CartAddition::Created(line) => (
            StatusCode::CREATED,
            Json(CartLineResponse {
                message: "Item added to cart successfully",
                cart_item: line,
            }),
        ),
        CartAddition::Merged(line) => (
            StatusCode::OK,
            Json(CartLineResponse {
                message: "Cart updated successfully",
                cart_item: line,
            }),
        ),
    })
}

/// Show the cart with a priced summary.
///
/// GET /api/cart
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn show(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<CartView>> {
    let view = CartService::new(state.pool(), state.pricing())
        .view(auth.user_id())
        .await?;
    Ok(Json(view))
}

/// Change a line's quantity.
///
/// PUT /api/cart/item/{id}
#[instrument(skip(state, auth, body), fields(user_id = %auth.user_id()))]
pub async fn update_item(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(line_id): ApiPath<CartLineId>,
    ApiJson(body): ApiJson<UpdateQuantityRequest>,
) -> Result<Json<Value>> {
    let quantity = body
        .quantity
        .filter(|q| *q > 0)
        .ok_or_else(|| AppError::BadRequest("Valid quantity is required".to_string()))?;

    CartService::new(state.pool(), state.pricing())
        .update_quantity(auth.user_id(), line_id, quantity)
        .await?;

    Ok(Json(json!({ "message": "Cart item updated successfully" })))
}

/// Remove a line.
///
/// DELETE /api/cart/item/{id}
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn remove_item(
    State(state): State<AppState>,
    auth: RequireAuth,
    ApiPath(line_id): ApiPath<CartLineId>,
) -> Result<Json<Value>> {
    CartService::new(state.pool(), state.pricing())
        .remove(auth.user_id(), line_id)
        .await?;

    Ok(Json(json!({ "message": "Item removed from cart successfully" })))
}

/// Empty the cart.
///
/// DELETE /api/cart
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn clear(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<Value>> {
    let removed = CartService::new(state.pool(), state.pricing())
        .clear(auth.user_id())
        .await?;

    Ok(Json(json!({
        "message": "Cart cleared successfully",
        "itemsRemoved": removed,
    })))
}

/// Number of lines, for the navbar badge.
///
/// GET /api/cart/count
#[instrument(skip(state, auth), fields(user_id = %auth.user_id()))]
pub async fn count(State(state): State<AppState>, auth: RequireAuth) -> Result<Json<Value>> {
    let count = CartService::new(state.pool(), state.pricing())
        .count(auth.user_id())
        .await?;

    Ok(Json(json!({ "count": count })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: Value) -> AddToCartRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_validate_add_request() {
        let item = request(json!({ "productId": 4, "quantity": 2, "color": "oak" }))
            .validate(UserId::new(1))
            .unwrap();
        assert_eq!(item.product_id, ProductId::new(4));
        assert_eq!(item.quantity, 2);
        assert_eq!(item.color, "oak");
        assert!(item.size.is_none());
    }

    #[test]
    fn test_validate_add_request_missing_fields() {
        let err = request(json!({ "productId": 4 }))
            .validate(UserId::new(1))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.client_message(),
            "Missing required fields: quantity, color"
        );
    }

    #[test]
    fn test_validate_add_request_rejects_zero_quantity_and_blank_color() {
        let err = request(json!({ "productId": 4, "quantity": 0, "color": "  " }))
            .validate(UserId::new(1))
            .unwrap_err();
        assert_eq!(
            err.client_message(),
            "Missing required fields: quantity, color"
        );
    }

    #[test]
    fn test_validate_add_request_other_user() {
        let err = request(json!({ "userId": 2, "productId": 4, "quantity": 1, "color": "oak" }))
            .validate(UserId::new(1))
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_ensure_caller() {
        assert!(ensure_caller(None, UserId::new(1)).is_ok());
        assert!(ensure_caller(Some(UserId::new(1)), UserId::new(1)).is_ok());
        assert!(ensure_caller(Some(UserId::new(9)), UserId::new(1)).is_err());
    }
}
