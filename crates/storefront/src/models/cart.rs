//! Cart lines and the priced cart view.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use furnish_core::{CartLineId, LineAmount, ProductId, VariantId};

/// A stored cart line.
///
/// `price_at_time` is the product price when the line was first created and
/// does not follow later catalog price changes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub color: String,
    pub size: Option<String>,
    pub price_at_time: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A cart line joined with its product, as listed to the shopper.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: CartLineId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub quantity: u32,
    pub color: String,
    pub size: Option<String>,
    /// Price captured on the cart line.
    pub cart_price: Decimal,
    /// Current catalog price, for showing price changes.
    pub product_price: Decimal,
    /// `cart_price * quantity`.
    pub total_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl CartItem {
    /// The amount this line contributes to pricing.
    #[must_use]
    pub const fn amount(&self) -> LineAmount {
        LineAmount::new(self.quantity, self.cart_price)
    }
}

/// Totals shown under the cart, priced without a coupon.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
    /// Number of distinct lines, not units.
    pub item_count: usize,
}

impl CartSummary {
    /// Summary of a cart with no lines.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            shipping: Decimal::ZERO,
            total: Decimal::ZERO,
            item_count: 0,
        }
    }
}

/// Response body for `GET /api/cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub cart_items: Vec<CartItem>,
    pub summary: CartSummary,
}

/// Validated input for adding a product to the cart.
#[derive(Debug, Clone)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub quantity: u32,
    pub color: String,
    pub size: Option<String>,
}

/// A cart line with the product fields an order item snapshots.
#[derive(Debug, Clone)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub color: String,
    pub size: Option<String>,
}

impl CheckoutLine {
    /// The amount this line contributes to pricing.
    #[must_use]
    pub const fn amount(&self) -> LineAmount {
        LineAmount::new(self.quantity, self.unit_price)
    }
}
