//! Orders, their item snapshots and shipping records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use furnish_core::{
    AddressId, OrderId, OrderItemId, OrderNumber, OrderStatus, PaymentStatus, ProductId,
    ShippingStatus, UserId, VariantId,
};

use super::Address;

/// An order header. Monetary fields are fixed when the order is placed.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: UserId,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub payment_method: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One purchased line, snapshotted from the cart at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub product_sku: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub selected_color: String,
    pub selected_size: Option<String>,
    /// Current product image, joined for display.
    pub image: Option<String>,
}

/// Shipping record of an order.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingInfo {
    /// Shipping method name, e.g. "Standard Shipping".
    pub method: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub status: ShippingStatus,
}

/// An order in the customer's order history.
#[derive(Debug, Clone, Serialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

/// Everything shown on the order detail page.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub billing_address: Address,
    pub shipping_address: Address,
    /// Absent only if the shipping stub was never written.
    pub shipping_info: Option<ShippingInfo>,
    pub items: Vec<OrderItem>,
}

/// Validated input for placing an order from the user's cart.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub payment_method: String,
    pub coupon_code: Option<String>,
    pub notes: Option<String>,
}

/// The part of a new order returned to the client.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub total_amount: Decimal,
    pub status: OrderStatus,
}

/// Admin changes to an order. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
}

impl StatusUpdate {
    /// Whether the update would change nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.order_status.is_none()
            && self.payment_status.is_none()
            && self.tracking_number.is_none()
            && self.carrier.is_none()
    }
}
