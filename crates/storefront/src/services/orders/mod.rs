//! Order assembly and lifecycle.
//!
//! Placing an order turns the shopper's cart into an order header, item
//! snapshots and a shipping record inside one transaction. The transaction
//! holds a per-user advisory lock from the moment the cart is read until
//! commit, so two concurrent checkouts for the same user cannot both see
//! the same cart.
//!
//! Clearing the cart and recording coupon usage are housekeeping: each runs
//! in its own savepoint, and a failure there is logged and rolled back to
//! the savepoint without voiding the order.

mod error;

pub use error::{AddressKind, OrderError};

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument, warn};

use furnish_core::{
    CouponId, LineAmount, OrderId, OrderStatus, PricingConfig, ShippingStatus, UserId,
};

use crate::db::orders::{self as order_store, NewOrder};
use crate::db::{OrderRepository, RepositoryError, addresses, cart, coupons};
use crate::models::{
    CheckoutLine, Order, OrderDetail, OrderSummary, PlaceOrder, PlacedOrder, StatusUpdate,
};

/// Order service.
///
/// Handles checkout, order history, customer cancellation and admin status
/// updates.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    pricing: &'a PricingConfig,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, pricing: &'a PricingConfig) -> Self {
        Self { pool, pricing }
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Place an order from everything in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` if the cart has no lines.
    /// Returns `OrderError::AddressNotFound` if either address is missing or
    /// belongs to another user.
    /// Returns `OrderError::InvalidCoupon` if no coupon has the given code,
    /// or `OrderError::Coupon` if it does not apply.
    /// Returns `OrderError::Repository` if a write or the commit fails; in
    /// that case nothing is persisted.
    #[instrument(skip(self, input), fields(user_id = %user_id))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        input: &PlaceOrder,
    ) -> Result<PlacedOrder, OrderError> {
        let mut tx = self.pool.begin().await?;

        order_store::lock_user_checkout(&mut tx, user_id).await?;

        let lines = cart::checkout_lines(&mut tx, user_id).await?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        addresses::find_owned(&mut tx, user_id, input.billing_address_id)
            .await?
            .ok_or(OrderError::AddressNotFound(AddressKind::Billing))?;
        addresses::find_owned(&mut tx, user_id, input.shipping_address_id)
            .await?
            .ok_or(OrderError::AddressNotFound(AddressKind::Shipping))?;

        let coupon = match input.coupon_code.as_deref() {
            Some(code) => Some(
                coupons::find_by_code(&mut tx, code)
                    .await?
                    .ok_or(OrderError::InvalidCoupon)?,
            ),
            None => None,
        };

        let today = Utc::now().date_naive();
        let amounts: Vec<LineAmount> = lines.iter().map(CheckoutLine::amount).collect();
        let totals = self
            .pricing
            .quote(&amounts, coupon.as_ref().map(|c| &c.terms), today)?;

        let order_number = order_store::next_order_number(&mut tx, today).await?;
        let order = order_store::insert_order(
            &mut tx,
            &NewOrder {
                order_number: &order_number,
                user_id,
                billing_address_id: input.billing_address_id,
                shipping_address_id: input.shipping_address_id,
                payment_method: &input.payment_method,
                totals: &totals,
                notes: input.notes.as_deref(),
            },
        )
        .await?;

        for line in &lines {
            order_store::insert_item(&mut tx, order.id, line).await?;
        }
        order_store::insert_shipping_stub(&mut tx, order.id).await?;

        if let Err(e) = clear_cart(&mut tx, user_id).await {
            warn!(error = %e, order_id = %order.id, "Failed to clear cart after checkout");
        }

        if let Some(coupon) = &coupon {
            if let Err(e) =
                record_coupon_usage(&mut tx, coupon.id, user_id, order.id, totals.discount_amount)
                    .await
            {
                warn!(
                    error = %e,
                    order_id = %order.id,
                    coupon = %coupon.code,
                    "Failed to record coupon usage"
                );
            }
        }

        tx.commit().await?;

        info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total_amount,
            items = lines.len(),
            "Order placed"
        );

        Ok(PlacedOrder {
            id: order.id,
            order_number: order.order_number,
            total_amount: order.total_amount,
            status: order.order_status,
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// List the user's orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list_orders(&self, user_id: UserId) -> Result<Vec<OrderSummary>, OrderError> {
        Ok(OrderRepository::new(self.pool).list_for_user(user_id).await?)
    }

    /// Get one of the user's orders in full.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn get_order(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<OrderDetail, OrderError> {
        OrderRepository::new(self.pool)
            .get_detail_for_user(user_id, order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Cancel one of the user's orders.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    /// Returns `OrderError::NotCancellable` once the order is processing or later.
    #[instrument(skip(self), fields(user_id = %user_id, order_id = %order_id))]
    pub async fn cancel_order(&self, user_id: UserId, order_id: OrderId) -> Result<(), OrderError> {
        let mut tx = self.pool.begin().await?;

        let state = order_store::lock_order_state(&mut tx, order_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or(OrderError::NotFound)?;

        if !state.order_status.is_cancellable() {
            return Err(OrderError::NotCancellable);
        }

        order_store::set_order_status(&mut tx, order_id, OrderStatus::Cancelled).await?;
        tx.commit().await?;

        info!(from = %state.order_status, "Order cancelled by customer");
        Ok(())
    }

    /// Apply an admin update to an order's status, payment and tracking.
    ///
    /// All changes are written in one transaction. Re-sending the current
    /// order status is accepted and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist.
    /// Returns `OrderError::InvalidTransition` for backward moves, moves out
    /// of a terminal state, or cancelling once processing has started.
    #[instrument(skip(self, update), fields(order_id = %order_id))]
    pub async fn update_status(
        &self,
        order_id: OrderId,
        update: &StatusUpdate,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let state = order_store::lock_order_state(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if let Some(next) = update.order_status
            && next != state.order_status
        {
            state.order_status.transition(next)?;
            order_store::set_order_status(&mut tx, order_id, next).await?;

            let shipping = match next {
                OrderStatus::Shipped => Some(ShippingStatus::Shipped),
                OrderStatus::Delivered => Some(ShippingStatus::Delivered),
                _ => None,
            };
            if let Some(status) = shipping {
                order_store::set_shipping_status(&mut tx, order_id, status).await?;
            }

            info!(from = %state.order_status, to = %next, "Order status changed");
        }

        if let Some(payment) = update.payment_status {
            order_store::set_payment_status(&mut tx, order_id, payment).await?;
        }

        if (update.tracking_number.is_some() || update.carrier.is_some())
            && !order_store::update_tracking(
                &mut tx,
                order_id,
                update.tracking_number.as_deref(),
                update.carrier.as_deref(),
            )
            .await?
        {
            warn!("Order has no shipping record; tracking details not saved");
        }

        tx.commit().await?;

        OrderRepository::new(self.pool)
            .get_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)
    }
}

// =============================================================================
// Housekeeping (savepoint-scoped)
// =============================================================================

/// Delete the user's cart lines inside a savepoint.
async fn clear_cart(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let mut savepoint = sqlx::Connection::begin(conn).await?;
    let removed = cart::clear(&mut savepoint, user_id).await?;
    savepoint.commit().await?;
    Ok(removed)
}

/// Append a coupon usage row inside a savepoint.
async fn record_coupon_usage(
    conn: &mut PgConnection,
    coupon_id: CouponId,
    user_id: UserId,
    order_id: OrderId,
    discount_amount: Decimal,
) -> Result<(), RepositoryError> {
    let mut savepoint = sqlx::Connection::begin(conn).await?;
    coupons::record_usage(&mut savepoint, coupon_id, user_id, order_id, discount_amount).await?;
    savepoint.commit().await?;
    Ok(())
}
