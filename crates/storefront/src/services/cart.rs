//! Cart operations scoped to the authenticated shopper.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use furnish_core::{CartLineId, LineAmount, PricingConfig, PricingError, UserId};

use crate::db::cart::CartAddition;
use crate::db::{CartRepository, RepositoryError};
use crate::models::{AddToCart, CartItem, CartSummary, CartView};

/// Errors that can occur during cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// The product to add does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// The cart line does not exist or belongs to another user.
    #[error("cart item not found")]
    ItemNotFound,

    /// Quantity is zero or too large.
    #[error("valid quantity is required")]
    InvalidQuantity,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    cart: CartRepository<'a>,
    pricing: &'a PricingConfig,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, pricing: &'a PricingConfig) -> Self {
        Self {
            cart: CartRepository::new(pool),
            pricing,
        }
    }

    /// Add a product to the cart, merging with an existing line of the same
    /// color.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero or oversized quantity.
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self, item), fields(user_id = %user_id, product_id = %item.product_id))]
    pub async fn add(&self, user_id: UserId, item: &AddToCart) -> Result<CartAddition, CartError> {
        if item.quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        self.cart
            .add(user_id, item)
            .await
            .map_err(quantity_conflict)?
            .ok_or(CartError::ProductNotFound)
    }

    /// The user's cart lines with totals priced the same way checkout prices
    /// them, without a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, CartError> {
        let cart_items = self.cart.list_items(user_id).await?;
        let summary = summarize(self.pricing, &cart_items);
        Ok(CartView {
            cart_items,
            summary,
        })
    }

    /// Change the quantity of one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InvalidQuantity` for a zero or oversized quantity.
    /// Returns `CartError::ItemNotFound` if the line is not in the user's cart.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let updated = self
            .cart
            .update_quantity(user_id, line_id, quantity)
            .await
            .map_err(quantity_conflict)?;
        if !updated {
            return Err(CartError::ItemNotFound);
        }
        Ok(())
    }

    /// Remove one of the user's lines.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the line is not in the user's cart.
    pub async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<(), CartError> {
        if !self.cart.remove(user_id, line_id).await? {
            return Err(CartError::ItemNotFound);
        }
        Ok(())
    }

    /// Empty the user's cart, returning how many lines were removed.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, CartError> {
        Ok(self.cart.clear(user_id).await?)
    }

    /// Number of lines in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, CartError> {
        Ok(self.cart.count(user_id).await?)
    }
}

/// Price cart items for display. An empty cart has all-zero totals.
fn summarize(pricing: &PricingConfig, items: &[CartItem]) -> CartSummary {
    let amounts: Vec<LineAmount> = items.iter().map(CartItem::amount).collect();
    match pricing.quote(&amounts, None, Utc::now().date_naive()) {
        Ok(totals) => CartSummary {
            subtotal: totals.subtotal,
            tax: totals.tax_amount,
            shipping: totals.shipping_amount,
            total: totals.total_amount,
            item_count: items.len(),
        },
        Err(PricingError::EmptyCart | PricingError::Coupon(_)) => CartSummary::empty(),
    }
}

fn quantity_conflict(err: RepositoryError) -> CartError {
    match err {
        RepositoryError::Conflict(_) => CartError::InvalidQuantity,
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use furnish_core::{CartLineId, ProductId};

    use super::*;

    fn item(quantity: u32, cents: i64) -> CartItem {
        let price = Decimal::new(cents, 2);
        CartItem {
            id: CartLineId::new(1),
            product_id: ProductId::new(1),
            variant_id: None,
            title: "Lounge Chair".to_owned(),
            description: String::new(),
            image: None,
            category: None,
            company: None,
            quantity,
            color: "walnut".to_owned(),
            size: None,
            cart_price: price,
            product_price: price,
            total_price: price * Decimal::from(quantity),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_matches_checkout_pricing() {
        let summary = summarize(&PricingConfig::default(), &[item(2, 5_000)]);

        assert_eq!(summary.subtotal, Decimal::new(10_000, 2));
        assert_eq!(summary.tax, Decimal::new(1_500, 2));
        assert_eq!(summary.shipping, Decimal::new(1_599, 2));
        assert_eq!(summary.total, Decimal::new(13_099, 2));
        assert_eq!(summary.item_count, 1);
    }

    #[test]
    fn test_empty_cart_summary_is_zero() {
        let summary = summarize(&PricingConfig::default(), &[]);
        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.shipping, Decimal::ZERO);
        assert_eq!(summary.item_count, 0);
    }

    #[test]
    fn test_item_count_is_lines_not_units() {
        let summary = summarize(&PricingConfig::default(), &[item(3, 100), item(1, 250)]);
        assert_eq!(summary.item_count, 2);
        assert_eq!(summary.subtotal, Decimal::new(550, 2));
    }
}
