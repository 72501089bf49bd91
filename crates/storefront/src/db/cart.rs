//! Cart line persistence.
//!
//! Lines are unique per (user, product, color). Adding the same product and
//! color again increases the quantity of the existing line and keeps its
//! original price snapshot.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use furnish_core::{CartLineId, ProductId, UserId, VariantId};

use super::{RepositoryError, merged_quantity_overflow, quantity_from_db, quantity_to_db};
use crate::models::{AddToCart, CartItem, CartLine, CheckoutLine};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct CartLineRow {
    id: CartLineId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    quantity: i32,
    color: String,
    size: Option<String>,
    price_at_time: Decimal,
    created_at: DateTime<Utc>,
    inserted: bool,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            quantity: quantity_from_db(row.quantity)?,
            color: row.color,
            size: row.size,
            price_at_time: row.price_at_time,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: CartLineId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    title: String,
    description: String,
    image: Option<String>,
    category: Option<String>,
    company: Option<String>,
    quantity: i32,
    color: String,
    size: Option<String>,
    cart_price: Decimal,
    product_price: Decimal,
    created_at: DateTime<Utc>,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let quantity = quantity_from_db(row.quantity)?;
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            title: row.title,
            description: row.description,
            image: row.image,
            category: row.category,
            company: row.company,
            quantity,
            color: row.color,
            size: row.size,
            cart_price: row.cart_price,
            product_price: row.product_price,
            total_price: row.cart_price * Decimal::from(quantity),
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CheckoutLineRow {
    product_id: ProductId,
    variant_id: Option<VariantId>,
    product_name: String,
    product_sku: String,
    quantity: i32,
    unit_price: Decimal,
    color: String,
    size: Option<String>,
}

impl TryFrom<CheckoutLineRow> for CheckoutLine {
    type Error = RepositoryError;

    fn try_from(row: CheckoutLineRow) -> Result<Self, Self::Error> {
        Ok(Self {
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            quantity: quantity_from_db(row.quantity)?,
            unit_price: row.unit_price,
            color: row.color,
            size: row.size,
        })
    }
}

/// Result of adding a product to the cart.
#[derive(Debug, Clone)]
pub enum CartAddition {
    /// A new line was created with the current product price.
    Created(CartLine),
    /// An existing line for the same product and color was incremented.
    Merged(CartLine),
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for a shopper's cart.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a product to the user's cart, merging with an existing line for
    /// the same product and color.
    ///
    /// Returns `None` if the product does not exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the quantity does not fit the
    /// column type.
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn add(
        &self,
        user_id: UserId,
        item: &AddToCart,
    ) -> Result<Option<CartAddition>, RepositoryError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            r"
            INSERT INTO storefront.cart_line
                (user_id, product_id, variant_id, quantity, color, size, price_at_time)
            SELECT $1, p.id, $3, $4, $5, $6, p.price
            FROM storefront.product p
            WHERE p.id = $2
            ON CONFLICT ON CONSTRAINT cart_line_user_product_color_key DO UPDATE
            SET quantity = cart_line.quantity + EXCLUDED.quantity
            RETURNING id, product_id, variant_id, quantity, color, size, price_at_time,
                      created_at, (xmax = 0) AS inserted
            ",
        )
        .bind(user_id)
        .bind(item.product_id)
        .bind(item.variant_id)
        .bind(quantity_to_db(item.quantity)?)
        .bind(&item.color)
        .bind(item.size.as_deref())
        .fetch_optional(self.pool)
        .await
        .map_err(merged_quantity_overflow)?;

        row.map(|row| {
            let inserted = row.inserted;
            let line = CartLine::try_from(row)?;
            Ok(if inserted {
                CartAddition::Created(line)
            } else {
                CartAddition::Merged(line)
            })
        })
        .transpose()
    }

    /// List the user's cart lines with product details, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT c.id, c.product_id, c.variant_id, p.title, p.description, p.image,
                   p.category, p.company, c.quantity, c.color, c.size,
                   c.price_at_time AS cart_price, p.price AS product_price, c.created_at
            FROM storefront.cart_line c
            JOIN storefront.product p ON p.id = c.product_id
            WHERE c.user_id = $1
            ORDER BY c.created_at DESC, c.id DESC
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CartItem::try_from).collect()
    }

    /// Set the quantity of one of the user's lines.
    ///
    /// Returns `false` if the line does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.cart_line
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .bind(quantity_to_db(quantity)?)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove one of the user's lines.
    ///
    /// Returns `false` if the line does not exist or belongs to someone else.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove(&self, user_id: UserId, line_id: CartLineId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            DELETE FROM storefront.cart_line
            WHERE id = $1 AND user_id = $2
            ",
        )
        .bind(line_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove every line in the user's cart, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        clear(&mut conn, user_id).await
    }

    /// Number of lines in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM storefront.cart_line
            WHERE user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level operations (used inside the checkout transaction)
// =============================================================================

/// Load the user's cart lines with the product name and SKU to snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn checkout_lines(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Vec<CheckoutLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, CheckoutLineRow>(
        r"
        SELECT c.product_id, c.variant_id, p.title AS product_name, p.sku AS product_sku,
               c.quantity, c.price_at_time AS unit_price, c.color, c.size
        FROM storefront.cart_line c
        JOIN storefront.product p ON p.id = c.product_id
        WHERE c.user_id = $1
        ORDER BY c.id
        ",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter().map(CheckoutLine::try_from).collect()
}

/// Delete every cart line belonging to the user.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear(conn: &mut PgConnection, user_id: UserId) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        r"
        DELETE FROM storefront.cart_line
        WHERE user_id = $1
        ",
    )
    .bind(user_id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}
