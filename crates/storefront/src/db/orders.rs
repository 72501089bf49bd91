//! Order persistence.
//!
//! Writes happen inside the checkout or status-update transaction, so they
//! are plain functions over a `PgConnection`. Reads for order history and
//! detail go through [`OrderRepository`].

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use furnish_core::{
    AddressId, OrderId, OrderItemId, OrderNumber, OrderStatus, OrderTotals, PaymentStatus,
    ProductId, ShippingMethodId, ShippingStatus, UserId, VariantId,
};

use super::{RepositoryError, quantity_from_db, quantity_to_db};
use crate::models::{CheckoutLine, Order, OrderDetail, OrderItem, OrderSummary, ShippingInfo};

/// Advisory lock namespace for per-user checkout serialization.
const CHECKOUT_LOCK_NAMESPACE: i32 = 0x4f52_4452;

/// Shipping method every new order starts on.
pub const STANDARD_SHIPPING: ShippingMethodId = ShippingMethodId::new(1);

const ORDER_COLUMNS: &str = "id, order_number, user_id, billing_address_id, shipping_address_id, \
     payment_method, subtotal, tax_amount, shipping_amount, discount_amount, total_amount, \
     order_status, payment_status, notes, created_at, updated_at";

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    order_number: OrderNumber,
    user_id: UserId,
    billing_address_id: AddressId,
    shipping_address_id: AddressId,
    payment_method: String,
    subtotal: Decimal,
    tax_amount: Decimal,
    shipping_amount: Decimal,
    discount_amount: Decimal,
    total_amount: Decimal,
    order_status: OrderStatus,
    payment_status: PaymentStatus,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            order_number: row.order_number,
            user_id: row.user_id,
            billing_address_id: row.billing_address_id,
            shipping_address_id: row.shipping_address_id,
            payment_method: row.payment_method,
            subtotal: row.subtotal,
            tax_amount: row.tax_amount,
            shipping_amount: row.shipping_amount,
            discount_amount: row.discount_amount,
            total_amount: row.total_amount,
            order_status: row.order_status,
            payment_status: row.payment_status,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    order_id: OrderId,
    product_id: ProductId,
    variant_id: Option<VariantId>,
    product_name: String,
    product_sku: String,
    quantity: i32,
    unit_price: Decimal,
    total_price: Decimal,
    selected_color: String,
    selected_size: Option<String>,
    image: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            variant_id: row.variant_id,
            product_name: row.product_name,
            product_sku: row.product_sku,
            quantity: quantity_from_db(row.quantity)?,
            unit_price: row.unit_price,
            total_price: row.total_price,
            selected_color: row.selected_color,
            selected_size: row.selected_size,
            image: row.image,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ShippingRow {
    method: String,
    tracking_number: Option<String>,
    carrier: Option<String>,
    status: ShippingStatus,
}

impl From<ShippingRow> for ShippingInfo {
    fn from(row: ShippingRow) -> Self {
        Self {
            method: row.method,
            tracking_number: row.tracking_number,
            carrier: row.carrier,
            status: row.status,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderStateRow {
    user_id: UserId,
    order_status: OrderStatus,
}

/// Owner and status of an order, read under a row lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderState {
    pub user_id: UserId,
    pub order_status: OrderStatus,
}

/// Header values for a new order.
#[derive(Debug, Clone, Copy)]
pub struct NewOrder<'a> {
    pub order_number: &'a OrderNumber,
    pub user_id: UserId,
    pub billing_address_id: AddressId,
    pub shipping_address_id: AddressId,
    pub payment_method: &'a str,
    pub totals: &'a OrderTotals,
    pub notes: Option<&'a str>,
}

// =============================================================================
// Repository (reads)
// =============================================================================

/// Repository for order history and detail reads.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order header by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Order::from))
    }

    /// List a user's orders with their items, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if an item row is invalid.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrderSummary>, RepositoryError> {
        let headers = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = headers.iter().map(|h| h.id.as_i32()).collect();
        let item_rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.variant_id, oi.product_name,
                   oi.product_sku, oi.quantity, oi.unit_price, oi.total_price,
                   oi.selected_color, oi.selected_size, p.image
            FROM storefront.order_item oi
            LEFT JOIN storefront.product p ON p.id = oi.product_id
            WHERE oi.order_id = ANY($1)
            ORDER BY oi.order_id, oi.id
            ",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut items_by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let item = OrderItem::try_from(row)?;
            items_by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(headers
            .into_iter()
            .map(|h| OrderSummary {
                items: items_by_order.remove(&h.id).unwrap_or_default(),
                id: h.id,
                order_number: h.order_number,
                order_status: h.order_status,
                payment_status: h.payment_status,
                total_amount: h.total_amount,
                created_at: h.created_at,
            })
            .collect())
    }

    /// Get an order with items, addresses and shipping info, only if it
    /// belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    /// Returns `RepositoryError::DataCorruption` if a referenced address is missing.
    pub async fn get_detail_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<Option<OrderDetail>, RepositoryError> {
        let Some(header) = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.customer_order WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT oi.id, oi.order_id, oi.product_id, oi.variant_id, oi.product_name,
                   oi.product_sku, oi.quantity, oi.unit_price, oi.total_price,
                   oi.selected_color, oi.selected_size, p.image
            FROM storefront.order_item oi
            LEFT JOIN storefront.product p ON p.id = oi.product_id
            WHERE oi.order_id = $1
            ORDER BY oi.id
            ",
        )
        .bind(id)
        .fetch_all(self.pool)
        .await?
        .into_iter()
        .map(OrderItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;

        let shipping_info = sqlx::query_as::<_, ShippingRow>(
            r"
            SELECT sm.name AS method, os.tracking_number, os.carrier,
                   os.shipping_status AS status
            FROM storefront.order_shipping os
            JOIN storefront.shipping_method sm ON sm.id = os.shipping_method_id
            WHERE os.order_id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .map(ShippingInfo::from);

        let addresses = super::AddressRepository::new(self.pool);
        let billing_address = addresses
            .get_by_id(header.billing_address_id)
            .await?
            .ok_or_else(|| missing_address(header.id, header.billing_address_id))?;
        let shipping_address = addresses
            .get_by_id(header.shipping_address_id)
            .await?
            .ok_or_else(|| missing_address(header.id, header.shipping_address_id))?;

        Ok(Some(OrderDetail {
            order: header.into(),
            billing_address,
            shipping_address,
            shipping_info,
            items,
        }))
    }
}

fn missing_address(order_id: OrderId, address_id: AddressId) -> RepositoryError {
    RepositoryError::DataCorruption(format!(
        "order {order_id} references missing address {address_id}"
    ))
}

// =============================================================================
// Connection-level operations (used inside transactions)
// =============================================================================

/// Take the per-user checkout lock for the rest of the transaction.
///
/// A second checkout for the same user blocks here until the first commits
/// or rolls back. Different users never contend.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the lock cannot be taken.
pub async fn lock_user_checkout(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<(), RepositoryError> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
        .bind(CHECKOUT_LOCK_NAMESPACE)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Allocate the next order number from `order_number_seq`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the sequence cannot be read.
pub async fn next_order_number(
    conn: &mut PgConnection,
    placed_on: NaiveDate,
) -> Result<OrderNumber, RepositoryError> {
    let sequence = sqlx::query_scalar::<_, i64>("SELECT nextval('storefront.order_number_seq')")
        .fetch_one(&mut *conn)
        .await?;

    Ok(OrderNumber::from_sequence(placed_on, sequence))
}

/// Insert an order header with status `pending`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the order number is already taken.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_order(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        r"
        INSERT INTO storefront.customer_order
            (order_number, user_id, billing_address_id, shipping_address_id, payment_method,
             subtotal, tax_amount, shipping_amount, discount_amount, total_amount,
             order_status, notes)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {ORDER_COLUMNS}
        "
    ))
    .bind(order.order_number)
    .bind(order.user_id)
    .bind(order.billing_address_id)
    .bind(order.shipping_address_id)
    .bind(order.payment_method)
    .bind(order.totals.subtotal)
    .bind(order.totals.tax_amount)
    .bind(order.totals.shipping_amount)
    .bind(order.totals.discount_amount)
    .bind(order.totals.total_amount)
    .bind(OrderStatus::Pending)
    .bind(order.notes)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return RepositoryError::Conflict("order number already exists".to_owned());
        }
        RepositoryError::Database(e)
    })?;

    Ok(row.into())
}

/// Snapshot one cart line as an order item.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &CheckoutLine,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.order_item
            (order_id, product_id, variant_id, product_name, product_sku, quantity,
             unit_price, total_price, selected_color, selected_size)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ",
    )
    .bind(order_id)
    .bind(line.product_id)
    .bind(line.variant_id)
    .bind(&line.product_name)
    .bind(&line.product_sku)
    .bind(quantity_to_db(line.quantity)?)
    .bind(line.unit_price)
    .bind(line.amount().total())
    .bind(&line.color)
    .bind(line.size.as_deref())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Create the shipping record on standard shipping with status `pending`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert_shipping_stub(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.order_shipping (order_id, shipping_method_id, shipping_status)
        VALUES ($1, $2, $3)
        ",
    )
    .bind(order_id)
    .bind(STANDARD_SHIPPING)
    .bind(ShippingStatus::Pending)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Read an order's owner and status, locking the row until commit.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order_state(
    conn: &mut PgConnection,
    id: OrderId,
) -> Result<Option<OrderState>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderStateRow>(
        r"
        SELECT user_id, order_status
        FROM storefront.customer_order
        WHERE id = $1
        FOR UPDATE
        ",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| OrderState {
        user_id: r.user_id,
        order_status: r.order_status,
    }))
}

/// Set the order status and bump `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_order_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.customer_order
        SET order_status = $2, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Set the payment status and bump `updated_at`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_payment_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: PaymentStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.customer_order
        SET payment_status = $2, updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Update tracking details on the order's shipping record. `None` keeps the
/// current value.
///
/// Returns `false` if the order has no shipping record.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn update_tracking(
    conn: &mut PgConnection,
    id: OrderId,
    tracking_number: Option<&str>,
    carrier: Option<&str>,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.order_shipping
        SET tracking_number = COALESCE($2, tracking_number),
            carrier = COALESCE($3, carrier)
        WHERE order_id = $1
        ",
    )
    .bind(id)
    .bind(tracking_number)
    .bind(carrier)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Move the shipping record to match a shipped or delivered order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn set_shipping_status(
    conn: &mut PgConnection,
    id: OrderId,
    status: ShippingStatus,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE storefront.order_shipping
        SET shipping_status = $2
        WHERE order_id = $1
        ",
    )
    .bind(id)
    .bind(status)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
