//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `user` - Shoppers and staff (credentials owned by the identity service)
//! - `product` - Furniture catalog
//! - `address` - User billing/shipping addresses
//! - `cart_line` - One row per (user, product, color)
//! - `coupon` - Discount codes (read-only here)
//! - `customer_order` - Order headers, numbered from `order_number_seq`
//! - `order_item` - Item snapshots taken at checkout
//! - `order_shipping` - 1:1 shipping record per order
//! - `shipping_method` - Shipping tiers (row 1 is standard shipping)
//! - `coupon_usage` - Append-only coupon redemptions
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p furnish-cli -- migrate
//! ```
//!
//! Queries are built at runtime with `sqlx::query_as` so the workspace
//! compiles without a live database.

pub mod addresses;
pub mod cart;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use cart::CartRepository;
pub use coupons::CouponRepository;
pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Embedded storefront migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., a user that still has orders).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Convert a stored quantity into the unsigned domain value.
///
/// The schema keeps quantities at one or more, so a failure here means the
/// row was written outside this crate.
pub(crate) fn quantity_from_db(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity).map_err(|_| {
        RepositoryError::DataCorruption(format!("negative quantity in database: {quantity}"))
    })
}

/// Convert a domain quantity into the `INTEGER` column type.
pub(crate) fn quantity_to_db(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is too large")))
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Map an overflowing merged quantity to a conflict; other errors pass through.
pub(crate) fn merged_quantity_overflow(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
    {
        return RepositoryError::Conflict("merged quantity is too large".to_owned());
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_from_db() {
        assert_eq!(quantity_from_db(3).unwrap(), 3);
        assert!(matches!(
            quantity_from_db(-1),
            Err(RepositoryError::DataCorruption(_))
        ));
    }

    #[test]
    fn test_quantity_to_db_rejects_overflow() {
        assert_eq!(quantity_to_db(12).unwrap(), 12);
        assert!(matches!(
            quantity_to_db(u32::MAX),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn test_merged_quantity_overflow_passes_other_errors_through() {
        assert!(matches!(
            merged_quantity_overflow(sqlx::Error::RowNotFound),
            RepositoryError::Database(sqlx::Error::RowNotFound)
        ));
    }
}
