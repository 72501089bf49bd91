//! Coupon lookups and redemption records.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use furnish_core::{CouponId, CouponTerms, DiscountType, OrderId, UserId};

use super::RepositoryError;

/// A coupon record: its identity plus the terms pricing works with.
#[derive(Debug, Clone)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub terms: CouponTerms,
}

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    discount_type: DiscountType,
    discount_value: Decimal,
    minimum_order_amount: Decimal,
    maximum_discount: Option<Decimal>,
    valid_from: NaiveDate,
    valid_until: NaiveDate,
    is_active: bool,
}

impl From<CouponRow> for Coupon {
    fn from(row: CouponRow) -> Self {
        Self {
            id: row.id,
            code: row.code,
            terms: CouponTerms {
                discount_type: row.discount_type,
                discount_value: row.discount_value,
                minimum_order_amount: row.minimum_order_amount,
                maximum_discount: row.maximum_discount,
                valid_from: row.valid_from,
                valid_until: row.valid_until,
                is_active: row.is_active,
            },
        }
    }
}

/// Repository for coupon administration.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace a coupon keyed by code. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert(&self, code: &str, terms: &CouponTerms) -> Result<Coupon, RepositoryError> {
        let row = sqlx::query_as::<_, CouponRow>(
            r"
            INSERT INTO storefront.coupon
                (code, discount_type, discount_value, minimum_order_amount,
                 maximum_discount, valid_from, valid_until, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (code) DO UPDATE
            SET discount_type = EXCLUDED.discount_type,
                discount_value = EXCLUDED.discount_value,
                minimum_order_amount = EXCLUDED.minimum_order_amount,
                maximum_discount = EXCLUDED.maximum_discount,
                valid_from = EXCLUDED.valid_from,
                valid_until = EXCLUDED.valid_until,
                is_active = EXCLUDED.is_active
            RETURNING id, code, discount_type, discount_value, minimum_order_amount,
                      maximum_discount, valid_from, valid_until, is_active
            ",
        )
        .bind(code)
        .bind(terms.discount_type)
        .bind(terms.discount_value)
        .bind(terms.minimum_order_amount)
        .bind(terms.maximum_discount)
        .bind(terms.valid_from)
        .bind(terms.valid_until)
        .bind(terms.is_active)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Number of times a coupon has been redeemed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn usage_count(&self, id: CouponId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM storefront.coupon_usage WHERE coupon_id = $1",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

/// Look up a coupon by its exact code.
///
/// Validity (active flag, dates, minimum) is decided by pricing, not here.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Coupon>, RepositoryError> {
    let row = sqlx::query_as::<_, CouponRow>(
        r"
        SELECT id, code, discount_type, discount_value, minimum_order_amount,
               maximum_discount, valid_from, valid_until, is_active
        FROM storefront.coupon
        WHERE code = $1
        ",
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(Coupon::from))
}

/// Append a redemption record for an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn record_usage(
    conn: &mut PgConnection,
    coupon_id: CouponId,
    user_id: UserId,
    order_id: OrderId,
    discount_amount: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO storefront.coupon_usage (coupon_id, user_id, order_id, discount_amount)
        VALUES ($1, $2, $3, $4)
        ",
    )
    .bind(coupon_id)
    .bind(user_id)
    .bind(order_id)
    .bind(discount_amount)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
