//! Checkout arithmetic: subtotal, coupon discount, tax, shipping and total.
//!
//! Everything here is pure. Callers load cart lines and the coupon record,
//! pass today's date, and get back either the totals to persist or the reason
//! the cart cannot be priced.
//!
//! # Rounding
//!
//! The subtotal is exact (unit prices are stored in cents). The discount is
//! rounded to cents before tax is computed on the discounted subtotal, so
//! every persisted component is a whole number of cents and
//! `total == subtotal - discount + tax + shipping` holds exactly.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{DiscountType, round_cents};

/// Default tax rate applied to the discounted subtotal (15%).
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Default flat shipping charge.
pub const DEFAULT_SHIPPING_FLAT_RATE: Decimal = Decimal::from_parts(1599, 0, 0, false, 2);

/// One cart line reduced to what pricing needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    /// Units in the line (always at least one).
    pub quantity: u32,
    /// Unit price captured when the line was added to the cart.
    pub unit_price: Decimal,
}

impl LineAmount {
    /// Create a line amount.
    #[must_use]
    pub const fn new(quantity: u32, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
        }
    }

    /// `quantity * unit_price`.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// The parts of a coupon record that decide validity and discount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponTerms {
    /// Percentage or fixed amount.
    pub discount_type: DiscountType,
    /// Percent (e.g. `10` for 10%) or currency amount depending on type.
    pub discount_value: Decimal,
    /// Smallest subtotal the coupon applies to (inclusive).
    pub minimum_order_amount: Decimal,
    /// Cap on percentage discounts. Ignored for fixed coupons.
    pub maximum_discount: Option<Decimal>,
    /// First day the coupon is valid.
    pub valid_from: NaiveDate,
    /// Last day the coupon is valid.
    pub valid_until: NaiveDate,
    /// Whether the coupon has been switched on.
    pub is_active: bool,
}

/// Why a coupon cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponError {
    /// The coupon has been switched off.
    #[error("coupon is not active")]
    Inactive,
    /// Today is before `valid_from`.
    #[error("coupon is not valid until {0}")]
    NotYetValid(NaiveDate),
    /// Today is after `valid_until`.
    #[error("coupon expired on {0}")]
    Expired(NaiveDate),
    /// Subtotal is below `minimum_order_amount`.
    #[error("order subtotal does not meet the coupon minimum of {minimum}")]
    BelowMinimum {
        /// Required minimum subtotal.
        minimum: Decimal,
    },
}

impl CouponTerms {
    /// Check that the coupon applies to a cart with this subtotal today.
    ///
    /// # Errors
    ///
    /// Returns the first failed condition: inactive, outside the validity
    /// window, or below the minimum order amount.
    pub fn check(&self, subtotal: Decimal, today: NaiveDate) -> Result<(), CouponError> {
        if !self.is_active {
            return Err(CouponError::Inactive);
        }
        if today < self.valid_from {
            return Err(CouponError::NotYetValid(self.valid_from));
        }
        if today > self.valid_until {
            return Err(CouponError::Expired(self.valid_until));
        }
        if subtotal < self.minimum_order_amount {
            return Err(CouponError::BelowMinimum {
                minimum: self.minimum_order_amount,
            });
        }
        Ok(())
    }

    /// Discount this coupon gives on `subtotal`, in cents, never more than
    /// the subtotal itself.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let raw = match self.discount_type {
            DiscountType::Percentage => {
                let pct = subtotal * self.discount_value / Decimal::ONE_HUNDRED;
                self.maximum_discount.map_or(pct, |cap| pct.min(cap))
            }
            DiscountType::Fixed => self.discount_value,
        };
        round_cents(raw.max(Decimal::ZERO).min(subtotal))
    }
}

/// Why a cart could not be priced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// There are no lines to price.
    #[error("cart is empty")]
    EmptyCart,
    /// The supplied coupon does not apply.
    #[error(transparent)]
    Coupon(#[from] CouponError),
}

/// Monetary totals of an order, each rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub total_amount: Decimal,
}

/// Market-level pricing rules.
///
/// There is a single tax rate and a single flat shipping tier. Both are
/// loaded from configuration so a new market does not need a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingConfig {
    /// Fraction of the discounted subtotal charged as tax (0.15 = 15%).
    pub tax_rate: Decimal,
    /// Shipping charged on every order regardless of contents.
    pub shipping_flat_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            shipping_flat_rate: DEFAULT_SHIPPING_FLAT_RATE,
        }
    }
}

impl PricingConfig {
    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(lines: &[LineAmount]) -> Decimal {
        lines.iter().map(LineAmount::total).sum()
    }

    /// Price a cart, optionally applying a coupon.
    ///
    /// # Errors
    ///
    /// Returns `PricingError::EmptyCart` when `lines` is empty and
    /// `PricingError::Coupon` when the coupon does not apply. An unusable
    /// coupon is an error rather than a zero discount.
    pub fn quote(
        &self,
        lines: &[LineAmount],
        coupon: Option<&CouponTerms>,
        today: NaiveDate,
    ) -> Result<OrderTotals, PricingError> {
        if lines.is_empty() {
            return Err(PricingError::EmptyCart);
        }

        let subtotal = round_cents(Self::subtotal(lines));

        let discount_amount = match coupon {
            Some(terms) => {
                terms.check(subtotal, today)?;
                terms.discount_for(subtotal)
            }
            None => Decimal::ZERO,
        };

        let tax_amount = round_cents((subtotal - discount_amount) * self.tax_rate);
        let shipping_amount = round_cents(self.shipping_flat_rate);
        let total_amount = subtotal - discount_amount + tax_amount + shipping_amount;

        Ok(OrderTotals {
            subtotal,
            discount_amount,
            tax_amount,
            shipping_amount,
            total_amount,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn dec(cents: i64) -> Decimal {
        Decimal::new(cents, 2)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn percentage_coupon(value: i64, minimum: i64, cap: Option<i64>) -> CouponTerms {
        CouponTerms {
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(value),
            minimum_order_amount: dec(minimum),
            maximum_discount: cap.map(dec),
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            is_active: true,
        }
    }

    fn two_chairs() -> Vec<LineAmount> {
        vec![LineAmount::new(2, dec(5_000))]
    }

    #[test]
    fn test_default_rates() {
        let config = PricingConfig::default();
        assert_eq!(config.tax_rate, dec(15));
        assert_eq!(config.shipping_flat_rate, dec(1_599));
    }

    #[test]
    fn test_quote_without_coupon() {
        let totals = PricingConfig::default()
            .quote(&two_chairs(), None, today())
            .unwrap();

        assert_eq!(totals.subtotal, dec(10_000));
        assert_eq!(totals.discount_amount, dec(0));
        assert_eq!(totals.tax_amount, dec(1_500));
        assert_eq!(totals.shipping_amount, dec(1_599));
        assert_eq!(totals.total_amount, dec(13_099));
    }

    #[test]
    fn test_quote_percentage_coupon_is_capped() {
        let coupon = percentage_coupon(10, 5_000, Some(500));
        let totals = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap();

        assert_eq!(totals.discount_amount, dec(500));
        assert_eq!(totals.tax_amount, dec(1_425));
        assert_eq!(totals.total_amount, dec(12_524));
    }

    #[test]
    fn test_quote_percentage_coupon_below_cap() {
        let coupon = percentage_coupon(10, 0, Some(5_000));
        let totals = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap();

        assert_eq!(totals.discount_amount, dec(1_000));
    }

    #[test]
    fn test_cap_never_exceeded() {
        let coupon = percentage_coupon(50, 0, Some(2_500));
        for price in [1_000, 4_999, 5_000, 99_999, 1_234_567] {
            let lines = [LineAmount::new(3, dec(price))];
            let totals = PricingConfig::default()
                .quote(&lines, Some(&coupon), today())
                .unwrap();
            assert!(totals.discount_amount <= dec(2_500), "price {price}");
        }
    }

    #[test]
    fn test_fixed_coupon_ignores_cap() {
        let coupon = CouponTerms {
            discount_type: DiscountType::Fixed,
            discount_value: dec(2_000),
            maximum_discount: Some(dec(500)),
            ..percentage_coupon(0, 0, None)
        };
        let totals = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap();

        assert_eq!(totals.discount_amount, dec(2_000));
        assert_eq!(totals.tax_amount, dec(1_200));
    }

    #[test]
    fn test_fixed_coupon_never_exceeds_subtotal() {
        let coupon = CouponTerms {
            discount_type: DiscountType::Fixed,
            discount_value: dec(50_000),
            ..percentage_coupon(0, 0, None)
        };
        let totals = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap();

        assert_eq!(totals.discount_amount, totals.subtotal);
        assert_eq!(totals.tax_amount, dec(0));
        assert_eq!(totals.total_amount, dec(1_599));
    }

    #[test]
    fn test_minimum_is_inclusive() {
        let coupon = percentage_coupon(10, 10_000, None);
        let totals = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap();
        assert_eq!(totals.discount_amount, dec(1_000));
    }

    #[test]
    fn test_below_minimum_rejected() {
        let coupon = percentage_coupon(10, 10_001, None);
        let err = PricingConfig::default()
            .quote(&two_chairs(), Some(&coupon), today())
            .unwrap_err();
        assert_eq!(
            err,
            PricingError::Coupon(CouponError::BelowMinimum {
                minimum: dec(10_001)
            })
        );
    }

    #[test]
    fn test_inactive_coupon_rejected() {
        let coupon = CouponTerms {
            is_active: false,
            ..percentage_coupon(10, 0, None)
        };
        assert_eq!(
            coupon.check(dec(10_000), today()),
            Err(CouponError::Inactive)
        );
    }

    #[test]
    fn test_validity_window_is_inclusive() {
        let coupon = CouponTerms {
            valid_from: today(),
            valid_until: today(),
            ..percentage_coupon(10, 0, None)
        };
        assert!(coupon.check(dec(100), today()).is_ok());

        let yesterday = today().pred_opt().unwrap();
        let tomorrow = today().succ_opt().unwrap();
        assert_eq!(
            coupon.check(dec(100), yesterday),
            Err(CouponError::NotYetValid(today()))
        );
        assert_eq!(
            coupon.check(dec(100), tomorrow),
            Err(CouponError::Expired(today()))
        );
    }

    #[test]
    fn test_empty_cart_rejected() {
        assert_eq!(
            PricingConfig::default().quote(&[], None, today()),
            Err(PricingError::EmptyCart)
        );
    }

    #[test]
    fn test_total_identity_without_coupon() {
        let config = PricingConfig::default();
        let carts: [&[LineAmount]; 4] = [
            &[LineAmount::new(1, dec(1))],
            &[LineAmount::new(3, dec(3_333))],
            &[LineAmount::new(1, dec(19_999)), LineAmount::new(7, dec(1_249))],
            &[LineAmount::new(12, dec(89_995))],
        ];

        for lines in carts {
            let totals = config.quote(lines, None, today()).unwrap();
            assert_eq!(
                totals.tax_amount,
                round_cents(totals.subtotal * config.tax_rate)
            );
            assert_eq!(totals.shipping_amount, config.shipping_flat_rate);
            assert_eq!(
                totals.total_amount,
                totals.subtotal + totals.tax_amount + totals.shipping_amount
            );
        }
    }

    #[test]
    fn test_custom_market_rates() {
        let config = PricingConfig {
            tax_rate: dec(20),
            shipping_flat_rate: dec(0),
        };
        let totals = config.quote(&two_chairs(), None, today()).unwrap();
        assert_eq!(totals.tax_amount, dec(2_000));
        assert_eq!(totals.total_amount, dec(12_000));
    }
}
