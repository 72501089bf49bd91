//! Monetary helpers using decimal arithmetic.
//!
//! All amounts are stored in the currency's standard unit (dollars, not cents)
//! as `NUMERIC(12, 2)` columns. Arithmetic keeps full decimal precision and
//! rounds to cents only where a value is persisted or displayed.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for persisted amounts.
pub const CENT_SCALE: u32 = 2;

/// Round an amount to whole cents, half away from zero.
///
/// ```
/// use furnish_core::round_cents;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_cents(Decimal::new(14_245, 3)), Decimal::new(1_425, 2));
/// assert_eq!(round_cents(Decimal::new(-5, 3)), Decimal::new(-1, 2));
/// ```
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cents_keeps_exact_values() {
        assert_eq!(round_cents(Decimal::new(13_099, 2)), Decimal::new(13_099, 2));
    }

    #[test]
    fn test_round_cents_rounds_midpoint_up() {
        assert_eq!(round_cents(Decimal::new(10_005, 3)), Decimal::new(1_001, 2));
    }

    #[test]
    fn test_round_cents_truncates_below_midpoint() {
        assert_eq!(round_cents(Decimal::new(100_049, 4)), Decimal::new(1_000, 2));
    }
}
