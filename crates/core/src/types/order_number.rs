//! Customer-facing order number.

use core::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OrderNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderNumberError {
    /// The input does not start with `ORD-`.
    #[error("order number must start with {prefix}")]
    MissingPrefix {
        /// Expected prefix.
        prefix: &'static str,
    },
    /// The date segment is not a valid `YYYYMMDD` date.
    #[error("order number has an invalid date segment")]
    InvalidDate,
    /// The sequence segment is missing or not numeric.
    #[error("order number has an invalid sequence segment")]
    InvalidSequence,
}

/// A human-readable order number such as `ORD-20261017-000042`.
///
/// The sequence segment comes from a database sequence, so two orders never
/// share a number; the date segment only makes the number easier to read
/// over the phone. The storage layer also carries a UNIQUE constraint.
///
/// ## Examples
///
/// ```
/// use chrono::NaiveDate;
/// use furnish_core::OrderNumber;
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
/// let number = OrderNumber::from_sequence(date, 42);
/// assert_eq!(number.as_str(), "ORD-20261017-000042");
///
/// assert!(OrderNumber::parse("ORD-20261017-000042").is_ok());
/// assert!(OrderNumber::parse("INV-20261017-000042").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    /// Prefix shared by every order number.
    pub const PREFIX: &'static str = "ORD-";

    /// Minimum width of the zero-padded sequence segment.
    pub const SEQUENCE_WIDTH: usize = 6;

    /// Build an order number from the placement date and a sequence value.
    ///
    /// Sequences wider than [`Self::SEQUENCE_WIDTH`] digits are kept whole.
    #[must_use]
    pub fn from_sequence(placed_on: NaiveDate, sequence: i64) -> Self {
        Self(format!(
            "{}{}-{:0width$}",
            Self::PREFIX,
            placed_on.format("%Y%m%d"),
            sequence,
            width = Self::SEQUENCE_WIDTH
        ))
    }

    /// Parse an `OrderNumber` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix, date or sequence segment is malformed.
    pub fn parse(s: &str) -> Result<Self, OrderNumberError> {
        let rest = s
            .strip_prefix(Self::PREFIX)
            .ok_or(OrderNumberError::MissingPrefix {
                prefix: Self::PREFIX,
            })?;

        let (date, sequence) = rest
            .split_once('-')
            .ok_or(OrderNumberError::InvalidSequence)?;

        NaiveDate::parse_from_str(date, "%Y%m%d").map_err(|_| OrderNumberError::InvalidDate)?;

        if sequence.len() < Self::SEQUENCE_WIDTH || !sequence.chars().all(|c| c.is_ascii_digit())
        {
            return Err(OrderNumberError::InvalidSequence);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the order number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for OrderNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for OrderNumber {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for OrderNumber {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::parse(&s)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for OrderNumber {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()
    }

    #[test]
    fn test_from_sequence_pads_to_six_digits() {
        assert_eq!(
            OrderNumber::from_sequence(date(), 7).as_str(),
            "ORD-20260109-000007"
        );
    }

    #[test]
    fn test_from_sequence_keeps_wide_sequences() {
        assert_eq!(
            OrderNumber::from_sequence(date(), 12_345_678).as_str(),
            "ORD-20260109-12345678"
        );
    }

    #[test]
    fn test_distinct_sequences_never_collide() {
        let a = OrderNumber::from_sequence(date(), 1);
        let b = OrderNumber::from_sequence(date(), 2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_parse_roundtrips_generated_numbers() {
        let number = OrderNumber::from_sequence(date(), 99);
        assert_eq!(OrderNumber::parse(number.as_str()).unwrap(), number);
    }

    #[test]
    fn test_parse_missing_prefix() {
        assert!(matches!(
            OrderNumber::parse("20260109-000001"),
            Err(OrderNumberError::MissingPrefix { .. })
        ));
    }

    #[test]
    fn test_parse_invalid_date() {
        assert_eq!(
            OrderNumber::parse("ORD-20261341-000001"),
            Err(OrderNumberError::InvalidDate)
        );
    }

    #[test]
    fn test_parse_invalid_sequence() {
        assert_eq!(
            OrderNumber::parse("ORD-20260109-12ab"),
            Err(OrderNumberError::InvalidSequence)
        );
        assert_eq!(
            OrderNumber::parse("ORD-20260109"),
            Err(OrderNumberError::InvalidSequence)
        );
    }

    #[test]
    fn test_serde_is_transparent() {
        let number = OrderNumber::from_sequence(date(), 3);
        assert_eq!(
            serde_json::to_string(&number).unwrap(),
            "\"ORD-20260109-000003\""
        );
    }
}
