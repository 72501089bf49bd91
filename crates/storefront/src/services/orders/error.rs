//! Order service error types.

use std::fmt;

use thiserror::Error;

use furnish_core::{CouponError, PricingError, StatusTransitionError};

use crate::db::RepositoryError;

/// Which of the order's addresses failed the ownership check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    Billing,
    Shipping,
}

impl fmt::Display for AddressKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Billing => write!(f, "Billing"),
            Self::Shipping => write!(f, "Shipping"),
        }
    }
}

/// Errors that can occur while placing or managing orders.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The user's cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The address does not exist or belongs to another user.
    #[error("{0} address not found")]
    AddressNotFound(AddressKind),

    /// No coupon has the given code.
    #[error("unknown coupon code")]
    InvalidCoupon,

    /// The coupon exists but does not apply to this cart today.
    #[error(transparent)]
    Coupon(#[from] CouponError),

    /// The order does not exist or is not visible to the caller.
    #[error("order not found")]
    NotFound,

    /// The customer tried to cancel an order that is already being fulfilled.
    #[error("order cannot be cancelled at this stage")]
    NotCancellable,

    /// An admin status change that goes backwards or leaves a terminal state.
    #[error(transparent)]
    InvalidTransition(#[from] StatusTransitionError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<PricingError> for OrderError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::EmptyCart => Self::EmptyCart,
            PricingError::Coupon(e) => Self::Coupon(e),
        }
    }
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}
