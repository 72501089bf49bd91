//! Furnish Core - Shared types and pricing rules.
//!
//! This crate provides the domain types used across all Furnish components:
//! - `storefront` - JSON API consumed by the single-page storefront
//! - `cli` - Command-line tools for migrations, seeding and tokens
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Checkout arithmetic lives here so it can be tested without
//! a database and reused by the cart summary and the order flow alike.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money helpers, statuses and order numbers
//! - [`pricing`] - Cart totals, coupon validation and tax/shipping rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{
    CouponError, CouponTerms, LineAmount, OrderTotals, PricingConfig, PricingError,
};
pub use types::*;
