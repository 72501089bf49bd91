//! Core types for Furnish.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod order_number;
pub mod status;

pub use id::*;
pub use money::round_cents;
pub use order_number::{OrderNumber, OrderNumberError};
pub use status::*;
