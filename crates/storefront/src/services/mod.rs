//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Bearer token issue and verification
//! - `cart` - Cart operations scoped to the shopper
//! - `orders` - Checkout, order history and status changes

pub mod auth;
pub mod cart;
pub mod orders;

pub use auth::{AuthError, Claims, TokenService};
pub use cart::{CartError, CartService};
pub use orders::{OrderError, OrderService};
