//! Domain models for the storefront API.
//!
//! These are the shapes handlers return and services pass around. Database
//! row types stay private to the `db` modules and convert into these.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod user;

pub use address::Address;
pub use cart::{AddToCart, CartItem, CartLine, CartSummary, CartView, CheckoutLine};
pub use order::{
    Order, OrderDetail, OrderItem, OrderSummary, PlaceOrder, PlacedOrder, ShippingInfo,
    StatusUpdate,
};
pub use product::Product;
pub use user::User;
