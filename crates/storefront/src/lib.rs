//! Furnish storefront library.
//!
//! JSON API for the Furnish furniture shop: catalog, cart, checkout, order
//! history and admin order management. The binary in `main.rs` wires these
//! modules into an axum server; tests and the CLI use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
