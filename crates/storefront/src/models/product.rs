//! Catalog product.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use furnish_core::ProductId;

/// A product in the furniture catalog.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// Stock keeping unit, copied onto order items at checkout.
    pub sku: String,
    pub description: String,
    /// Current list price. Cart lines keep the price from when they were added.
    pub price: Decimal,
    /// Image file name served by the static asset host.
    pub image: Option<String>,
    pub category: Option<String>,
    pub company: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
