//! Seed the catalog from a YAML file.
//!
//! Products are upserted by SKU and coupons by code, so the command can be
//! re-run after editing the file.
//!
//! ```yaml
//! products:
//!   - title: Avant-Garde Lamp
//!     sku: LAMP-001
//!     description: Brass floor lamp
//!     price: "179.99"
//!     category: Lighting
//! coupons:
//!   - code: WELCOME10
//!     discount_type: percentage
//!     discount_value: "10"
//!     minimum_order_amount: "50"
//!     maximum_discount: "100"
//!     valid_from: 2026-01-01
//!     valid_until: 2026-12-31
//!     is_active: true
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use furnish_core::CouponTerms;
use furnish_storefront::db::products::NewProduct;
use furnish_storefront::db::{CouponRepository, ProductRepository};

use super::{CommandError, connect};

/// Default seed file, relative to the workspace root.
pub const DEFAULT_CATALOG: &str = "crates/cli/data/catalog.yaml";

#[derive(Debug, Deserialize)]
struct Catalog {
    #[serde(default)]
    products: Vec<SeedProduct>,
    #[serde(default)]
    coupons: Vec<SeedCoupon>,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    title: String,
    sku: String,
    #[serde(default)]
    description: String,
    price: Decimal,
    image: Option<String>,
    category: Option<String>,
    company: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedCoupon {
    code: String,
    #[serde(flatten)]
    terms: CouponTerms,
}

impl SeedProduct {
    fn as_new(&self) -> NewProduct<'_> {
        NewProduct {
            title: &self.title,
            sku: &self.sku,
            description: &self.description,
            price: self.price,
            image: self.image.as_deref(),
            category: self.category.as_deref(),
            company: self.company.as_deref(),
        }
    }
}

/// Parse a catalog and reject entries the database would refuse.
fn parse_catalog(content: &str) -> Result<Catalog, CommandError> {
    let catalog: Catalog = serde_yaml::from_str(content)
        .map_err(|e| CommandError::Invalid(format!("Invalid catalog file: {e}")))?;

    let mut errors = Vec::new();
    for product in &catalog.products {
        if product.sku.trim().is_empty() {
            errors.push(format!("product '{}' has an empty sku", product.title));
        }
        if product.price < Decimal::ZERO {
            errors.push(format!("product '{}' has a negative price", product.sku));
        }
    }
    for coupon in &catalog.coupons {
        if coupon.terms.valid_until < coupon.terms.valid_from {
            errors.push(format!("coupon '{}' ends before it starts", coupon.code));
        }
        if coupon.terms.discount_value <= Decimal::ZERO {
            errors.push(format!("coupon '{}' has no discount", coupon.code));
        }
    }

    if errors.is_empty() {
        Ok(catalog)
    } else {
        for err in &errors {
            tracing::error!("  - {err}");
        }
        Err(CommandError::Invalid(format!(
            "{} validation errors found",
            errors.len()
        )))
    }
}

/// Seed products and coupons from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is missing or invalid, or a write fails.
pub async fn catalog(file_path: &str) -> Result<(), CommandError> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(CommandError::Invalid(format!("File not found: {file_path}")));
    }

    info!(path = %file_path, "Loading catalog");
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CommandError::Invalid(format!("Cannot read {file_path}: {e}")))?;
    let catalog = parse_catalog(&content)?;

    let pool = connect().await?;

    let products = ProductRepository::new(&pool);
    for product in &catalog.products {
        let saved = products.upsert_by_sku(&product.as_new()).await?;
        info!(id = %saved.id, sku = %saved.sku, "Product seeded");
    }

    let coupons = CouponRepository::new(&pool);
    for coupon in &catalog.coupons {
        let saved = coupons.upsert(&coupon.code, &coupon.terms).await?;
        let redeemed = coupons.usage_count(saved.id).await?;
        info!(id = %saved.id, code = %saved.code, redeemed, "Coupon seeded");
    }

    info!("Seeding complete!");
    info!("  Products: {}", catalog.products.len());
    info!("  Coupons: {}", catalog.coupons.len());
    Ok(())
}
