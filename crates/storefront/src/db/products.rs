//! Product catalog queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use furnish_core::ProductId;

use super::RepositoryError;
use crate::models::Product;

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    sku: String,
    description: String,
    price: Decimal,
    image: Option<String>,
    category: Option<String>,
    company: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            sku: row.sku,
            description: row.description,
            price: row.price,
            image: row.image,
            category: row.category,
            company: row.company,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for catalog reads.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every product in the catalog, ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, sku, description, price, image, category, company,
                   created_at, updated_at
            FROM storefront.product
            ORDER BY id
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, title, sku, description, price, image, category, company,
                   created_at, updated_at
            FROM storefront.product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Insert or update a product keyed by SKU. Used by catalog seeding.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_by_sku(&self, product: &NewProduct<'_>) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.product (title, sku, description, price, image, category, company)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (sku) DO UPDATE
            SET title = EXCLUDED.title,
                description = EXCLUDED.description,
                price = EXCLUDED.price,
                image = EXCLUDED.image,
                category = EXCLUDED.category,
                company = EXCLUDED.company,
                updated_at = NOW()
            RETURNING id, title, sku, description, price, image, category, company,
                      created_at, updated_at
            ",
        )
        .bind(product.title)
        .bind(product.sku)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image)
        .bind(product.category)
        .bind(product.company)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }
}

/// Catalog entry to insert or refresh.
#[derive(Debug, Clone, Copy)]
pub struct NewProduct<'a> {
    pub title: &'a str,
    pub sku: &'a str,
    pub description: &'a str,
    pub price: Decimal,
    pub image: Option<&'a str>,
    pub category: Option<&'a str>,
    pub company: Option<&'a str>,
}
