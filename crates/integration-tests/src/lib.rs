//! Integration tests for Furnish.
//!
//! # Running Tests
//!
//! ```bash
//! # Point at a scratch database; migrations are applied automatically
//! export TEST_DATABASE_URL=postgres://localhost/furnish_test
//!
//! cargo test -p furnish-integration-tests -- --ignored
//! ```
//!
//! Every test starts the storefront router in-process on an ephemeral port
//! and talks to it over HTTP. Fixtures use unique emails, SKUs and coupon
//! codes, so tests can share one database and run in parallel.

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use chrono::{Duration, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use furnish_core::{
    AddressId, CouponTerms, DiscountType, OrderId, PricingConfig, ProductId, UserId, UserRole,
};
use furnish_storefront::config::{AuthConfig, StorefrontConfig};
use furnish_storefront::db::products::NewProduct;
use furnish_storefront::db::{CouponRepository, MIGRATOR, ProductRepository, UserRepository};
use furnish_storefront::routes;
use furnish_storefront::state::AppState;

/// A user with a valid bearer token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: UserId,
    pub token: String,
}

/// A trigger installed by [`TestContext::fail_writes`].
#[derive(Debug)]
pub struct FailingWrite {
    name: String,
    table: String,
}

/// A running storefront backed by the test database.
pub struct TestContext {
    pub pool: PgPool,
    pub state: AppState,
    client: Client,
    base_url: String,
}

impl TestContext {
    /// Connect to `TEST_DATABASE_URL`, migrate, and serve the router.
    pub async fn new() -> Self {
        let database_url =
            std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");
        MIGRATOR
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        let state = AppState::new(test_config(&database_url), pool.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let app = routes::router(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            pool,
            state,
            client: Client::new(),
            base_url: format!("http://{addr}"),
        }
    }

    // =========================================================================
    // Fixtures
    // =========================================================================

    /// Create a user and sign a token for them.
    pub async fn create_user(&self, role: UserRole) -> TestUser {
        let email = format!("shopper-{}@example.test", Uuid::new_v4());
        let user = UserRepository::new(&self.pool)
            .create("Test", "Shopper", &email, role)
            .await
            .expect("Failed to create user");
        let token = self
            .state
            .tokens()
            .issue(user.id, role)
            .expect("Failed to sign token");

        TestUser { id: user.id, token }
    }

    /// Create an address owned by `user_id`.
    pub async fn create_address(&self, user_id: UserId) -> AddressId {
        sqlx::query_scalar::<_, AddressId>(
            r"
            INSERT INTO storefront.address
                (user_id, first_name, last_name, address_line1, city, state, postal_code, country)
            VALUES ($1, 'Test', 'Shopper', '1 Main St', 'Springfield', 'IL', '62701', 'US')
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to create address")
    }

    /// Create a product with a unique SKU at `price`.
    pub async fn create_product(&self, price: Decimal) -> ProductId {
        let sku = format!("TEST-{}", Uuid::new_v4());
        ProductRepository::new(&self.pool)
            .upsert_by_sku(&NewProduct {
                title: "Test Armchair",
                sku: &sku,
                description: "Integration test product",
                price,
                image: Some("armchair.jpg"),
                category: Some("Chairs"),
                company: None,
            })
            .await
            .expect("Failed to create product")
            .id
    }

    /// Create an active coupon valid today and return its code.
    pub async fn create_coupon(
        &self,
        discount_type: DiscountType,
        discount_value: Decimal,
        minimum_order_amount: Decimal,
        maximum_discount: Option<Decimal>,
    ) -> String {
        let today = Utc::now().date_naive();
        let code = format!("T{}", Uuid::new_v4().simple()).to_uppercase();
        let terms = CouponTerms {
            discount_type,
            discount_value,
            minimum_order_amount,
            maximum_discount,
            valid_from: today - Duration::days(1),
            valid_until: today + Duration::days(30),
            is_active: true,
        };
        CouponRepository::new(&self.pool)
            .upsert(&code, &terms)
            .await
            .expect("Failed to create coupon");
        code
    }

    // =========================================================================
    // HTTP
    // =========================================================================

    /// Start a request to `path` authenticated as `user`.
    pub fn request(&self, method: Method, path: &str, user: &TestUser) -> RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&user.token)
    }

    /// Add `quantity` of `product_id` in `color` to the user's cart.
    pub async fn add_to_cart(
        &self,
        user: &TestUser,
        product_id: ProductId,
        quantity: u32,
        color: &str,
    ) -> Response {
        self.request(Method::POST, "/api/cart/add", user)
            .json(&serde_json::json!({
                "productId": product_id,
                "quantity": quantity,
                "color": color,
            }))
            .send()
            .await
            .expect("add to cart request failed")
    }

    /// Place an order, optionally with a coupon.
    pub async fn place_order(
        &self,
        user: &TestUser,
        address_id: AddressId,
        coupon_code: Option<&str>,
    ) -> Response {
        self.request(Method::POST, "/api/orders/create", user)
            .json(&serde_json::json!({
                "billingAddressId": address_id,
                "shippingAddressId": address_id,
                "paymentMethod": "card",
                "couponCode": coupon_code,
            }))
            .send()
            .await
            .expect("place order request failed")
    }

    /// GET `path` as `user` and decode the JSON body.
    pub async fn get_json(&self, path: &str, user: &TestUser) -> (reqwest::StatusCode, Value) {
        let response = self
            .request(Method::GET, path, user)
            .send()
            .await
            .expect("GET request failed");
        let status = response.status();
        let body = response.json().await.expect("Response is not JSON");
        (status, body)
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Make row writes to `table` fail for as long as the trigger exists.
    ///
    /// `event` is `INSERT`, `UPDATE` or `DELETE`; `condition` is a PL/pgSQL
    /// boolean over `NEW`/`OLD` that selects the rows to reject, so the
    /// failure stays scoped to one test's fixtures.
    pub async fn fail_writes(&self, table: &str, event: &str, condition: &str) -> FailingWrite {
        let name = format!("fail_{}", Uuid::new_v4().simple());

        sqlx::query(&format!(
            r"
            CREATE FUNCTION storefront.{name}() RETURNS trigger LANGUAGE plpgsql AS $$
            BEGIN
                IF {condition} THEN
                    RAISE EXCEPTION 'write to {table} rejected by test trigger';
                END IF;
                IF TG_OP = 'DELETE' THEN
                    RETURN OLD;
                END IF;
                RETURN NEW;
            END
            $$
            "
        ))
        .execute(&self.pool)
        .await
        .expect("Failed to create trigger function");

        sqlx::query(&format!(
            "CREATE TRIGGER {name} BEFORE {event} ON storefront.{table} \
             FOR EACH ROW EXECUTE FUNCTION storefront.{name}()"
        ))
        .execute(&self.pool)
        .await
        .expect("Failed to create trigger");

        FailingWrite {
            name,
            table: table.to_owned(),
        }
    }

    /// Remove a trigger created by [`Self::fail_writes`].
    pub async fn restore_writes(&self, failing: FailingWrite) {
        sqlx::query(&format!(
            "DROP TRIGGER IF EXISTS {} ON storefront.{}",
            failing.name, failing.table
        ))
        .execute(&self.pool)
        .await
        .expect("Failed to drop trigger");

        sqlx::query(&format!("DROP FUNCTION IF EXISTS storefront.{}()", failing.name))
            .execute(&self.pool)
            .await
            .expect("Failed to drop trigger function");
    }

    // =========================================================================
    // Direct reads
    // =========================================================================

    /// Number of orders the user has.
    pub async fn order_count(&self, user_id: UserId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storefront.customer_order WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count orders")
    }

    /// Number of lines in the user's cart.
    pub async fn cart_line_count(&self, user_id: UserId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storefront.cart_line WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count cart lines")
    }

    /// Number of item snapshots on an order.
    pub async fn order_item_count(&self, order_id: OrderId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storefront.order_item WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count order items")
    }

    /// Number of shipping rows on an order.
    pub async fn shipping_row_count(&self, order_id: OrderId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storefront.order_shipping WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count shipping rows")
    }

    /// Number of recorded uses of a coupon on an order.
    pub async fn coupon_usage_count(&self, order_id: OrderId) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storefront.coupon_usage WHERE order_id = $1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count coupon usage")
    }
}

/// Read a decimal that was serialized as a JSON string.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .expect("money is serialized as a string")
        .parse()
        .expect("money is a decimal")
}

fn test_config(database_url: &str) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from(database_url.to_owned()),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 0,
        auth: AuthConfig {
            jwt_secret: SecretString::from("integration_test_signing_key_9f8e7d6c5b4a"),
            token_ttl_secs: 3600,
        },
        pricing: PricingConfig::default(),
        cors_origin: None,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}
