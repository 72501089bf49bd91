//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                      - Liveness
//! GET    /health/ready                - Database ping
//!
//! # Products (public)
//! GET    /api/products                - Product listing
//! GET    /api/products/{id}           - Product detail
//!
//! # Cart (bearer token)
//! GET    /api/cart                    - Lines and priced summary
//! DELETE /api/cart                    - Empty the cart
//! POST   /api/cart/add                - Add or merge a line
//! PUT    /api/cart/item/{id}          - Change quantity
//! DELETE /api/cart/item/{id}          - Remove a line
//! GET    /api/cart/count              - Line count
//!
//! # Orders (bearer token)
//! POST   /api/orders/create           - Place an order from the cart
//! GET    /api/orders                  - Order history
//! GET    /api/orders/{id}             - Order detail
//! PUT    /api/orders/{id}/cancel      - Customer cancellation
//! PUT    /api/orders/{id}/status      - Status update (admin)
//!
//! # Admin (admin token)
//! GET    /api/admin/users             - User listing
//! PATCH  /api/admin/users/{id}/role   - Change role
//! DELETE /api/admin/users/{id}        - Delete user
//! ```

pub mod admin;
pub mod cart;
pub mod extract;
pub mod health;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/add", post(cart::add))
        .route(
            "/item/{id}",
            put(cart::update_item).delete(cart::remove_item),
        )
        .route("/count", get(cart::count))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index))
        .route("/create", post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", put(orders::cancel))
        .route("/{id}/status", put(orders::update_status))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(admin::users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/role", patch(admin::set_role))
}

/// Create all API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
}

/// Build the application router with state attached.
///
/// Middleware (tracing, CORS, rate limiting, Sentry) is layered on by the
/// binary.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api", api_routes())
        .with_state(state)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use axum::response::Response;
    use secrecy::SecretString;
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use furnish_core::{PricingConfig, UserId, UserRole};

    use super::*;
    use crate::config::{AuthConfig, StorefrontConfig};

    fn test_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/furnish_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5000,
            auth: AuthConfig {
                jwt_secret: SecretString::from("router_test_signing_key_0123456789abcdef"),
                token_ttl_secs: 3600,
            },
            pricing: PricingConfig::default(),
            cors_origin: None,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        // Never connects: every request below is rejected before touching
        // the database.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/furnish_test")
            .unwrap();
        AppState::new(config, pool)
    }

    fn bearer(state: &AppState, user: i32, role: UserRole) -> String {
        let token = state.tokens().issue(UserId::new(user), role).unwrap();
        format!("Bearer {token}")
    }

    async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let body = match body {
            Some(body) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(body.to_owned())
            }
            None => Body::empty(),
        };

        router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let state = test_state();
        let response = send(&state, Method::GET, "/health", None, None).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cart_requires_token() {
        let state = test_state();
        let response = send(&state, Method::GET, "/api/cart", None, None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({ "error": "No token provided" }));
    }

    #[tokio::test]
    async fn test_bad_token_is_unauthorized() {
        let state = test_state();
        let response = send(
            &state,
            Method::GET,
            "/api/orders",
            Some("Bearer not.a.token"),
            None,
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid token" }));
    }

    #[tokio::test]
    async fn test_create_order_missing_fields() {
        let state = test_state();
        let auth = bearer(&state, 1, UserRole::User);
        let response = send(
            &state,
            Method::POST,
            "/api/orders/create",
            Some(&auth),
            Some(r#"{"paymentMethod":"card"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Missing required fields: billingAddressId, shippingAddressId" })
        );
    }

    #[tokio::test]
    async fn test_create_order_for_other_user_is_forbidden() {
        let state = test_state();
        let auth = bearer(&state, 1, UserRole::User);
        let response = send(
            &state,
            Method::POST,
            "/api/orders/create",
            Some(&auth),
            Some(
                r#"{"userId":2,"billingAddressId":1,"shippingAddressId":1,"paymentMethod":"card"}"#,
            ),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Cannot place orders for another user" })
        );
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let state = test_state();
        let auth = bearer(&state, 1, UserRole::User);
        let response = send(
            &state,
            Method::POST,
            "/api/cart/add",
            Some(&auth),
            Some("{not json"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid request body")
        );
    }

    #[tokio::test]
    async fn test_bad_path_parameter_is_bad_request() {
        let state = test_state();
        let auth = bearer(&state, 1, UserRole::User);
        let response = send(&state, Method::GET, "/api/orders/abc", Some(&auth), None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_admin_routes_reject_customers() {
        let state = test_state();
        let auth = bearer(&state, 1, UserRole::User);

        let response = send(&state, Method::GET, "/api/admin/users", Some(&auth), None).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "Admin access required" })
        );

        let response = send(
            &state,
            Method::PUT,
            "/api/orders/1/status",
            Some(&auth),
            Some(r#"{"order_status":"shipped"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_empty_status_update_is_bad_request() {
        let state = test_state();
        let auth = bearer(&state, 9, UserRole::Admin);
        let response = send(
            &state,
            Method::PUT,
            "/api/orders/1/status",
            Some(&auth),
            Some("{}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "No updates provided" })
        );
    }

    #[tokio::test]
    async fn test_invalid_role_is_bad_request() {
        let state = test_state();
        let auth = bearer(&state, 9, UserRole::Admin);
        let response = send(
            &state,
            Method::PATCH,
            "/api/admin/users/3/role",
            Some(&auth),
            Some(r#"{"role":"owner"}"#),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await, json!({ "error": "Invalid role" }));
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let state = test_state();
        let response = send(&state, Method::GET, "/api/nope", None, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
