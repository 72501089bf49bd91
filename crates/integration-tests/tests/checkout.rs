//! Order placement against a real database.
//!
//! These tests require a `PostgreSQL` database named by `TEST_DATABASE_URL`.
//!
//! Run with: cargo test -p furnish-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;

use furnish_core::{DiscountType, OrderId, UserRole};
use furnish_integration_tests::{TestContext, TestUser, decimal};

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// User with one address and two units of a 50.00 product in the cart.
async fn shopper_with_cart(ctx: &TestContext) -> (TestUser, furnish_core::AddressId) {
    let user = ctx.create_user(UserRole::User).await;
    let address = ctx.create_address(user.id).await;
    let product = ctx.create_product(money(5_000)).await;

    let response = ctx.add_to_cart(&user, product, 2, "walnut").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    (user, address)
}

fn order_id(body: &Value) -> OrderId {
    let id = body["order"]["id"].as_i64().expect("order id");
    OrderId::new(i32::try_from(id).expect("order id fits i32"))
}

// ============================================================================
// Pricing scenarios
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_without_coupon() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;

    let response = ctx.place_order(&user, address, None).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();

    assert_eq!(body["message"], "Order created successfully");
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(decimal(&body["order"]["total_amount"]), money(13_099));
    assert!(
        body["order"]["order_number"]
            .as_str()
            .unwrap()
            .starts_with("ORD-")
    );

    let (status, detail) = ctx
        .get_json(&format!("/api/orders/{}", order_id(&body)), &user)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&detail["subtotal"]), money(10_000));
    assert_eq!(decimal(&detail["tax_amount"]), money(1_500));
    assert_eq!(decimal(&detail["shipping_amount"]), money(1_599));
    assert_eq!(decimal(&detail["discount_amount"]), Decimal::ZERO);
    assert_eq!(detail["payment_status"], "pending");
    assert_eq!(detail["shipping_info"]["status"], "pending");
    assert_eq!(detail["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_with_capped_percentage_coupon() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let code = ctx
        .create_coupon(
            DiscountType::Percentage,
            Decimal::new(10, 0),
            money(5_000),
            Some(money(500)),
        )
        .await;

    let response = ctx.place_order(&user, address, Some(&code)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(decimal(&body["order"]["total_amount"]), money(12_524));

    let id = order_id(&body);
    let (_, detail) = ctx.get_json(&format!("/api/orders/{id}"), &user).await;
    assert_eq!(decimal(&detail["discount_amount"]), money(500));
    assert_eq!(decimal(&detail["tax_amount"]), money(1_425));

    assert_eq!(ctx.coupon_usage_count(id).await, 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_empty_cart_creates_no_order() {
    let ctx = TestContext::new().await;
    let user = ctx.create_user(UserRole::User).await;
    let address = ctx.create_address(user.id).await;

    let response = ctx.place_order(&user, address, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Cart is empty");

    assert_eq!(ctx.order_count(user.id).await, 0);
}

// ============================================================================
// Rejections leave no trace
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_unknown_coupon_creates_no_order() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;

    let response = ctx.place_order(&user, address, Some("NOPE-NOT-REAL")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired coupon code");

    assert_eq!(ctx.order_count(user.id).await, 0);
    assert_eq!(ctx.cart_line_count(user.id).await, 1, "cart is untouched");
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_coupon_below_minimum_creates_no_order() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let code = ctx
        .create_coupon(DiscountType::Fixed, money(2_500), money(50_000), None)
        .await;

    let response = ctx.place_order(&user, address, Some(&code)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.order_count(user.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_someone_elses_address_is_rejected() {
    let ctx = TestContext::new().await;
    let (user, _) = shopper_with_cart(&ctx).await;
    let stranger = ctx.create_user(UserRole::User).await;
    let foreign_address = ctx.create_address(stranger.id).await;

    let response = ctx.place_order(&user, foreign_address, None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Billing address not found");

    assert_eq!(ctx.order_count(user.id).await, 0);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_failed_shipping_write_rolls_back_everything() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let shipping = ctx
        .fail_writes(
            "order_shipping",
            "INSERT",
            &format!(
                "EXISTS (SELECT 1 FROM storefront.customer_order o \
                 WHERE o.id = NEW.order_id AND o.user_id = {})",
                user.id
            ),
        )
        .await;

    let response = ctx.place_order(&user, address, None).await;
    ctx.restore_writes(shipping).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Internal server error");

    assert_eq!(ctx.order_count(user.id).await, 0);
    assert_eq!(ctx.cart_line_count(user.id).await, 1, "cart is untouched");
}

// ============================================================================
// Side effects
// ============================================================================

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_housekeeping_failures_keep_the_order() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let code = ctx
        .create_coupon(
            DiscountType::Percentage,
            Decimal::new(10, 0),
            money(5_000),
            Some(money(500)),
        )
        .await;
    let usage = ctx
        .fail_writes("coupon_usage", "INSERT", &format!("NEW.user_id = {}", user.id))
        .await;
    let cart = ctx
        .fail_writes("cart_line", "DELETE", &format!("OLD.user_id = {}", user.id))
        .await;

    let response = ctx.place_order(&user, address, Some(&code)).await;
    ctx.restore_writes(usage).await;
    ctx.restore_writes(cart).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(decimal(&body["order"]["total_amount"]), money(12_524));

    let id = order_id(&body);
    assert_eq!(ctx.order_count(user.id).await, 1);
    assert_eq!(ctx.order_item_count(id).await, 1);
    assert_eq!(ctx.shipping_row_count(id).await, 1);
    assert_eq!(ctx.coupon_usage_count(id).await, 0);
    assert_eq!(ctx.cart_line_count(user.id).await, 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_cart_is_exhausted_by_placement() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;

    let first = ctx.place_order(&user, address, None).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    assert_eq!(ctx.cart_line_count(user.id).await, 0);

    let second = ctx.place_order(&user, address, None).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(ctx.order_count(user.id).await, 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_items_are_snapshots() {
    let ctx = TestContext::new().await;
    let user = ctx.create_user(UserRole::User).await;
    let address = ctx.create_address(user.id).await;
    let product = ctx.create_product(money(5_000)).await;
    ctx.add_to_cart(&user, product, 1, "oak").await;

    let body: Value = ctx
        .place_order(&user, address, None)
        .await
        .json()
        .await
        .unwrap();
    let id = order_id(&body);

    sqlx::query("UPDATE storefront.product SET price = 999.00, title = 'Renamed' WHERE id = $1")
        .bind(product)
        .execute(&ctx.pool)
        .await
        .unwrap();

    let (_, detail) = ctx.get_json(&format!("/api/orders/{id}"), &user).await;
    let item = &detail["items"][0];
    assert_eq!(decimal(&item["unit_price"]), money(5_000));
    assert_eq!(item["product_name"], "Test Armchair");
    assert_eq!(item["selected_color"], "oak");
    assert_eq!(decimal(&detail["total_amount"]), decimal(&body["order"]["total_amount"]));
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_reads_are_idempotent() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let body: Value = ctx
        .place_order(&user, address, None)
        .await
        .json()
        .await
        .unwrap();
    let path = format!("/api/orders/{}", order_id(&body));

    let (_, first) = ctx.get_json(&path, &user).await;
    let (_, second) = ctx.get_json(&path, &user).await;
    assert_eq!(first, second);

    let (status, list) = ctx.get_json("/api/orders", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_orders_are_private() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let body: Value = ctx
        .place_order(&user, address, None)
        .await
        .json()
        .await
        .unwrap();
    let stranger = ctx.create_user(UserRole::User).await;

    let (status, _) = ctx
        .get_json(&format!("/api/orders/{}", order_id(&body)), &stranger)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_concurrent_placement_yields_one_order() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;

    let (a, b, c) = tokio::join!(
        ctx.place_order(&user, address, None),
        ctx.place_order(&user, address, None),
        ctx.place_order(&user, address, None),
    );

    let created = [a.status(), b.status(), c.status()]
        .into_iter()
        .filter(|s| *s == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1);
    assert_eq!(ctx.order_count(user.id).await, 1);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_order_numbers_are_unique() {
    let ctx = TestContext::new().await;
    let mut numbers = Vec::new();

    for _ in 0..3 {
        let (user, address) = shopper_with_cart(&ctx).await;
        let body: Value = ctx
            .place_order(&user, address, None)
            .await
            .json()
            .await
            .unwrap();
        numbers.push(body["order"]["order_number"].as_str().unwrap().to_owned());
    }

    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), 3);
}

#[tokio::test]
#[ignore = "Requires TEST_DATABASE_URL"]
async fn test_body_user_must_match_token() {
    let ctx = TestContext::new().await;
    let (user, address) = shopper_with_cart(&ctx).await;
    let other = ctx.create_user(UserRole::User).await;

    let response = ctx
        .request(Method::POST, "/api/orders/create", &user)
        .json(&serde_json::json!({
            "userId": other.id,
            "billingAddressId": address,
            "shippingAddressId": address,
            "paymentMethod": "card",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(ctx.order_count(user.id).await, 0);
}
