//! Checkout and order lifecycle tests.
//!
//! These tests require a seeded database (`sk-cli seed`). Status changes
//! need `STOREKEEP_ADMIN_EMAIL` and `STOREKEEP_ADMIN_PASSWORD`.
//!
//! Run with: cargo test -p storekeep-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use storekeep_integration_tests::{
    add_to_cart, address, admin, api_url, body, customer, money, product_in_stock,
};

async fn checkout(client: &Client, coupon_code: Option<&str>) -> reqwest::Response {
    client
        .post(api_url("/orders"))
        .json(&json!({
            "shippingAddress": address(),
            "paymentMethod": "card",
            "couponCode": coupon_code,
        }))
        .send()
        .await
        .unwrap()
}

async fn stock_of(client: &Client, id: &Value) -> u64 {
    let resp = client
        .get(api_url(&format!("/products/{id}")))
        .send()
        .await
        .unwrap();
    body(resp).await["data"]["stock"].as_u64().unwrap()
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_checkout_with_applied_coupon() {
    let client = customer().await;
    let product = product_in_stock(&client, 2).await;
    let before = stock_of(&client, &product["id"]).await;

    add_to_cart(&client, &product["id"], 2).await;
    let resp = client
        .post(api_url("/coupons/apply"))
        .json(&json!({ "code": "WELCOME10" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = checkout(&client, Some("WELCOME10")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let order = body(resp).await["data"].clone();

    assert_eq!(order["status"], "pending");
    assert_eq!(order["paymentStatus"], "pending");
    assert_eq!(order["couponCode"], "WELCOME10");
    assert_eq!(order["billingAddress"], order["shippingAddress"]);
    assert_eq!(order["items"].as_array().unwrap().len(), 1);
    assert_eq!(order["items"][0]["unitPrice"], product["price"]);

    let subtotal = money(&order["subtotal"]);
    assert_eq!(subtotal, money(&product["price"]) * Decimal::from(2));
    assert_eq!(
        money(&order["total"]),
        subtotal - money(&order["discount"]) + money(&order["tax"]) + money(&order["shipping"])
    );

    assert_eq!(stock_of(&client, &product["id"]).await, before - 2);

    let cart = body(client.get(api_url("/cart")).send().await.unwrap()).await;
    assert_eq!(cart["data"]["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_checkout_empty_cart() {
    let client = customer().await;
    let resp = checkout(&client, None).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"]["code"], "EMPTY_CART");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_concurrent_checkouts_place_one_order() {
    let client = customer().await;
    let product = product_in_stock(&client, 2).await;
    add_to_cart(&client, &product["id"], 2).await;

    let (first, second) = tokio::join!(checkout(&client, None), checkout(&client, None));
    let mut statuses = [first.status(), second.status()];
    statuses.sort_unstable();
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let loser = if first.status() == StatusCode::BAD_REQUEST { first } else { second };
    assert_eq!(body(loser).await["error"]["code"], "EMPTY_CART");

    let orders = body(client.get(api_url("/orders")).send().await.unwrap()).await;
    assert_eq!(orders["data"]["items"].as_array().unwrap().len(), 1);
    assert_eq!(orders["data"]["total"], 1);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_checkout_validates_address() {
    let client = customer().await;
    let resp = client
        .post(api_url("/orders"))
        .json(&json!({
            "shippingAddress": { "fullName": "Nobody" },
            "paymentMethod": "card",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error = body(resp).await;
    assert_eq!(error["error"]["code"], "VALIDATION_ERROR");
    assert!(error["error"]["details"]["shippingAddress.line1"].is_string());
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cancel_restocks_once() {
    let client = customer().await;
    let product = product_in_stock(&client, 1).await;
    let before = stock_of(&client, &product["id"]).await;

    add_to_cart(&client, &product["id"], 1).await;
    let order = body(checkout(&client, None).await).await["data"].clone();
    let id = &order["id"];

    let resp = client
        .post(api_url(&format!("/orders/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["status"], "cancelled");
    assert_eq!(stock_of(&client, &product["id"]).await, before);

    let resp = client
        .post(api_url(&format!("/orders/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"]["code"], "INVALID_STATUS_TRANSITION");
    assert_eq!(stock_of(&client, &product["id"]).await, before);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_orders_are_private() {
    let owner = customer().await;
    let stranger = customer().await;
    let product = product_in_stock(&owner, 1).await;

    add_to_cart(&owner, &product["id"], 1).await;
    let order = body(checkout(&owner, None).await).await["data"].clone();
    let id = &order["id"];

    let resp = owner.get(api_url(&format!("/orders/{id}"))).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = stranger
        .get(api_url(&format!("/orders/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let list = body(stranger.get(api_url("/orders")).send().await.unwrap()).await;
    assert_eq!(list["data"]["total"], 0);

    let list = body(owner.get(api_url("/orders")).send().await.unwrap()).await;
    assert_eq!(list["data"]["items"][0]["id"], *id);
}

#[tokio::test]
#[ignore = "Requires running API server and admin credentials"]
async fn test_admin_status_lifecycle() {
    let Some(admin) = admin().await else {
        return;
    };
    let client = customer().await;
    let product = product_in_stock(&client, 1).await;
    add_to_cart(&client, &product["id"], 1).await;
    let order = body(checkout(&client, None).await).await["data"].clone();
    let url = api_url(&format!("/orders/{}/status", order["id"]));

    let resp = admin
        .patch(&url)
        .json(&json!({ "status": "delivered" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"]["code"], "INVALID_STATUS_TRANSITION");

    for status in ["processing", "shipped", "delivered"] {
        let resp = admin
            .patch(&url)
            .json(&json!({ "status": status }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(resp).await["data"]["status"], status);
    }

    let resp = admin
        .patch(&url)
        .json(&json!({ "paymentStatus": "paid" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["paymentStatus"], "paid");

    let resp = client.patch(&url).json(&json!({ "status": "cancelled" })).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}
