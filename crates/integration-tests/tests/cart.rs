//! Cart tests.
//!
//! These tests require a seeded catalog (`sk-cli seed`).
//!
//! Run with: cargo test -p storekeep-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use storekeep_integration_tests::{
    add_to_cart, api_url, body, client, customer, money, product_in_stock,
};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cart_requires_login() {
    let resp = client().get(api_url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(resp).await["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_add_merges_and_prices() {
    let client = customer().await;
    let product = product_in_stock(&client, 3).await;
    let price = money(&product["price"]);

    assert_eq!(add_to_cart(&client, &product["id"], 1).await.status(), StatusCode::OK);
    let resp = add_to_cart(&client, &product["id"], 2).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cart = body(resp).await;
    let items = cart["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 3);
    assert_eq!(cart["data"]["itemCount"], 3);

    let totals = &cart["data"]["totals"];
    let subtotal = money(&totals["subtotal"]);
    assert_eq!(subtotal, price * Decimal::from(3));
    let expected_shipping = if subtotal >= Decimal::from(100) {
        Decimal::ZERO
    } else {
        Decimal::new(999, 2)
    };
    assert_eq!(money(&totals["shipping"]), expected_shipping);
    assert_eq!(money(&totals["discount"]), Decimal::ZERO);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_update_remove_and_clear() {
    let client = customer().await;
    let product = product_in_stock(&client, 2).await;
    let id = &product["id"];

    add_to_cart(&client, id, 1).await;

    let resp = client
        .put(api_url(&format!("/cart/items/{id}")))
        .json(&json!({ "quantity": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["items"][0]["quantity"], 2);

    let resp = client
        .put(api_url(&format!("/cart/items/{id}")))
        .json(&json!({ "quantity": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body(resp).await["error"]["code"], "VALIDATION_ERROR");

    let resp = client
        .delete(api_url(&format!("/cart/items/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body(resp).await["data"]["items"].as_array().unwrap().len(), 0);

    let resp = client
        .delete(api_url(&format!("/cart/items/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    add_to_cart(&client, id, 1).await;
    let resp = client.delete(api_url("/cart")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_cannot_exceed_stock() {
    let client = customer().await;
    let product = product_in_stock(&client, 1).await;
    let stock = u32::try_from(product["stock"].as_u64().unwrap()).unwrap();

    let resp = add_to_cart(&client, &product["id"], stock + 1).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error = body(resp).await;
    assert_eq!(error["error"]["code"], "INSUFFICIENT_STOCK");
    assert_eq!(error["error"]["details"]["productId"], product["id"]);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_unknown_product_is_not_found() {
    let client = customer().await;
    let resp = add_to_cart(&client, &json!(i64::MAX), 1).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
