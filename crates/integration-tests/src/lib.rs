//! Integration tests for the Storekeep API.
//!
//! Every test talks HTTP to a running server and is `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! sk-cli migrate && sk-cli seed
//! cargo run -p storekeep-api &
//!
//! # Admin tests also need a promoted account:
//! #   sk-cli admin promote -e $STOREKEEP_ADMIN_EMAIL
//! cargo test -p storekeep-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `STOREKEEP_API_URL` - Server root (default: `http://localhost:3000`)
//! - `STOREKEEP_ADMIN_EMAIL` / `STOREKEEP_ADMIN_PASSWORD` - Admin account

use std::str::FromStr;

use reqwest::{Client, Response, StatusCode};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use uuid::Uuid;

/// Password used for every throwaway account.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Server root, without the `/api/v1` prefix.
#[must_use]
pub fn base_url() -> String {
    std::env::var("STOREKEEP_API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Full URL for an `/api/v1` path.
#[must_use]
pub fn api_url(path: &str) -> String {
    format!("{}/api/v1{path}", base_url())
}

/// A client that keeps the session cookie between requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
#[allow(clippy::expect_used)]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Unique throwaway email address.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.com", Uuid::new_v4().simple())
}

/// Register a fresh customer and return a client holding its session.
///
/// # Panics
///
/// Panics if registration fails.
#[allow(clippy::expect_used)]
pub async fn customer() -> Client {
    let client = client();
    let resp = client
        .post(api_url("/users/register"))
        .json(&json!({
            "email": unique_email(),
            "password": TEST_PASSWORD,
            "name": "Integration Tester",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);
    client
}

/// Log in as the configured admin, or `None` when no admin is configured.
///
/// # Panics
///
/// Panics if the credentials are set but login fails.
#[allow(clippy::expect_used)]
pub async fn admin() -> Option<Client> {
    let email = std::env::var("STOREKEEP_ADMIN_EMAIL").ok()?;
    let password = std::env::var("STOREKEEP_ADMIN_PASSWORD").ok()?;

    let client = client();
    let resp = client
        .post(api_url("/users/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await
        .expect("Failed to log in as admin");
    assert_eq!(resp.status(), StatusCode::OK, "admin login failed");
    Some(client)
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn body(resp: Response) -> Value {
    resp.json().await.expect("Response body is not JSON")
}

/// Read a money field, which the API serializes as a decimal string.
///
/// # Panics
///
/// Panics if the value is not a decimal string.
#[must_use]
#[allow(clippy::expect_used)]
pub fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| Decimal::from_str(s).ok())
        .expect("Money values are decimal strings")
}

/// The first active product with at least `min_stock` units.
///
/// # Panics
///
/// Panics if the catalog has no such product (run `sk-cli seed`).
#[allow(clippy::expect_used)]
pub async fn product_in_stock(client: &Client, min_stock: u64) -> Value {
    let resp = client
        .get(api_url("/products?sort=name&limit=100"))
        .send()
        .await
        .expect("Failed to list products");
    assert_eq!(resp.status(), StatusCode::OK);

    body(resp).await["data"]["items"]
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .find(|p| p["stock"].as_u64().is_some_and(|s| s >= min_stock))
                .cloned()
        })
        .expect("No product in stock; run `sk-cli seed`")
}

/// Put `quantity` units of a product in the cart.
///
/// # Panics
///
/// Panics if the request fails.
#[allow(clippy::expect_used)]
pub async fn add_to_cart(client: &Client, product_id: &Value, quantity: u32) -> Response {
    client
        .post(api_url("/cart/items"))
        .json(&json!({ "productId": product_id, "quantity": quantity }))
        .send()
        .await
        .expect("Failed to add to cart")
}

/// A complete shipping address.
#[must_use]
pub fn address() -> Value {
    json!({
        "fullName": "Integration Tester",
        "line1": "1 Test Street",
        "city": "Springfield",
        "state": "OR",
        "postalCode": "97477",
        "country": "US",
    })
}
