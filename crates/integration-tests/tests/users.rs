//! Account and session tests.
//!
//! Run with: cargo test -p storekeep-integration-tests -- --ignored

#![allow(clippy::unwrap_used, clippy::expect_used)]

use reqwest::StatusCode;
use serde_json::json;

use storekeep_integration_tests::{
    TEST_PASSWORD, api_url, base_url, body, client, customer, unique_email,
};

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key("x-request-id"));
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_register_login_logout() {
    let email = unique_email();
    let client = client();

    let resp = client
        .post(api_url("/users/register"))
        .json(&json!({ "email": email.to_uppercase(), "password": TEST_PASSWORD, "name": "Ada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let user = body(resp).await;
    assert_eq!(user["data"]["email"], email);
    assert_eq!(user["data"]["role"], "customer");
    assert!(user["data"].get("passwordHash").is_none());

    let resp = client.get(api_url("/users/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client.post(api_url("/users/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client.get(api_url("/users/me")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = client
        .post(api_url("/users/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_duplicate_registration_conflicts() {
    let email = unique_email();
    let payload = json!({ "email": email, "password": TEST_PASSWORD, "name": "Ada" });

    let resp = client()
        .post(api_url("/users/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client()
        .post(api_url("/users/register"))
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body(resp).await["error"]["code"], "CONFLICT");
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_wrong_password_is_unauthorized() {
    let resp = client()
        .post(api_url("/users/login"))
        .json(&json!({ "email": unique_email(), "password": "nope-nope-nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running API server"]
async fn test_customers_cannot_list_users() {
    let client = customer().await;
    let resp = client.get(api_url("/users")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(body(resp).await["error"]["code"], "FORBIDDEN");
}
