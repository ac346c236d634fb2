//! HTTP route handlers for the API.
//!
//! # Route Structure (under `/api/v1`)
//!
//! ```text
//! # Users
//! POST   /users/register            - Create account, start session
//! POST   /users/login               - Start session
//! POST   /users/logout              - End session
//! GET    /users/me                  - Current user
//! GET    /users                     - List users (admin)
//!
//! # Products
//! GET    /products                  - Filtered, sorted, paginated listing
//! GET    /products/{id}             - Product detail
//! POST   /products                  - Create (admin)
//! PUT    /products/{id}             - Partial update (admin)
//! DELETE /products/{id}             - Deactivate (admin)
//!
//! # Cart
//! GET    /cart                      - Priced cart
//! POST   /cart/items                - Add units
//! PUT    /cart/items/{productId}    - Set quantity
//! DELETE /cart/items/{productId}    - Remove line
//! DELETE /cart                      - Clear cart
//!
//! # Coupons
//! POST   /coupons/apply             - Apply a code to the cart
//! GET    /coupons                   - List (admin)
//! POST   /coupons                   - Create (admin)
//! PUT    /coupons/{id}              - Partial update (admin)
//! DELETE /coupons/{id}              - Delete (admin)
//!
//! # Orders
//! POST   /orders                    - Checkout
//! GET    /orders                    - Own orders, or all for admins
//! GET    /orders/{id}               - Order detail
//! POST   /orders/{id}/cancel        - Cancel and restock
//! PATCH  /orders/{id}/status        - Lifecycle / payment status (admin)
//! ```
//!
//! Successful bodies are wrapped as `{ "data": ... }`; errors use the
//! envelope in [`crate::error`].

pub mod cart;
pub mod coupons;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;
use crate::models::PageRequest;
use crate::models::page::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::state::AppState;
use crate::validation::FieldErrors;

// =============================================================================
// Envelopes and extractors
// =============================================================================

/// `200 OK` with `{ "data": ... }`.
pub struct Data<T>(pub T);

/// `201 Created` with `{ "data": ... }`.
pub struct Created<T>(pub T);

#[derive(Serialize)]
struct DataEnvelope<T> {
    data: T,
}

impl<T: Serialize> IntoResponse for Data<T> {
    fn into_response(self) -> Response {
        Json(DataEnvelope { data: self.0 }).into_response()
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(DataEnvelope { data: self.0 })).into_response()
    }
}

/// JSON body extractor that rejects with the API error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

/// Path extractor that rejects with the API error envelope.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates. Use with `#[serde(default)]`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// `page` and `limit` query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// Validate into a [`PageRequest`], recording problems in `errors`.
    pub fn validate(&self, errors: &mut FieldErrors) -> PageRequest {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            errors.add("page", "must be at least 1");
        }
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            errors.add("limit", format!("must be between 1 and {MAX_LIMIT}"));
        }
        PageRequest { page, limit }
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route("/logout", post(users::logout))
        .route("/me", get(users::me))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list).post(products::create))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).delete(cart::clear))
        .route("/items", post(cart::add))
        .route(
            "/items/{product_id}",
            put(cart::update).delete(cart::remove),
        )
}

/// Create the coupon routes router.
pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(coupons::list).post(coupons::create))
        .route("/apply", post(coupons::apply))
        .route("/{id}", put(coupons::update).delete(coupons::delete))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list).post(orders::create))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancel", post(orders::cancel))
        .route("/{id}/status", axum::routing::patch(orders::update_status))
}

/// Create all `/api/v1` routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/users", user_routes())
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .nest("/coupons", coupon_routes())
        .nest("/orders", order_routes())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        image_url: Option<Option<String>>,
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.image_url, None);

        let null: Patch = serde_json::from_str(r#"{"image_url":null}"#).unwrap();
        assert_eq!(null.image_url, Some(None));

        let set: Patch = serde_json::from_str(r#"{"image_url":"a.png"}"#).unwrap();
        assert_eq!(set.image_url, Some(Some("a.png".to_string())));
    }

    #[test]
    fn test_page_query_defaults_and_bounds() {
        let mut errors = FieldErrors::new();
        let page = PageQuery::default().validate(&mut errors);
        assert_eq!(page, PageRequest::default());
        assert!(errors.is_empty());

        let mut errors = FieldErrors::new();
        PageQuery {
            page: Some(0),
            limit: Some(101),
        }
        .validate(&mut errors);
        assert!(errors.get("page").is_some());
        assert!(errors.get("limit").is_some());
    }
}
