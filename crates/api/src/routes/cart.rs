//! Cart route handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use tracing::instrument;

use storekeep_core::ProductId;

use super::{ApiJson, ApiPath, Data};
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::CartView;
use crate::services::cart::CartService;
use crate::state::AppState;

/// Add-to-cart body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Set-quantity body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// The priced cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Data<CartView>> {
    let cart = CartService::new(state.pool(), state.pricing())
        .view(user.id)
        .await?;
    Ok(Data(cart))
}

/// Add units of a product.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(body): ApiJson<AddItemRequest>,
) -> Result<Data<CartView>> {
    let cart = CartService::new(state.pool(), state.pricing())
        .add(user.id, body.product_id, body.quantity)
        .await?;
    Ok(Data(cart))
}

/// Set the quantity of a line.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<UpdateItemRequest>,
) -> Result<Data<CartView>> {
    let cart = CartService::new(state.pool(), state.pricing())
        .update(user.id, product_id, body.quantity)
        .await?;
    Ok(Data(cart))
}

/// Remove a line.
#[instrument(skip_all, fields(user_id = %user.id, product_id = %product_id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiPath(product_id): ApiPath<ProductId>,
) -> Result<Data<CartView>> {
    let cart = CartService::new(state.pool(), state.pricing())
        .remove(user.id, product_id)
        .await?;
    Ok(Data(cart))
}

/// Empty the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<StatusCode> {
    CartService::new(state.pool(), state.pricing())
        .clear(user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
