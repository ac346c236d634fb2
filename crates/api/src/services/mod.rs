//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `cart` - Cart mutations with stock checks
//! - `coupons` - Coupon application against the live cart
//! - `orders` - Checkout, cancellation and status changes

pub mod auth;
pub mod cart;
pub mod coupons;
pub mod orders;

use serde::Serialize;

use storekeep_core::ProductId;

/// A cart or order line asking for more units than are in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockShortage {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: u32,
    pub available: u32,
}

impl std::fmt::Display for StockShortage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "only {} of {} in stock, {} requested",
            self.available, self.product_name, self.requested
        )
    }
}
