//! Storekeep Core - Shared domain types and pricing rules.
//!
//! This crate provides the types and arithmetic used across all Storekeep
//! components:
//! - `api` - REST API for products, carts, coupons, orders, and users
//! - `cli` - Command-line tools for migrations, seeding, and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Every place that prices a cart or an order goes through
//! [`pricing`], so there is exactly one implementation of the checkout math.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, money, and statuses
//! - [`pricing`] - Subtotal, tax, shipping, and order total assembly
//! - [`coupon`] - Coupon codes and discount evaluation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod coupon;
pub mod pricing;
pub mod types;

pub use coupon::{CouponCode, CouponCodeError, CouponKind, CouponRejection, CouponTerms};
pub use pricing::{LineAmount, OrderTotals, PricingPolicy};
pub use types::*;
