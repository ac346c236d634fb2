//! Core types for Storekeep.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{CURRENCY_SCALE, MAX_AMOUNT, MoneyError, parse_amount, round_cents, validate_amount};
pub use status::*;
