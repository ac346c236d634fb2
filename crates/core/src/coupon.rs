//! Coupon codes and discount evaluation.
//!
//! Evaluation is pure: the caller looks the coupon up, recomputes the cart
//! subtotal from live rows, and hands both to [`CouponTerms::evaluate`]. Usage
//! counting is the caller's side effect.

use chrono::{DateTime, Utc};
use core::fmt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_cents;

/// Errors for a malformed coupon code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponCodeError {
    #[error("coupon code cannot be empty")]
    Empty,
    #[error("coupon code must be at most {max} characters")]
    TooLong { max: usize },
    #[error("coupon code may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// A normalized coupon code.
///
/// Codes are case-insensitive: parsing trims and uppercases, and codes are
/// stored uppercase, so lookups compare normalized values.
///
/// ```
/// use storekeep_core::CouponCode;
///
/// let code = CouponCode::parse(" save10 ").unwrap();
/// assert_eq!(code.as_str(), "SAVE10");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    /// Maximum length of a coupon code.
    pub const MAX_LENGTH: usize = 64;

    /// Parse and normalize a coupon code.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponCodeError`] if the code is empty, too long, or has
    /// characters outside `[A-Za-z0-9_-]`.
    pub fn parse(s: &str) -> Result<Self, CouponCodeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CouponCodeError::Empty);
        }
        if trimmed.len() > Self::MAX_LENGTH {
            return Err(CouponCodeError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CouponCodeError::InvalidCharacter);
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the normalized code.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self {
        code.0
    }
}

/// How a coupon's `discount` value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storekeep.coupon_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// `discount` is a percentage of the subtotal, in `(0, 100]`.
    Percentage,
    /// `discount` is an amount of money, capped at the subtotal.
    Fixed,
}

/// Why a coupon cannot be applied.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CouponRejection {
    /// Unknown code, or the coupon has been deactivated.
    #[error("Invalid coupon code")]
    Invalid,
    #[error("Coupon has expired")]
    Expired,
    #[error("Coupon usage limit reached")]
    LimitReached,
    #[error("Minimum order amount of {required} not met")]
    MinOrderNotMet { required: Decimal, subtotal: Decimal },
}

impl CouponRejection {
    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Invalid => "INVALID_COUPON",
            Self::Expired => "COUPON_EXPIRED",
            Self::LimitReached => "COUPON_LIMIT_REACHED",
            Self::MinOrderNotMet { .. } => "MIN_ORDER_NOT_MET",
        }
    }
}

/// The rule-bearing part of a coupon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponTerms {
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_usages: Option<i32>,
    pub usage_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl CouponTerms {
    /// Whether another application would exceed `max_usages`.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.max_usages
            .is_some_and(|max| self.usage_count >= max)
    }

    /// Whether the coupon had expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires < now)
    }

    /// Check the coupon against a live subtotal and compute the discount.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// inactive, expired, usage limit, minimum order.
    ///
    /// # Errors
    ///
    /// Returns the [`CouponRejection`] for the first failed check.
    pub fn evaluate(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Invalid);
        }
        if self.is_expired_at(now) {
            return Err(CouponRejection::Expired);
        }
        if self.is_exhausted() {
            return Err(CouponRejection::LimitReached);
        }
        self.check_minimum(subtotal)?;

        Ok(self.discount_for(subtotal))
    }

    /// Like [`evaluate`](Self::evaluate) for a coupon whose application has
    /// already been counted in `usage_count`, so the usage limit is not
    /// checked again.
    ///
    /// # Errors
    ///
    /// Returns the [`CouponRejection`] for the first failed check.
    pub fn evaluate_counted(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.is_active {
            return Err(CouponRejection::Invalid);
        }
        if self.is_expired_at(now) {
            return Err(CouponRejection::Expired);
        }
        self.check_minimum(subtotal)?;

        Ok(self.discount_for(subtotal))
    }

    fn check_minimum(&self, subtotal: Decimal) -> Result<(), CouponRejection> {
        match self.min_order_amount {
            Some(required) if subtotal < required => {
                Err(CouponRejection::MinOrderNotMet { required, subtotal })
            }
            _ => Ok(()),
        }
    }

    /// Discount for a subtotal, ignoring eligibility. Never negative and never
    /// more than the subtotal.
    #[must_use]
    pub fn discount_for(&self, subtotal: Decimal) -> Decimal {
        let subtotal = subtotal.max(Decimal::ZERO);
        let raw = match self.kind {
            CouponKind::Percentage => {
                round_cents(subtotal * self.discount / Decimal::ONE_HUNDRED)
            }
            CouponKind::Fixed => self.discount,
        };
        raw.clamp(Decimal::ZERO, subtotal)
    }
}
