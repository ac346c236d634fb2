//! Coupon types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use storekeep_core::{CouponCode, CouponId, CouponKind, CouponTerms, OrderTotals};

/// A stored coupon.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: CouponCode,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_usages: Option<i32>,
    /// Incremented on every successful application, never decremented.
    pub usage_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Coupon {
    /// The rule-bearing fields, for evaluation.
    #[must_use]
    pub fn terms(&self) -> CouponTerms {
        CouponTerms {
            kind: self.kind,
            discount: self.discount,
            min_order_amount: self.min_order_amount,
            max_usages: self.max_usages,
            usage_count: self.usage_count,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

/// A validated coupon to insert.
#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: CouponCode,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_usages: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// A validated partial coupon update. The outer `Option` means "leave
/// unchanged"; an inner `None` clears a nullable column.
#[derive(Debug, Clone, Default)]
pub struct CouponUpdate {
    pub kind: Option<CouponKind>,
    pub discount: Option<Decimal>,
    pub min_order_amount: Option<Option<Decimal>>,
    pub max_usages: Option<Option<i32>>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

/// Result of `POST /coupons/apply`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: CouponCode,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub totals: OrderTotals,
}
