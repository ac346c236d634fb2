//! Coupon service.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;

use storekeep_core::{
    CouponCode, CouponId, CouponKind, CouponRejection, PricingPolicy, UserId, pricing,
};

use crate::db::{CartRepository, CouponRepository, RepositoryError};
use crate::models::{AppliedCoupon, Coupon, CouponUpdate, NewCoupon};

/// Errors from coupon operations.
#[derive(Debug, Error)]
pub enum CouponError {
    #[error(transparent)]
    Rejected(#[from] CouponRejection),

    /// Coupons only apply to a non-empty cart.
    #[error("cart is empty")]
    EmptyCart,

    #[error("coupon not found")]
    NotFound,

    #[error("coupon code already exists")]
    DuplicateCode,

    /// A percentage coupon would discount more than 100%.
    #[error("percentage cannot exceed 100")]
    PercentageTooLarge,

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CouponError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(_) => Self::DuplicateCode,
            other => Self::Repository(other),
        }
    }
}

/// Coupon service.
pub struct CouponService<'a> {
    coupons: CouponRepository<'a>,
    cart: CartRepository<'a>,
    policy: &'a PricingPolicy,
}

impl<'a> CouponService<'a> {
    /// Create a new coupon service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: &'a PricingPolicy) -> Self {
        Self {
            coupons: CouponRepository::new(pool),
            cart: CartRepository::new(pool),
            policy,
        }
    }

    /// Apply a code to the user's current cart.
    ///
    /// The subtotal is recomputed from the live cart. On success the
    /// coupon's usage is counted; it is never given back.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Rejected` with the first failed rule,
    /// `CouponError::EmptyCart` when there is nothing to discount.
    pub async fn apply(&self, user_id: UserId, code: &str) -> Result<AppliedCoupon, CouponError> {
        let code = CouponCode::parse(code).map_err(|_| CouponRejection::Invalid)?;
        let coupon = self
            .coupons
            .get_by_code(&code)
            .await?
            .ok_or(CouponRejection::Invalid)?;

        let lines = self.cart.lines(user_id).await?;
        if lines.is_empty() {
            return Err(CouponError::EmptyCart);
        }
        let subtotal = pricing::subtotal(&lines);

        let discount = coupon.terms().evaluate(subtotal, Utc::now())?;

        if !self.coupons.record_usage(coupon.id).await? {
            return Err(CouponRejection::LimitReached.into());
        }
        tracing::info!(%user_id, code = %coupon.code, %discount, "coupon applied");

        Ok(AppliedCoupon {
            code: coupon.code,
            kind: coupon.kind,
            discount,
            totals: self.policy.assemble(subtotal, discount),
        })
    }

    /// All coupons.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, CouponError> {
        Ok(self.coupons.list().await?)
    }

    /// Create a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::DuplicateCode` if the code is taken.
    pub async fn create(&self, coupon: &NewCoupon) -> Result<Coupon, CouponError> {
        let coupon = self.coupons.create(coupon).await?;
        tracing::info!(code = %coupon.code, "coupon created");
        Ok(coupon)
    }

    /// Update a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` if the coupon does not exist,
    /// `CouponError::PercentageTooLarge` if the resulting percentage exceeds 100.
    pub async fn update(&self, id: CouponId, update: &CouponUpdate) -> Result<Coupon, CouponError> {
        if update.kind.is_some() || update.discount.is_some() {
            let current = self.coupons.get(id).await?.ok_or(CouponError::NotFound)?;
            let kind = update.kind.unwrap_or(current.kind);
            let discount = update.discount.unwrap_or(current.discount);
            if kind == CouponKind::Percentage && discount > Decimal::ONE_HUNDRED {
                return Err(CouponError::PercentageTooLarge);
            }
        }

        let coupon = self.coupons.update(id, update).await?;
        tracing::info!(code = %coupon.code, "coupon updated");
        Ok(coupon)
    }

    /// Delete a coupon.
    ///
    /// # Errors
    ///
    /// Returns `CouponError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), CouponError> {
        self.coupons.delete(id).await?;
        tracing::info!(coupon_id = %id, "coupon deleted");
        Ok(())
    }
}
