//! Coupon route handlers.

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use storekeep_core::{CouponCode, CouponId, CouponKind};

use super::{ApiJson, ApiPath, Created, Data, double_option};
use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{AppliedCoupon, Coupon, CouponUpdate, NewCoupon, session_keys};
use crate::services::coupons::CouponService;
use crate::state::AppState;
use crate::validation::FieldErrors;

/// Apply body.
#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// Create body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    pub code: String,
    pub kind: CouponKind,
    pub discount: Decimal,
    pub min_order_amount: Option<Decimal>,
    pub max_usages: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

/// Partial update body. `null` clears the optional limits.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub kind: Option<CouponKind>,
    pub discount: Option<Decimal>,
    #[serde(default, deserialize_with = "double_option")]
    pub min_order_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "double_option")]
    pub max_usages: Option<Option<i32>>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

impl CreateCouponRequest {
    fn validate(self) -> Result<NewCoupon> {
        let mut errors = FieldErrors::new();

        let code = CouponCode::parse(&self.code)
            .map_err(|e| errors.add("code", e.to_string()))
            .ok();
        let discount = discount(&mut errors, self.kind, self.discount);
        let min_order_amount = self
            .min_order_amount
            .map(|amount| errors.amount("minOrderAmount", amount));
        let max_usages = self.max_usages.map(|max| max_usages(&mut errors, max));

        errors.finish()?;
        let Some(code) = code else {
            return Err(crate::error::AppError::validation("Invalid coupon code"));
        };

        Ok(NewCoupon {
            code,
            kind: self.kind,
            discount,
            min_order_amount,
            max_usages,
            expires_at: self.expires_at,
            is_active: self.is_active,
        })
    }
}

impl UpdateCouponRequest {
    fn validate(self) -> Result<CouponUpdate> {
        let mut errors = FieldErrors::new();
        let update = CouponUpdate {
            kind: self.kind,
            discount: self
                .discount
                .map(|d| errors.positive_amount("discount", d)),
            min_order_amount: self
                .min_order_amount
                .map(|amount| amount.map(|a| errors.amount("minOrderAmount", a))),
            max_usages: self
                .max_usages
                .map(|max| max.map(|m| max_usages(&mut errors, m))),
            expires_at: self.expires_at,
            is_active: self.is_active,
        };
        errors.finish()?;
        Ok(update)
    }
}

fn discount(errors: &mut FieldErrors, kind: CouponKind, value: Decimal) -> Decimal {
    let value = errors.positive_amount("discount", value);
    if kind == CouponKind::Percentage && value > Decimal::ONE_HUNDRED {
        errors.add("discount", "percentage cannot exceed 100");
    }
    value
}

fn max_usages(errors: &mut FieldErrors, value: i32) -> i32 {
    if value < 0 {
        errors.add("maxUsages", "cannot be negative");
    }
    value
}

/// Apply a code to the caller's cart and count one use.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn apply(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ApiJson(body): ApiJson<ApplyCouponRequest>,
) -> Result<Data<AppliedCoupon>> {
    let applied = CouponService::new(state.pool(), state.pricing())
        .apply(user.id, &body.code)
        .await?;

    session
        .insert(session_keys::APPLIED_COUPON, &applied.code)
        .await?;

    Ok(Data(applied))
}

/// List coupons.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Data<Vec<Coupon>>> {
    let coupons = CouponService::new(state.pool(), state.pricing())
        .list()
        .await?;
    Ok(Data(coupons))
}

/// Create a coupon.
#[instrument(skip_all, fields(admin_id = %admin.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiJson(body): ApiJson<CreateCouponRequest>,
) -> Result<Created<Coupon>> {
    let coupon = body.validate()?;
    let coupon = CouponService::new(state.pool(), state.pricing())
        .create(&coupon)
        .await?;
    Ok(Created(coupon))
}

/// Update a coupon.
#[instrument(skip_all, fields(admin_id = %admin.id, coupon_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
    ApiJson(body): ApiJson<UpdateCouponRequest>,
) -> Result<Data<Coupon>> {
    let update = body.validate()?;
    let coupon = CouponService::new(state.pool(), state.pricing())
        .update(id, &update)
        .await?;
    Ok(Data(coupon))
}

/// Delete a coupon.
#[instrument(skip_all, fields(admin_id = %admin.id, coupon_id = %id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<CouponId>,
) -> Result<StatusCode> {
    CouponService::new(state.pool(), state.pricing())
        .delete(id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn create(json: &str) -> Result<NewCoupon> {
        serde_json::from_str::<CreateCouponRequest>(json)
            .unwrap()
            .validate()
    }

    #[test]
    fn test_create_normalizes_code() {
        let coupon = create(r#"{"code":"save10","kind":"percentage","discount":10}"#).unwrap();
        assert_eq!(coupon.code.as_str(), "SAVE10");
        assert!(coupon.is_active);
    }

    #[test]
    fn test_percentage_over_100_is_rejected() {
        let Err(AppError::Validation {
            fields: Some(fields),
            ..
        }) = create(r#"{"code":"HALF","kind":"percentage","discount":150}"#)
        else {
            panic!("expected field errors");
        };
        assert_eq!(fields.get("discount"), Some("percentage cannot exceed 100"));
    }

    #[test]
    fn test_fixed_over_100_is_fine() {
        assert!(create(r#"{"code":"BIG","kind":"fixed","discount":"150.00"}"#).is_ok());
    }

    #[test]
    fn test_amounts_beyond_column_range_are_rejected() {
        let Err(AppError::Validation {
            fields: Some(fields),
            ..
        }) = create(
            r#"{"code":"HUGE","kind":"fixed","discount":"100000000000","minOrderAmount":"100000000000"}"#,
        )
        else {
            panic!("expected field errors");
        };
        assert!(fields.get("discount").is_some());
        assert!(fields.get("minOrderAmount").is_some());
    }

    #[test]
    fn test_zero_discount_and_bad_code_are_reported_together() {
        let Err(AppError::Validation {
            fields: Some(fields),
            ..
        }) = create(r#"{"code":"no spaces","kind":"fixed","discount":0,"maxUsages":-1}"#)
        else {
            panic!("expected field errors");
        };
        assert!(fields.get("code").is_some());
        assert!(fields.get("discount").is_some());
        assert!(fields.get("maxUsages").is_some());
    }

    #[test]
    fn test_update_null_clears_limits() {
        let update: UpdateCouponRequest =
            serde_json::from_str(r#"{"maxUsages":null,"expiresAt":null}"#).unwrap();
        let update = update.validate().unwrap();
        assert_eq!(update.max_usages, Some(None));
        assert_eq!(update.expires_at, Some(None));
        assert_eq!(update.min_order_amount, None);
    }
}
