//! Order route handlers: checkout, history, cancellation, status changes.

use axum::extract::State;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use storekeep_core::{
    CouponCode, CouponRejection, OrderId, OrderStatus, PaymentMethod, PaymentStatus,
};

use super::{ApiJson, ApiPath, ApiQuery, Created, Data, PageQuery};
use crate::error::{AppError, Result};
use crate::middleware::{RequireAccount, RequireAdmin, RequireAuth};
use crate::models::{Address, NewOrder, Order, OrderSummary, Page, session_keys};
use crate::services::orders::{Actor, OrderService};
use crate::state::AppState;
use crate::validation::FieldErrors;

const MAX_ADDRESS_FIELD_LENGTH: usize = 200;

/// Address as submitted; validated into [`Address`].
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressInput {
    pub full_name: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressInput {
    fn validate(&self, prefix: &str, errors: &mut FieldErrors) -> Address {
        let mut text = |field: &str, value: &str| {
            errors.text(&format!("{prefix}.{field}"), value, MAX_ADDRESS_FIELD_LENGTH)
        };
        let full_name = text("fullName", &self.full_name);
        let line1 = text("line1", &self.line1);
        let city = text("city", &self.city);
        let state = text("state", &self.state);
        let postal_code = text("postalCode", &self.postal_code);
        let country = text("country", &self.country);
        let line2 = errors.optional_text(
            &format!("{prefix}.line2"),
            self.line2.as_deref(),
            MAX_ADDRESS_FIELD_LENGTH,
        );

        Address {
            full_name,
            line1,
            line2,
            city,
            state,
            postal_code,
            country,
        }
    }
}

/// Checkout body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub shipping_address: AddressInput,
    pub billing_address: Option<AddressInput>,
    pub payment_method: PaymentMethod,
    pub coupon_code: Option<String>,
}

impl CheckoutRequest {
    fn validate(self) -> Result<NewOrder> {
        let mut errors = FieldErrors::new();
        let shipping_address = self.shipping_address.validate("shippingAddress", &mut errors);
        let billing_address = self
            .billing_address
            .map(|address| address.validate("billingAddress", &mut errors));
        errors.finish()?;

        // A code that cannot exist is reported like an unknown one.
        let coupon_code = self
            .coupon_code
            .filter(|code| !code.trim().is_empty())
            .map(|code| CouponCode::parse(&code))
            .transpose()
            .map_err(|_| AppError::Coupon(CouponRejection::Invalid))?;

        Ok(NewOrder {
            billing_address: billing_address.unwrap_or_else(|| shipping_address.clone()),
            shipping_address,
            payment_method: self.payment_method,
            coupon_code,
        })
    }
}

/// Order listing query.
#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Admin status change body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Check out the caller's cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Result<Created<Order>> {
    let order = body.validate()?;
    let counted = session
        .get::<CouponCode>(session_keys::APPLIED_COUPON)
        .await?;

    let placed = OrderService::new(state.pool(), state.pricing())
        .place_order(user.id, order, counted.as_ref())
        .await?;

    session
        .remove::<CouponCode>(session_keys::APPLIED_COUPON)
        .await?;

    Ok(Created(placed))
}

/// The caller's orders, or every order for admins.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireAccount(user): RequireAccount,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> Result<Data<Page<OrderSummary>>> {
    let mut errors = FieldErrors::new();
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .validate(&mut errors);
    errors.finish()?;

    let orders = OrderService::new(state.pool(), state.pricing())
        .list(Actor::from(&user), query.status, page)
        .await?;
    Ok(Data(orders))
}

/// One order with its items.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAccount(user): RequireAccount,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Data<Order>> {
    let order = OrderService::new(state.pool(), state.pricing())
        .get(Actor::from(&user), id)
        .await?;
    Ok(Data(order))
}

/// Cancel a pending or processing order.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireAccount(user): RequireAccount,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Data<Order>> {
    let order = OrderService::new(state.pool(), state.pricing())
        .cancel(Actor::from(&user), id)
        .await?;
    Ok(Data(order))
}

/// Change lifecycle and/or payment status.
#[instrument(skip_all, fields(admin_id = %admin.id, order_id = %id))]
pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<UpdateStatusRequest>,
) -> Result<Data<Order>> {
    if body.status.is_none() && body.payment_status.is_none() {
        return Err(AppError::validation(
            "Provide status and/or paymentStatus",
        ));
    }

    let order = OrderService::new(state.pool(), state.pricing())
        .update_status(id, body.status, body.payment_status)
        .await?;
    Ok(Data(order))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SHIPPING: &str = r#"{
        "fullName": "Ada Lovelace",
        "line1": "12 St James's Square",
        "city": "London",
        "state": "LDN",
        "postalCode": "SW1Y 4JH",
        "country": "GB"
    }"#;

    fn checkout(json: &str) -> Result<NewOrder> {
        serde_json::from_str::<CheckoutRequest>(json)
            .unwrap()
            .validate()
    }

    #[test]
    fn test_billing_defaults_to_shipping() {
        let order = checkout(&format!(
            r#"{{"shippingAddress":{SHIPPING},"paymentMethod":"card"}}"#
        ))
        .unwrap();
        assert_eq!(order.billing_address, order.shipping_address);
        assert_eq!(order.shipping_address.line2, None);
        assert!(order.coupon_code.is_none());
    }

    #[test]
    fn test_missing_address_fields_are_reported_with_prefix() {
        let Err(AppError::Validation {
            fields: Some(fields),
            ..
        }) = checkout(
            r#"{"shippingAddress":{"fullName":"Ada"},"billingAddress":{"city":" "},"paymentMethod":"paypal"}"#,
        )
        else {
            panic!("expected field errors");
        };
        assert_eq!(fields.get("shippingAddress.line1"), Some("is required"));
        assert_eq!(fields.get("billingAddress.city"), Some("is required"));
        assert!(fields.get("shippingAddress.fullName").is_none());
    }

    #[test]
    fn test_coupon_code_is_normalized() {
        let order = checkout(&format!(
            r#"{{"shippingAddress":{SHIPPING},"paymentMethod":"cash_on_delivery","couponCode":" save10 "}}"#
        ))
        .unwrap();
        assert_eq!(order.coupon_code.unwrap().as_str(), "SAVE10");
    }

    #[test]
    fn test_malformed_coupon_code_is_invalid_coupon() {
        let err = checkout(&format!(
            r#"{{"shippingAddress":{SHIPPING},"paymentMethod":"card","couponCode":"not a code!"}}"#
        ))
        .unwrap_err();
        assert_eq!(err.code(), "INVALID_COUPON");
    }

    #[test]
    fn test_blank_coupon_code_is_ignored() {
        let order = checkout(&format!(
            r#"{{"shippingAddress":{SHIPPING},"paymentMethod":"card","couponCode":""}}"#
        ))
        .unwrap();
        assert!(order.coupon_code.is_none());
    }
}
