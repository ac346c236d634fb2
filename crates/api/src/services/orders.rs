//! Order service: checkout, listing, cancellation and status changes.
//!
//! Checkout and every status change run in one transaction. Product rows
//! touched by a checkout and the order row being changed are locked with
//! `SELECT ... FOR UPDATE`, so stock cannot be oversold and two status
//! changes cannot interleave.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use thiserror::Error;

use storekeep_core::{
    CouponCode, CouponRejection, OrderId, OrderStatus, PaymentStatus, PricingPolicy,
    StatusTransitionError, UserId, pricing,
};

use super::StockShortage;
use crate::db::orders::OrderScope;
use crate::db::{CartRepository, CouponRepository, OrderRepository, ProductRepository, RepositoryError};
use crate::models::{
    CartLine, NewOrder, Order, OrderDraft, OrderLineDraft, OrderSummary, Page, PageRequest, User,
};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("insufficient stock: {0}")]
    InsufficientStock(StockShortage),

    #[error(transparent)]
    Coupon(#[from] CouponRejection),

    /// Unknown order, or one the caller may not see.
    #[error("order not found")]
    NotFound,

    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Who is acting on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl Actor {
    /// Admins see every order; customers only their own.
    #[must_use]
    pub fn may_access(&self, order: &OrderSummary) -> bool {
        self.is_admin || order.user_id == self.user_id
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            is_admin: user.is_admin(),
        }
    }
}

/// Order service.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    policy: &'a PricingPolicy,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: &'a PricingPolicy) -> Self {
        Self { pool, policy }
    }

    /// Turn the user's cart into an order.
    ///
    /// `counted_coupon` is the code whose use this user already counted via
    /// coupon application; it is not counted again. Any other code is
    /// evaluated in full and counted here.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart`, `OrderError::InsufficientStock` or
    /// `OrderError::Coupon` when the cart cannot be checked out.
    pub async fn place_order(
        &self,
        user_id: UserId,
        order: NewOrder,
        counted_coupon: Option<&CouponCode>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let lines = CartRepository::lock_lines(&mut tx, user_id).await?;
        if lines.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        for line in &lines {
            check_line(line)?;
        }

        let subtotal = pricing::subtotal(&lines);
        let discount = match &order.coupon_code {
            Some(code) => {
                let already_counted = counted_coupon == Some(code);
                redeem_coupon(&mut tx, code, subtotal, already_counted).await?
            }
            None => Decimal::ZERO,
        };
        let totals = self.policy.assemble(subtotal, discount);

        let draft = OrderDraft {
            user_id,
            lines: lines.into_iter().map(into_draft_line).collect(),
            totals,
            coupon_code: order.coupon_code,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            payment_method: order.payment_method,
        };

        let placed = OrderRepository::insert(&mut tx, &draft).await?;
        for line in &draft.lines {
            ProductRepository::take_stock(&mut tx, line.product_id, line.quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::Conflict(_) => OrderError::InsufficientStock(StockShortage {
                        product_id: line.product_id,
                        product_name: line.product_name.clone(),
                        requested: line.quantity,
                        available: 0,
                    }),
                    other => OrderError::Repository(other),
                })?;
        }
        CartRepository::clear_in(&mut tx, user_id).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %placed.summary.id,
            %user_id,
            total = %placed.summary.total,
            "order placed"
        );
        Ok(placed)
    }

    /// Orders visible to the actor, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` if the query fails.
    pub async fn list(
        &self,
        actor: Actor,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> Result<Page<OrderSummary>, OrderError> {
        let scope = OrderScope {
            user_id: (!actor.is_admin).then_some(actor.user_id),
            status,
        };
        Ok(OrderRepository::new(self.pool).list(scope, page).await?)
    }

    /// One order with its items.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` if the order does not exist or belongs
    /// to someone else.
    pub async fn get(&self, actor: Actor, id: OrderId) -> Result<Order, OrderError> {
        OrderRepository::new(self.pool)
            .get(id)
            .await?
            .filter(|order| actor.may_access(&order.summary))
            .ok_or(OrderError::NotFound)
    }

    /// Cancel an order and return its units to stock.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` unless the order is pending or
    /// processing.
    pub async fn cancel(&self, actor: Actor, id: OrderId) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_in(&mut tx, id, true)
            .await?
            .filter(|order| actor.may_access(&order.summary))
            .ok_or(OrderError::NotFound)?;

        let status = order.summary.status.transition_to(OrderStatus::Cancelled)?;
        OrderRepository::set_statuses(&mut tx, id, Some(status), None).await?;
        restock(&mut tx, &order).await?;

        let order = OrderRepository::get_in(&mut tx, id, false)
            .await?
            .ok_or(OrderError::NotFound)?;
        tx.commit().await?;

        tracing::info!(order_id = %id, user_id = %actor.user_id, "order cancelled");
        Ok(order)
    }

    /// Move an order through its lifecycle and/or change its payment status.
    ///
    /// Cancelling through here restocks exactly like [`cancel`](Self::cancel).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Transition` if the lifecycle forbids the move,
    /// `OrderError::NotFound` if the order does not exist.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_in(&mut tx, id, true)
            .await?
            .ok_or(OrderError::NotFound)?;

        let status = status
            .map(|next| order.summary.status.transition_to(next))
            .transpose()?;
        OrderRepository::set_statuses(&mut tx, id, status, payment_status).await?;
        if status == Some(OrderStatus::Cancelled) {
            restock(&mut tx, &order).await?;
        }

        let updated = OrderRepository::get_in(&mut tx, id, false)
            .await?
            .ok_or(OrderError::NotFound)?;
        tx.commit().await?;

        tracing::info!(
            order_id = %id,
            from = %order.summary.status,
            to = %updated.summary.status,
            payment_status = ?updated.summary.payment_status,
            "order status updated"
        );
        Ok(updated)
    }
}

/// Re-validate a cart line against its locked product row.
fn check_line(line: &CartLine) -> Result<(), OrderError> {
    if line.is_active && line.quantity <= line.stock {
        return Ok(());
    }
    Err(OrderError::InsufficientStock(StockShortage {
        product_id: line.product_id,
        product_name: line.name.clone(),
        requested: line.quantity,
        available: if line.is_active { line.stock } else { 0 },
    }))
}

fn into_draft_line(line: CartLine) -> OrderLineDraft {
    OrderLineDraft {
        product_id: line.product_id,
        product_name: line.name,
        unit_price: line.unit_price,
        quantity: line.quantity,
    }
}

/// Evaluate a coupon inside the checkout transaction and return the discount.
async fn redeem_coupon(
    conn: &mut PgConnection,
    code: &CouponCode,
    subtotal: Decimal,
    already_counted: bool,
) -> Result<Decimal, OrderError> {
    let coupon = CouponRepository::get_by_code_in(conn, code)
        .await?
        .ok_or(CouponRejection::Invalid)?;
    let terms = coupon.terms();
    let now = Utc::now();

    if already_counted {
        return Ok(terms.evaluate_counted(subtotal, now)?);
    }

    let discount = terms.evaluate(subtotal, now)?;
    if !CouponRepository::record_usage_in(conn, coupon.id).await? {
        return Err(CouponRejection::LimitReached.into());
    }
    Ok(discount)
}

async fn restock(conn: &mut PgConnection, order: &Order) -> Result<(), OrderError> {
    for item in &order.items {
        ProductRepository::restock(conn, item.product_id, item.quantity).await?;
    }
    Ok(())
}
