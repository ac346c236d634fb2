//! Order repository.
//!
//! Orders are written once at checkout. Afterwards only `status`,
//! `payment_status` and `updated_at` change; item rows are immutable
//! snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use storekeep_core::{
    OrderId, OrderItemId, OrderStatus, PaymentMethod, PaymentStatus, ProductId, UserId,
};

use super::{RepositoryError, bind_i32, column_u32};
use crate::models::{Address, Order, OrderDraft, OrderItem, OrderSummary, Page, PageRequest};

const ORDER_COLUMNS: &str = "id, user_id, status, subtotal, discount, coupon_code, tax, \
     shipping, total, shipping_address, billing_address, payment_method, payment_status, \
     created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, product_name, unit_price, quantity, line_total";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: OrderStatus,
    subtotal: Decimal,
    discount: Decimal,
    coupon_code: Option<String>,
    tax: Decimal,
    shipping: Decimal,
    total: Decimal,
    shipping_address: Json<Address>,
    billing_address: Json<Address>,
    payment_method: PaymentMethod,
    payment_status: PaymentStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrderRow> for OrderSummary {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            subtotal: row.subtotal,
            discount: row.discount,
            coupon_code: row.coupon_code,
            tax: row.tax,
            shipping: row.shipping,
            total: row.total,
            shipping_address: row.shipping_address.0,
            billing_address: row.billing_address.0,
            payment_method: row.payment_method,
            payment_status: row.payment_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: OrderItemId,
    #[allow(dead_code)]
    order_id: OrderId,
    product_id: ProductId,
    product_name: String,
    unit_price: Decimal,
    quantity: i32,
    line_total: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = RepositoryError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            unit_price: row.unit_price,
            quantity: column_u32(row.quantity, "quantity")?,
            line_total: row.line_total,
        })
    }
}

/// Which orders a listing covers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderScope {
    /// Restrict to one customer. `None` lists every customer's orders.
    pub user_id: Option<UserId>,
    pub status: Option<OrderStatus>,
}

fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, scope: OrderScope) {
    builder.push(" WHERE TRUE");
    if let Some(user_id) = scope.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(status) = scope.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get an order with its items.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::get_in(&mut conn, id, false).await
    }

    /// Get an order with its items on an existing connection, optionally
    /// locking the order row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_in(
        conn: &mut PgConnection,
        id: OrderId,
        for_update: bool,
    ) -> Result<Option<Order>, RepositoryError> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM storekeep.order WHERE id = $1{lock}"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let items = Self::items_in(conn, id).await?;

        Ok(Some(Order {
            summary: row.into(),
            items,
        }))
    }

    async fn items_in(
        conn: &mut PgConnection,
        order_id: OrderId,
    ) -> Result<Vec<OrderItem>, RepositoryError> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM storekeep.order_item WHERE order_id = $1 ORDER BY id"
        ))
        .bind(order_id)
        .fetch_all(conn)
        .await?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    /// List order summaries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        scope: OrderScope,
        page: PageRequest,
    ) -> Result<Page<OrderSummary>, RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storekeep.order");
        push_scope(&mut count, scope);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {ORDER_COLUMNS} FROM storekeep.order"));
        push_scope(&mut select, scope);
        select.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        select.push_bind(page.sql_limit());
        select.push(" OFFSET ");
        select.push_bind(page.sql_offset());

        let rows: Vec<OrderRow> = select.build_query_as().fetch_all(self.pool).await?;

        Ok(Page::new(
            rows.into_iter().map(OrderSummary::from).collect(),
            page,
            total,
        ))
    }

    /// Update status and/or payment status.
    ///
    /// Lifecycle rules are enforced by the caller, which holds the row lock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn set_statuses(
        conn: &mut PgConnection,
        id: OrderId,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storekeep.order SET
                status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status)
        .bind(payment_status)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    // =========================================================================
    // Checkout (transaction-scoped)
    // =========================================================================

    /// Insert an order and its item snapshots.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if an insert fails.
    pub async fn insert(
        conn: &mut PgConnection,
        draft: &OrderDraft,
    ) -> Result<Order, RepositoryError> {
        let totals = &draft.totals;
        let row: OrderRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storekeep.order
                (user_id, subtotal, discount, coupon_code, tax, shipping, total,
                 shipping_address, billing_address, payment_method)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(draft.user_id)
        .bind(totals.subtotal)
        .bind(totals.discount)
        .bind(draft.coupon_code.as_ref().map(|code| code.as_str().to_owned()))
        .bind(totals.tax)
        .bind(totals.shipping)
        .bind(totals.total)
        .bind(Json(&draft.shipping_address))
        .bind(Json(&draft.billing_address))
        .bind(draft.payment_method)
        .fetch_one(&mut *conn)
        .await?;

        let mut items = Vec::with_capacity(draft.lines.len());
        for line in &draft.lines {
            let item: OrderItemRow = sqlx::query_as(&format!(
                r"
                INSERT INTO storekeep.order_item
                    (order_id, product_id, product_name, unit_price, quantity, line_total)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {ITEM_COLUMNS}
                "
            ))
            .bind(row.id)
            .bind(line.product_id)
            .bind(&line.product_name)
            .bind(line.unit_price)
            .bind(bind_i32(line.quantity, "quantity")?)
            .bind(storekeep_core::LineAmount::line_total(line))
            .fetch_one(&mut *conn)
            .await?;
            items.push(OrderItem::try_from(item)?);
        }

        Ok(Order {
            summary: row.into(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_sql_for_customer() {
        let scope = OrderScope {
            user_id: Some(UserId::new(7)),
            status: Some(OrderStatus::Shipped),
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storekeep.order");
        push_scope(&mut builder, scope);
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM storekeep.order WHERE TRUE AND user_id = $1 AND status = $2"
        );
    }

    #[test]
    fn test_scope_sql_for_admin() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM storekeep.order");
        push_scope(&mut builder, OrderScope::default());
        assert_eq!(builder.sql(), "SELECT COUNT(*) FROM storekeep.order WHERE TRUE");
    }
}
