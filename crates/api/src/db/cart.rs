//! Cart repository.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use storekeep_core::{ProductId, UserId};

use super::{RepositoryError, bind_i32, column_u32};
use crate::models::CartLine;

const CART_LINE_QUERY: &str = r"
    SELECT c.product_id, p.name, p.price AS unit_price, c.quantity,
           p.image_url, p.stock, p.is_active
    FROM storekeep.cart_item c
    JOIN storekeep.product p ON p.id = c.product_id
    WHERE c.user_id = $1
    ORDER BY c.created_at, c.id
";

#[derive(sqlx::FromRow)]
struct CartLineRow {
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
    image_url: Option<String>,
    stock: i32,
    is_active: bool,
}

impl TryFrom<CartLineRow> for CartLine {
    type Error = RepositoryError;

    fn try_from(row: CartLineRow) -> Result<Self, Self::Error> {
        let quantity = column_u32(row.quantity, "quantity")?;
        Ok(Self {
            product_id: row.product_id,
            name: row.name,
            unit_price: row.unit_price,
            quantity,
            line_total: row.unit_price * Decimal::from(quantity),
            image_url: row.image_url,
            stock: column_u32(row.stock, "stock")?,
            is_active: row.is_active,
        })
    }
}

fn into_lines(rows: Vec<CartLineRow>) -> Result<Vec<CartLine>, RepositoryError> {
    rows.into_iter().map(CartLine::try_from).collect()
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current cart lines with live product prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, user_id: UserId) -> Result<Vec<CartLine>, RepositoryError> {
        let rows: Vec<CartLineRow> = sqlx::query_as(CART_LINE_QUERY)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;
        into_lines(rows)
    }

    /// Quantity of a product already in the cart, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> Result<Option<u32>, RepositoryError> {
        let quantity: Option<i32> = sqlx::query_scalar(
            "SELECT quantity FROM storekeep.cart_item WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        quantity.map(|q| column_u32(q, "quantity")).transpose()
    }

    /// Insert a line or overwrite its quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the upsert fails.
    pub async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO storekeep.cart_item (user_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = now()
            ",
        )
        .bind(user_id)
        .bind(product_id)
        .bind(bind_i32(quantity, "quantity")?)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product is not in the cart.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storekeep.cart_item WHERE user_id = $1 AND product_id = $2",
        )
        .bind(user_id)
        .bind(product_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::clear_in(&mut conn, user_id).await
    }

    // =========================================================================
    // Checkout (transaction-scoped)
    // =========================================================================

    /// Cart lines with both cart and product rows locked until the
    /// transaction ends.
    ///
    /// The owning user row is locked first, so concurrent checkouts of the
    /// same cart run one after the other and the later one reads the cart
    /// as the earlier one left it.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist, or
    /// `RepositoryError::Database` if a query fails.
    pub async fn lock_lines(
        conn: &mut PgConnection,
        user_id: UserId,
    ) -> Result<Vec<CartLine>, RepositoryError> {
        sqlx::query_scalar::<_, UserId>(
            "SELECT id FROM storekeep.user WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let rows: Vec<CartLineRow> =
            sqlx::query_as(&format!("{CART_LINE_QUERY} FOR UPDATE OF c, p"))
                .bind(user_id)
                .fetch_all(&mut *conn)
                .await?;
        into_lines(rows)
    }

    /// Empty the cart inside a transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear_in(conn: &mut PgConnection, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storekeep.cart_item WHERE user_id = $1")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(())
    }
}
