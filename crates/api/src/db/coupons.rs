//! Coupon repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use storekeep_core::{CouponCode, CouponId, CouponKind};

use super::RepositoryError;
use crate::models::{Coupon, CouponUpdate, NewCoupon};

const COUPON_COLUMNS: &str = "id, code, kind, discount, min_order_amount, max_usages, \
     usage_count, expires_at, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct CouponRow {
    id: CouponId,
    code: String,
    kind: CouponKind,
    discount: Decimal,
    min_order_amount: Option<Decimal>,
    max_usages: Option<i32>,
    usage_count: i32,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = RepositoryError;

    fn try_from(row: CouponRow) -> Result<Self, Self::Error> {
        let code = CouponCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid coupon code in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            code,
            kind: row.kind,
            discount: row.discount,
            min_order_amount: row.min_order_amount,
            max_usages: row.max_usages,
            usage_count: row.usage_count,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for coupon database operations.
pub struct CouponRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CouponRepository<'a> {
    /// Create a new coupon repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a coupon by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CouponId) -> Result<Option<Coupon>, RepositoryError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {COUPON_COLUMNS} FROM storekeep.coupon WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// Look a coupon up by normalized code.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::get_by_code_in(&mut conn, code).await
    }

    /// Look a coupon up by normalized code on an existing connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_code_in(
        conn: &mut PgConnection,
        code: &CouponCode,
    ) -> Result<Option<Coupon>, RepositoryError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            "SELECT {COUPON_COLUMNS} FROM storekeep.coupon WHERE code = $1"
        ))
        .bind(code.as_str())
        .fetch_optional(conn)
        .await?;

        row.map(Coupon::try_from).transpose()
    }

    /// All coupons, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Coupon>, RepositoryError> {
        let rows: Vec<CouponRow> = sqlx::query_as(&format!(
            "SELECT {COUPON_COLUMNS} FROM storekeep.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Coupon::try_from).collect()
    }

    /// Insert a coupon.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, coupon: &NewCoupon) -> Result<Coupon, RepositoryError> {
        let row: CouponRow = sqlx::query_as(&format!(
            r"
            INSERT INTO storekeep.coupon
                (code, kind, discount, min_order_amount, max_usages, expires_at, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(coupon.code.as_str())
        .bind(coupon.kind)
        .bind(coupon.discount)
        .bind(coupon.min_order_amount)
        .bind(coupon.max_usages)
        .bind(coupon.expires_at)
        .bind(coupon.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "coupon code"))?;

        Coupon::try_from(row)
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn update(&self, id: CouponId, update: &CouponUpdate) -> Result<Coupon, RepositoryError> {
        let row: Option<CouponRow> = sqlx::query_as(&format!(
            r"
            UPDATE storekeep.coupon SET
                kind = COALESCE($2, kind),
                discount = COALESCE($3, discount),
                min_order_amount = CASE WHEN $4 THEN $5 ELSE min_order_amount END,
                max_usages = CASE WHEN $6 THEN $7 ELSE max_usages END,
                expires_at = CASE WHEN $8 THEN $9 ELSE expires_at END,
                is_active = COALESCE($10, is_active),
                updated_at = now()
            WHERE id = $1
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(id)
        .bind(update.kind)
        .bind(update.discount)
        .bind(update.min_order_amount.is_some())
        .bind(update.min_order_amount.flatten())
        .bind(update.max_usages.is_some())
        .bind(update.max_usages.flatten())
        .bind(update.expires_at.is_some())
        .bind(update.expires_at.flatten())
        .bind(update.is_active)
        .fetch_optional(self.pool)
        .await?;

        row.map(Coupon::try_from)
            .transpose()?
            .ok_or(RepositoryError::NotFound)
    }

    /// Delete a coupon. Orders keep the code as plain text.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the coupon does not exist.
    pub async fn delete(&self, id: CouponId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storekeep.coupon WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count one application of a coupon.
    ///
    /// The limit is re-checked in the same statement, so concurrent
    /// applications cannot push `usage_count` past `max_usages`. Returns
    /// `false` when the limit was reached in the meantime.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_usage(&self, id: CouponId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        Self::record_usage_in(&mut conn, id).await
    }

    /// [`record_usage`](Self::record_usage) on an existing connection.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn record_usage_in(
        conn: &mut PgConnection,
        id: CouponId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storekeep.coupon
            SET usage_count = usage_count + 1, updated_at = now()
            WHERE id = $1 AND (max_usages IS NULL OR usage_count < max_usages)
            ",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
