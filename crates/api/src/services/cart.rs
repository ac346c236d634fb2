//! Cart service.
//!
//! Every mutation checks the product is active and that the resulting line
//! quantity fits in current stock. Reads do not re-check; checkout does.

use sqlx::PgPool;
use thiserror::Error;

use storekeep_core::{PricingPolicy, ProductId, UserId};

use super::StockShortage;
use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::{CartView, Product};

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Product does not exist or is inactive.
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    /// Product is not in the cart.
    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),

    /// Quantities start at one.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    #[error("insufficient stock: {0}")]
    InsufficientStock(StockShortage),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Cart service.
pub struct CartService<'a> {
    cart: CartRepository<'a>,
    products: ProductRepository<'a>,
    policy: &'a PricingPolicy,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, policy: &'a PricingPolicy) -> Self {
        Self {
            cart: CartRepository::new(pool),
            products: ProductRepository::new(pool),
            policy,
        }
    }

    /// The priced cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be loaded.
    pub async fn view(&self, user_id: UserId) -> Result<CartView, CartError> {
        let lines = self.cart.lines(user_id).await?;
        Ok(CartView::new(lines, self.policy))
    }

    /// Add units of a product, merging with an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::InsufficientStock` if the combined quantity exceeds
    /// stock, `CartError::ProductNotFound` for unknown or inactive products.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        let product = self.active_product(product_id).await?;

        let existing = self
            .cart
            .quantity_of(user_id, product_id)
            .await?
            .unwrap_or(0);
        let combined = existing.saturating_add(quantity);
        ensure_supply(&product, combined)?;

        self.cart.set_quantity(user_id, product_id, combined).await?;
        tracing::debug!(%user_id, %product_id, quantity = combined, "cart line added");

        self.view(user_id).await
    }

    /// Replace the quantity of an existing line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart,
    /// `CartError::InsufficientStock` if `quantity` exceeds stock.
    pub async fn update(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartView, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if self.cart.quantity_of(user_id, product_id).await?.is_none() {
            return Err(CartError::LineNotFound(product_id));
        }
        let product = self.active_product(product_id).await?;
        ensure_supply(&product, quantity)?;

        self.cart.set_quantity(user_id, product_id, quantity).await?;

        self.view(user_id).await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the product is not in the cart.
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> Result<CartView, CartError> {
        self.cart
            .remove(user_id, product_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => CartError::LineNotFound(product_id),
                other => CartError::Repository(other),
            })?;

        self.view(user_id).await
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        self.cart.clear(user_id).await?;
        Ok(())
    }

    async fn active_product(&self, product_id: ProductId) -> Result<Product, CartError> {
        self.products
            .get(product_id)
            .await?
            .filter(|product| product.is_active)
            .ok_or(CartError::ProductNotFound(product_id))
    }
}

/// Reject a line quantity the product cannot supply.
fn ensure_supply(product: &Product, quantity: u32) -> Result<(), CartError> {
    if product.can_supply(quantity) {
        return Ok(());
    }
    Err(CartError::InsufficientStock(StockShortage {
        product_id: product.id,
        product_name: product.name.clone(),
        requested: quantity,
        available: product.stock,
    }))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;

    fn product(stock: u32) -> Product {
        Product {
            id: ProductId::new(3),
            name: "Enamel Mug".to_string(),
            description: String::new(),
            category: "kitchen".to_string(),
            price: Decimal::new(1250, 2),
            stock,
            image_url: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_supply_up_to_stock() {
        assert!(ensure_supply(&product(5), 5).is_ok());
    }

    #[test]
    fn test_shortage_names_the_product() {
        let Err(CartError::InsufficientStock(shortage)) = ensure_supply(&product(2), 3) else {
            panic!("expected a shortage");
        };
        assert_eq!(shortage.product_name, "Enamel Mug");
        assert_eq!(shortage.requested, 3);
        assert_eq!(shortage.available, 2);
        assert_eq!(shortage.to_string(), "only 2 of Enamel Mug in stock, 3 requested");
    }
}
