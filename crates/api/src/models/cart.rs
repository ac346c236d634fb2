//! Cart types.

use rust_decimal::Decimal;
use serde::Serialize;

use storekeep_core::{LineAmount, OrderTotals, PricingPolicy, ProductId};

/// One cart row joined with its live product data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
    pub image_url: Option<String>,
    /// Stock at read time. Not re-validated here; checkout re-checks it.
    pub stock: u32,
    pub is_active: bool,
}

impl LineAmount for CartLine {
    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

/// The cart as returned by `GET /cart`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub item_count: u32,
    pub totals: OrderTotals,
}

impl CartView {
    /// Price the lines with no discount applied.
    #[must_use]
    pub fn new(items: Vec<CartLine>, policy: &PricingPolicy) -> Self {
        let totals = policy.price_lines(&items);
        let item_count = items.iter().map(|line| line.quantity).sum();
        Self {
            items,
            item_count,
            totals,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, price: Decimal, quantity: u32) -> CartLine {
        CartLine {
            product_id: ProductId::new(id),
            name: format!("Product {id}"),
            unit_price: price,
            quantity,
            line_total: price * Decimal::from(quantity),
            image_url: None,
            stock: 100,
            is_active: true,
        }
    }

    #[test]
    fn test_cart_view_totals() {
        let view = CartView::new(
            vec![
                line(1, Decimal::new(2500, 2), 2),
                line(2, Decimal::new(1000, 2), 3),
            ],
            &PricingPolicy::default(),
        );
        assert_eq!(view.item_count, 5);
        assert_eq!(view.totals.subtotal, Decimal::from(80));
        assert_eq!(view.totals.shipping, Decimal::new(999, 2));
        assert_eq!(view.totals.discount, Decimal::ZERO);
    }

    #[test]
    fn test_empty_cart_still_has_shipping() {
        let view = CartView::new(Vec::new(), &PricingPolicy::default());
        assert_eq!(view.item_count, 0);
        assert_eq!(view.totals.subtotal, Decimal::ZERO);
        assert_eq!(view.totals.total, Decimal::new(999, 2));
    }
}
