//! Cart and order pricing.
//!
//! This is the only place checkout arithmetic lives. The cart view, coupon
//! application, and order placement all call [`PricingPolicy::assemble`], so a
//! displayed total and a charged total cannot drift apart.
//!
//! # Rules
//!
//! - `subtotal = sum(unit_price * quantity)`, exact
//! - `tax = round(subtotal * tax_rate)`, on the pre-discount subtotal
//! - `shipping = 0` when `subtotal >= free_shipping_threshold`, else the flat fee
//! - `total = round(subtotal - discount + tax + shipping)`
//!
//! Rounding is to cents, half away from zero (see [`round_cents`]).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::round_cents;

/// Anything that contributes `unit_price * quantity` to a subtotal.
pub trait LineAmount {
    /// Price of a single unit.
    fn unit_price(&self) -> Decimal;

    /// Number of units.
    fn quantity(&self) -> u32;

    /// `unit_price * quantity`.
    fn line_total(&self) -> Decimal {
        self.unit_price() * Decimal::from(self.quantity())
    }
}

/// Sum of `unit_price * quantity` over all lines. An empty cart is zero.
#[must_use]
pub fn subtotal<'a, L, I>(lines: I) -> Decimal
where
    L: LineAmount + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines.into_iter().map(LineAmount::line_total).sum()
}

/// Store-wide tax and shipping settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPolicy {
    /// Fraction of the subtotal charged as tax (0.08 is 8%).
    pub tax_rate: Decimal,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold: Decimal,
    /// Shipping charged below the threshold.
    pub flat_shipping_fee: Decimal,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(8, 2),
            free_shipping_threshold: Decimal::new(100, 0),
            flat_shipping_fee: Decimal::new(999, 2),
        }
    }
}

impl PricingPolicy {
    /// Tax on a subtotal, rounded to cents.
    #[must_use]
    pub fn tax_for(&self, subtotal: Decimal) -> Decimal {
        round_cents(subtotal * self.tax_rate)
    }

    /// Shipping fee for a subtotal.
    #[must_use]
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal >= self.free_shipping_threshold {
            Decimal::ZERO
        } else {
            self.flat_shipping_fee
        }
    }

    /// Assemble the full breakdown for a subtotal and an already-evaluated
    /// discount.
    ///
    /// The discount is clamped to `[0, subtotal]`, which keeps the total at or
    /// above `tax + shipping`.
    ///
    /// ```
    /// use rust_decimal::Decimal;
    /// use storekeep_core::PricingPolicy;
    ///
    /// let totals = PricingPolicy::default().assemble(Decimal::from(120), Decimal::from(20));
    /// assert_eq!(totals.tax, Decimal::new(960, 2));
    /// assert_eq!(totals.shipping, Decimal::ZERO);
    /// assert_eq!(totals.total, Decimal::new(10960, 2));
    /// ```
    #[must_use]
    pub fn assemble(&self, subtotal: Decimal, discount: Decimal) -> OrderTotals {
        let discount = discount.clamp(Decimal::ZERO, subtotal.max(Decimal::ZERO));
        let tax = self.tax_for(subtotal);
        let shipping = self.shipping_for(subtotal);
        let total = round_cents(subtotal - discount + tax + shipping);

        OrderTotals {
            subtotal,
            discount,
            tax,
            shipping,
            total,
        }
    }

    /// Price a set of lines with no discount.
    #[must_use]
    pub fn price_lines<'a, L, I>(&self, lines: I) -> OrderTotals
    where
        L: LineAmount + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        self.assemble(subtotal(lines), Decimal::ZERO)
    }
}

/// Price breakdown shown on the cart and stored on the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
    pub total: Decimal,
}
