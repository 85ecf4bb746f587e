//! Checkout totals.
//!
//! `total = subtotal - discount + delivery_fee + tax`, where the discount is a
//! store-wide percentage of the subtotal and tax applies after the discount.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::aggregates::cart::{Cart, CartError};
use crate::domain::value_objects::{Money, Rate};

#[derive(Clone, Debug)]
pub struct PricingPolicy {
    pub currency: String,
    pub discount_rate: Rate,
    pub delivery_fee: Decimal,
    pub tax_rate: Rate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self { currency: "MYR".into(), discount_rate: Rate::zero(), delivery_fee: Decimal::ZERO, tax_rate: Rate::zero() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CheckoutQuote {
    pub subtotal: Money,
    pub discount_rate: Decimal,
    pub discount: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub total: Money,
}

impl PricingPolicy {
    pub fn quote(&self, cart: &Cart) -> Result<CheckoutQuote, CartError> {
        if cart.is_empty() { return Err(CartError::Empty); }
        if cart.currency != self.currency { return Err(CartError::CurrencyMismatch(cart.currency.clone())); }

        let subtotal = cart.subtotal()?.round_to_cents();
        let discount = subtotal.percent_of(self.discount_rate.value());
        let discounted = Money::new(subtotal.amount() - discount.amount(), &self.currency);
        let tax = discounted.percent_of(self.tax_rate.value());
        let delivery_fee = Money::new(self.delivery_fee, &self.currency).round_to_cents();
        let total = Money::new(discounted.amount() + delivery_fee.amount() + tax.amount(), &self.currency);

        Ok(CheckoutQuote { subtotal, discount_rate: self.discount_rate.value(), discount, delivery_fee, tax, total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::cart::CartLine;
    use crate::domain::aggregates::product::sample_product;
    use crate::domain::value_objects::{DeliveryMethod, Volume};
    use uuid::Uuid;

    fn cart_with(qty: Decimal) -> Cart {
        let mut cart = Cart::new(Uuid::now_v7(), Uuid::now_v7(), "MYR");
        let p = sample_product("Ready Mix N20", "N20", 220);
        cart.add_line(CartLine::for_product(&p, DeliveryMethod::Pump, Volume::new(qty).unwrap())).unwrap();
        cart
    }

    #[test]
    fn test_discount_and_flat_fee() {
        let policy = PricingPolicy {
            discount_rate: Rate::new(Decimal::new(10, 2)).unwrap(),
            delivery_fee: Decimal::new(150, 0),
            ..PricingPolicy::default()
        };
        // 4 m³ pumped at 250 = 1000; 1000 - 100 + 150
        let q = policy.quote(&cart_with(Decimal::new(4, 0))).unwrap();
        assert_eq!(q.subtotal.amount(), Decimal::new(1000, 0));
        assert_eq!(q.discount.amount(), Decimal::new(100, 0));
        assert_eq!(q.tax.amount(), Decimal::ZERO);
        assert_eq!(q.total.amount(), Decimal::new(1050, 0));
    }

    #[test]
    fn test_tax_applies_after_discount() {
        let policy = PricingPolicy {
            discount_rate: Rate::new(Decimal::new(5, 2)).unwrap(),
            delivery_fee: Decimal::new(80, 0),
            tax_rate: Rate::new(Decimal::new(6, 2)).unwrap(),
            ..PricingPolicy::default()
        };
        // 2.5 m³ at 250 = 625.00, discount 31.25, taxable 593.75, tax 35.63
        let q = policy.quote(&cart_with(Decimal::new(25, 1))).unwrap();
        assert_eq!(q.discount.amount(), Decimal::new(3125, 2));
        assert_eq!(q.tax.amount(), Decimal::new(3563, 2));
        assert_eq!(q.total.amount(), Decimal::new(70938, 2));
        assert_eq!(q.total.amount(), q.subtotal.amount() - q.discount.amount() + q.delivery_fee.amount() + q.tax.amount());
    }

    #[test]
    fn test_empty_cart_has_no_quote() {
        let cart = Cart::new(Uuid::now_v7(), Uuid::now_v7(), "MYR");
        assert_eq!(PricingPolicy::default().quote(&cart).unwrap_err(), CartError::Empty);
    }
}
