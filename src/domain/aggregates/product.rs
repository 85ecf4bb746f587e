//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{DeliveryMethod, Grade, Money, Volume};

#[derive(Clone, Debug, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub grade: Grade,
    #[sqlx(flatten)]
    pub prices: DeliveryPrices,
    pub currency: String,
    pub stock_m3: Decimal,
    #[sqlx(try_from = "String")]
    pub status: ProductStatus,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat per-m³ price for each delivery method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DeliveryPrices {
    #[serde(rename = "normal")]
    pub price_normal: Decimal,
    #[serde(rename = "pump")]
    pub price_pump: Decimal,
    #[serde(rename = "tremie")]
    pub price_tremie: Decimal,
}

impl DeliveryPrices {
    pub fn get(&self, method: DeliveryMethod) -> Decimal {
        match method {
            DeliveryMethod::Normal => self.price_normal,
            DeliveryMethod::Pump => self.price_pump,
            DeliveryMethod::Tremie => self.price_tremie,
        }
    }
    pub fn all_positive(&self) -> bool { DeliveryMethod::ALL.iter().all(|m| self.get(*m) > Decimal::ZERO) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus { #[default] Draft, Active, Archived }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Active => "active", Self::Archived => "archived" }
    }
}

impl TryFrom<String> for ProductStatus {
    type Error = ProductError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            _ => Err(ProductError::UnknownStatus(value)),
        }
    }
}

impl Product {
    pub fn draft(name: impl Into<String>, grade: Grade, prices: DeliveryPrices, currency: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), description: None, grade, prices,
            currency: currency.to_uppercase(), stock_m3: Decimal::ZERO, status: ProductStatus::Draft,
            tags: vec![], image_url: None, created_at: now, updated_at: now,
        }
    }

    pub fn price_for(&self, method: DeliveryMethod) -> Money { Money::new(self.prices.get(method), &self.currency) }
    pub fn is_active(&self) -> bool { self.status == ProductStatus::Active }
    pub fn is_purchasable(&self) -> bool { self.is_active() && self.stock_m3 > Decimal::ZERO }
    pub fn has_stock_for(&self, qty: Volume) -> bool { self.stock_m3 >= qty.value() }

    pub fn ensure_purchasable(&self, qty: Volume) -> Result<(), ProductError> {
        if !self.is_active() { return Err(ProductError::NotAvailable); }
        if !self.has_stock_for(qty) {
            return Err(ProductError::InsufficientStock { available: self.stock_m3, requested: qty.value() });
        }
        Ok(())
    }

    pub fn publish(&mut self) -> Result<(), ProductError> {
        if self.name.trim().is_empty() { return Err(ProductError::MissingName); }
        if !self.prices.all_positive() { return Err(ProductError::NonPositivePrice); }
        self.status = ProductStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) { self.status = ProductStatus::Archived; self.touch(); }

    pub fn add_stock(&mut self, qty: Volume) { self.stock_m3 += qty.value(); self.touch(); }

    pub fn decrement_stock(&mut self, qty: Volume) -> Result<(), ProductError> {
        self.stock_m3 = Volume::checked_sub_from(self.stock_m3, qty)
            .ok_or(ProductError::InsufficientStock { available: self.stock_m3, requested: qty.value() })?;
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("every delivery method needs a positive price")]
    NonPositivePrice,
    #[error("product is not available for purchase")]
    NotAvailable,
    #[error("insufficient stock: {available} m³ available, {requested} m³ requested")]
    InsufficientStock { available: Decimal, requested: Decimal },
    #[error("unknown product status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
pub(crate) fn sample_product(name: &str, grade: &str, normal: i64) -> Product {
    let prices = DeliveryPrices {
        price_normal: Decimal::new(normal, 0),
        price_pump: Decimal::new(normal + 30, 0),
        price_tremie: Decimal::new(normal + 45, 0),
    };
    let mut p = Product::draft(name, Grade::new(grade).unwrap(), prices, "MYR");
    p.publish().unwrap();
    p.add_stock(Volume::new(Decimal::new(100, 0)).unwrap());
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_selection_by_delivery_method() {
        let p = sample_product("Ready Mix N20", "N20", 220);
        assert_eq!(p.price_for(DeliveryMethod::Normal).amount(), Decimal::new(220, 0));
        assert_eq!(p.price_for(DeliveryMethod::Pump).amount(), Decimal::new(250, 0));
        assert_eq!(p.price_for(DeliveryMethod::Tremie).amount(), Decimal::new(265, 0));
        assert_eq!(p.price_for(DeliveryMethod::Pump).currency(), "MYR");
    }

    #[test]
    fn test_publish_requires_prices() {
        let prices = DeliveryPrices { price_normal: Decimal::new(200, 0), price_pump: Decimal::ZERO, price_tremie: Decimal::new(240, 0) };
        let mut p = Product::draft("S30", Grade::new("S30").unwrap(), prices, "MYR");
        assert_eq!(p.publish().unwrap_err(), ProductError::NonPositivePrice);
        assert_eq!(p.status, ProductStatus::Draft);
    }

    #[test]
    fn test_stock() {
        let mut p = sample_product("Ready Mix N25", "N25", 230);
        assert!(p.is_purchasable());
        p.decrement_stock(Volume::new(Decimal::new(975, 1)).unwrap()).unwrap();
        assert_eq!(p.stock_m3, Decimal::new(25, 1));
        let err = p.decrement_stock(Volume::new(Decimal::new(3, 0)).unwrap()).unwrap_err();
        assert!(matches!(err, ProductError::InsufficientStock { .. }));
        p.archive();
        assert_eq!(p.ensure_purchasable(Volume::new(Decimal::ONE).unwrap()).unwrap_err(), ProductError::NotAvailable);
    }

    #[test]
    fn test_status_round_trip_from_db_text() {
        assert_eq!(ProductStatus::try_from("archived".to_string()).unwrap(), ProductStatus::Archived);
        assert!(ProductStatus::try_from("deleted".to_string()).is_err());
    }
}
