//! Value Objects for the concrete storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Concrete grade code, e.g. `N20` (normal, 20 MPa) or `S30`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Grade { class: char, strength_mpa: u16 }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradeError {
    #[error("grade is empty")]
    Empty,
    #[error("grade must be a class letter followed by a strength, e.g. N20")]
    Malformed,
    #[error("grade strength must be between 1 and 100 MPa")]
    StrengthOutOfRange,
}

impl Grade {
    pub fn new(value: &str) -> Result<Self, GradeError> {
        let value = value.trim().to_uppercase();
        let mut chars = value.chars();
        let class = chars.next().ok_or(GradeError::Empty)?;
        if !class.is_ascii_alphabetic() { return Err(GradeError::Malformed); }
        let digits = chars.as_str();
        if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(GradeError::Malformed);
        }
        let strength_mpa: u16 = digits.parse().map_err(|_| GradeError::Malformed)?;
        if !(1..=100).contains(&strength_mpa) { return Err(GradeError::StrengthOutOfRange); }
        Ok(Self { class, strength_mpa })
    }
    pub fn class(&self) -> char { self.class }
    pub fn strength_mpa(&self) -> u16 { self.strength_mpa }
}

impl FromStr for Grade {
    type Err = GradeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
}

impl TryFrom<String> for Grade {
    type Error = GradeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(&value) }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}{}", self.class, self.strength_mpa) }
}

impl Serialize for Grade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Grade::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Pricing tier picked by the customer at purchase time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    #[default]
    Normal,
    Pump,
    Tremie,
}

impl DeliveryMethod {
    pub const ALL: [DeliveryMethod; 3] = [Self::Normal, Self::Pump, Self::Tremie];
    pub fn as_str(&self) -> &'static str {
        match self { Self::Normal => "normal", Self::Pump => "pump", Self::Tremie => "tremie" }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown delivery method: {0}")]
pub struct UnknownDeliveryMethod(pub String);

impl FromStr for DeliveryMethod {
    type Err = UnknownDeliveryMethod;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "pump" => Ok(Self::Pump),
            "tremie" => Ok(Self::Tremie),
            _ => Err(UnknownDeliveryMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for DeliveryMethod {
    type Error = UnknownDeliveryMethod;
    fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    #[error("currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),
    #[error("amount does not fit in minor units")]
    Overflow,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_uppercase() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }

    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }

    pub fn multiply(&self, factor: Decimal) -> Money { Money::new(self.amount * factor, &self.currency) }

    /// `rate` is a fraction, so 0.05 is five percent.
    pub fn percent_of(&self, rate: Decimal) -> Money { self.multiply(rate).round_to_cents() }

    pub fn round_to_cents(&self) -> Money {
        Money::new(self.amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero), &self.currency)
    }

    /// Amount in the smallest currency unit, as payment providers expect.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        (self.round_to_cents().amount * Decimal::ONE_HUNDRED).to_i64().ok_or(MoneyError::Overflow)
    }

    fn same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency.clone(), other.currency.clone()));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {:.2}", self.currency, self.amount) }
}

/// Volume of concrete in cubic metres.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Volume(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VolumeError {
    #[error("volume must be greater than zero")]
    NotPositive,
    #[error("volume supports at most 3 decimal places")]
    TooPrecise,
}

impl Volume {
    pub fn new(value: Decimal) -> Result<Self, VolumeError> {
        if value <= Decimal::ZERO { return Err(VolumeError::NotPositive); }
        if value.normalize().scale() > 3 { return Err(VolumeError::TooPrecise); }
        Ok(Self(value.normalize()))
    }
    pub fn value(&self) -> Decimal { self.0 }
    pub fn add(&self, other: Volume) -> Self { Self(self.0 + other.0) }
    /// Stock arithmetic: `None` when the result would be negative.
    pub fn checked_sub_from(stock: Decimal, qty: Volume) -> Option<Decimal> {
        let left = stock - qty.0;
        (left >= Decimal::ZERO).then_some(left)
    }
}

impl TryFrom<Decimal> for Volume {
    type Error = VolumeError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Volume> for Decimal {
    fn from(value: Volume) -> Self { value.0 }
}

/// A fraction in `[0, 1]`, used for discount and tax rates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub struct Rate(Decimal);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate must be between 0 and 1, got {0}")]
pub struct RateError(pub Decimal);

impl Rate {
    pub fn new(value: Decimal) -> Result<Self, RateError> {
        if value < Decimal::ZERO || value > Decimal::ONE { return Err(RateError(value)); }
        Ok(Self(value))
    }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn value(&self) -> Decimal { self.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_parse() {
        let g = Grade::new(" n20 ").unwrap();
        assert_eq!(g.class(), 'N');
        assert_eq!(g.strength_mpa(), 20);
        assert_eq!(g.to_string(), "N20");
        assert_eq!(Grade::new("").unwrap_err(), GradeError::Empty);
        assert_eq!(Grade::new("20").unwrap_err(), GradeError::Malformed);
        assert_eq!(Grade::new("S").unwrap_err(), GradeError::Malformed);
        assert_eq!(Grade::new("S3O").unwrap_err(), GradeError::Malformed);
        assert_eq!(Grade::new("S0").unwrap_err(), GradeError::StrengthOutOfRange);
        assert_eq!(Grade::new("S150").unwrap_err(), GradeError::StrengthOutOfRange);
    }

    #[test]
    fn test_grade_serde() {
        let g: Grade = serde_json::from_str("\"s30\"").unwrap();
        assert_eq!(serde_json::to_string(&g).unwrap(), "\"S30\"");
        assert!(serde_json::from_str::<Grade>("\"concrete\"").is_err());
    }

    #[test]
    fn test_delivery_method_parse() {
        assert_eq!("Pump".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Pump);
        assert_eq!("tremie".parse::<DeliveryMethod>().unwrap(), DeliveryMethod::Tremie);
        assert!("crane".parse::<DeliveryMethod>().is_err());
        assert_eq!(serde_json::to_string(&DeliveryMethod::Normal).unwrap(), "\"normal\"");
    }

    #[test]
    fn test_money_add() {
        let a = Money::new(Decimal::new(100, 0), "myr");
        let b = Money::new(Decimal::new(50, 0), "MYR");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert!(a.add(&Money::zero("SGD")).is_err());
    }

    #[test]
    fn test_money_rounding_and_minor_units() {
        let m = Money::new(Decimal::new(10005, 3), "MYR");
        assert_eq!(m.round_to_cents().amount(), Decimal::new(1001, 2));
        assert_eq!(m.to_minor_units().unwrap(), 1001);
        let price = Money::new(Decimal::new(24050, 2), "MYR");
        assert_eq!(price.percent_of(Decimal::new(5, 2)).amount(), Decimal::new(1203, 2));
    }

    #[test]
    fn test_volume() {
        assert!(Volume::new(Decimal::ZERO).is_err());
        assert_eq!(Volume::new(Decimal::new(12345, 4)).unwrap_err(), VolumeError::TooPrecise);
        let v = Volume::new(Decimal::new(25, 1)).unwrap();
        assert_eq!(Volume::checked_sub_from(Decimal::new(3, 0), v), Some(Decimal::new(5, 1)));
        assert_eq!(Volume::checked_sub_from(Decimal::new(2, 0), v), None);
    }

    #[test]
    fn test_rate_bounds() {
        assert!(Rate::new(Decimal::new(15, 2)).is_ok());
        assert!(Rate::new(Decimal::new(-1, 2)).is_err());
        assert!(Rate::new(Decimal::new(11, 1)).is_err());
    }
}
