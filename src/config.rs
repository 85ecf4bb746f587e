//! Service configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `DATABASE_URL` - `PostgreSQL` connection string
//! - `AUTH_JWT_SECRET` - HS256 secret shared with the identity provider
//!
//! ## Optional
//! - `HOST` / `PORT` - bind address (default `0.0.0.0:8083`)
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default 10)
//! - `NATS_URL` - publish domain events when set
//! - `STORE_CURRENCY` (default `MYR`), `STORE_DISCOUNT_RATE`, `STORE_DELIVERY_FEE`, `STORE_TAX_RATE`
//! - `STRIPE_SECRET_KEY`, `STRIPE_WEBHOOK_SECRET`, `STRIPE_API_BASE`
//! - `AI_API_KEY`, `AI_MODEL`, `AI_API_BASE`
//! - `VISION_API_KEY`, `VISION_API_BASE`

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

use crate::domain::pricing::PricingPolicy;
use crate::domain::value_objects::Rate;

const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";
const DEFAULT_AI_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_AI_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_VISION_API_BASE: &str = "https://vision.googleapis.com";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub database_max_connections: u32,
    pub host: IpAddr,
    pub port: u16,
    pub nats_url: Option<String>,
    pub jwt_secret: SecretString,
    pub store: StoreConfig,
    pub payments: Option<PaymentsConfig>,
    pub ai: Option<AiConfig>,
    pub vision: Option<VisionConfig>,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub currency: String,
    pub discount_rate: Rate,
    pub delivery_fee: Decimal,
    pub tax_rate: Rate,
}

#[derive(Debug, Clone)]
pub struct PaymentsConfig {
    pub secret_key: SecretString,
    pub webhook_secret: SecretString,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: SecretString,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub api_key: SecretString,
    pub api_base: String,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);
        let store = StoreConfig {
            currency: env.or_default("STORE_CURRENCY", "MYR").to_uppercase(),
            discount_rate: env.rate("STORE_DISCOUNT_RATE")?,
            delivery_fee: env.parsed_or("STORE_DELIVERY_FEE", Decimal::ZERO)?,
            tax_rate: env.rate("STORE_TAX_RATE")?,
        };
        if store.currency.len() != 3 || !store.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::InvalidEnvVar("STORE_CURRENCY".into(), "expected an ISO 4217 code".into()));
        }
        if store.delivery_fee < Decimal::ZERO {
            return Err(ConfigError::InvalidEnvVar("STORE_DELIVERY_FEE".into(), "must not be negative".into()));
        }

        let payments = match env.optional("STRIPE_SECRET_KEY") {
            Some(key) => Some(PaymentsConfig {
                secret_key: SecretString::from(key),
                webhook_secret: SecretString::from(env.required("STRIPE_WEBHOOK_SECRET")?),
                api_base: env.or_default("STRIPE_API_BASE", DEFAULT_STRIPE_API_BASE),
            }),
            None => None,
        };
        let ai = env.optional("AI_API_KEY").map(|key| AiConfig {
            api_key: SecretString::from(key),
            model: env.or_default("AI_MODEL", DEFAULT_AI_MODEL),
            api_base: env.or_default("AI_API_BASE", DEFAULT_AI_API_BASE),
        });
        let vision = env.optional("VISION_API_KEY").map(|key| VisionConfig {
            api_key: SecretString::from(key),
            api_base: env.or_default("VISION_API_BASE", DEFAULT_VISION_API_BASE),
        });

        Ok(Self {
            database_url: SecretString::from(env.required("DATABASE_URL")?),
            database_max_connections: env.parsed_or("DATABASE_MAX_CONNECTIONS", 10)?,
            host: env.parsed_or("HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: env.parsed_or("PORT", 8083)?,
            nats_url: env.optional("NATS_URL"),
            jwt_secret: SecretString::from(env.required("AUTH_JWT_SECRET")?),
            store,
            payments,
            ai,
            vision,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

impl StoreConfig {
    pub fn pricing_policy(&self) -> PricingPolicy {
        PricingPolicy {
            currency: self.currency.clone(),
            discount_rate: self.discount_rate,
            delivery_fee: self.delivery_fee,
            tax_rate: self.tax_rate,
        }
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> { (self.0)(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    fn or_default(&self, key: &str, default: &str) -> String { self.optional(key).unwrap_or_else(|| default.to_string()) }

    fn parsed_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        match self.optional(key) {
            Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }

    fn rate(&self, key: &str) -> Result<Rate, ConfigError> {
        let value = self.parsed_or(key, Decimal::ZERO)?;
        Rate::new(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| vars.get(k).cloned())
    }

    const BASE: [(&str, &str); 2] = [("DATABASE_URL", "postgres://localhost/readymix"), ("AUTH_JWT_SECRET", "jwt-signing-key")];

    #[test]
    fn test_defaults() {
        let config = load(&BASE).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.store.currency, "MYR");
        assert_eq!(config.store.discount_rate, Rate::zero());
        assert!(config.payments.is_none() && config.ai.is_none() && config.vision.is_none());
        assert_eq!(config.database_url.expose_secret(), "postgres://localhost/readymix");
    }

    #[test]
    fn test_missing_required() {
        assert_eq!(load(&BASE[..1]).unwrap_err(), ConfigError::MissingEnvVar("AUTH_JWT_SECRET".into()));
    }

    #[test]
    fn test_store_pricing() {
        let mut vars = BASE.to_vec();
        vars.extend([("STORE_DISCOUNT_RATE", "0.05"), ("STORE_DELIVERY_FEE", "150"), ("STORE_CURRENCY", "sgd")]);
        let policy = load(&vars).unwrap().store.pricing_policy();
        assert_eq!(policy.discount_rate.value(), Decimal::new(5, 2));
        assert_eq!(policy.delivery_fee, Decimal::new(150, 0));
        assert_eq!(policy.currency, "SGD");
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = BASE.to_vec();
        vars.push(("STORE_DISCOUNT_RATE", "1.5"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(k, _)) if k == "STORE_DISCOUNT_RATE"));
        let mut vars = BASE.to_vec();
        vars.push(("PORT", "eighty"));
        assert!(matches!(load(&vars), Err(ConfigError::InvalidEnvVar(k, _)) if k == "PORT"));
    }

    #[test]
    fn test_payments_need_webhook_secret() {
        let mut vars = BASE.to_vec();
        vars.push(("STRIPE_SECRET_KEY", "sk_test_123"));
        assert_eq!(load(&vars).unwrap_err(), ConfigError::MissingEnvVar("STRIPE_WEBHOOK_SECRET".into()));
        vars.push(("STRIPE_WEBHOOK_SECRET", "whsec_123"));
        let payments = load(&vars).unwrap().payments.unwrap();
        assert_eq!(payments.api_base, "https://api.stripe.com");
    }
}
