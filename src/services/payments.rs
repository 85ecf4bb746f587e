//! Payment provider client.
//!
//! Checkout creates a payment intent for the order total; the provider then
//! reports the outcome through signed webhooks which drive order status.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::config::PaymentsConfig;

/// Maximum age of a webhook signature timestamp, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid webhook signature: {0}")]
    InvalidSignature(String),
    #[error("malformed webhook payload: {0}")]
    MalformedEvent(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody { error: ApiErrorDetail }

#[derive(Debug, Deserialize)]
struct ApiErrorDetail { message: Option<String> }

#[derive(Clone)]
pub struct PaymentClient {
    client: reqwest::Client,
    secret_key: SecretString,
    webhook_secret: SecretString,
    api_base: String,
}

impl PaymentClient {
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentError> {
        Ok(Self {
            client: super::http_client()?,
            secret_key: config.secret_key.clone(),
            webhook_secret: config.webhook_secret.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Creates an intent for `amount_minor` (cents) tagged with the order id.
    #[instrument(skip(self))]
    pub async fn create_intent(&self, order_id: Uuid, order_number: &str, amount_minor: i64, currency: &str) -> Result<PaymentIntent, PaymentError> {
        let form = [
            ("amount", amount_minor.to_string()),
            ("currency", currency.to_lowercase()),
            ("automatic_payment_methods[enabled]", "true".to_string()),
            ("metadata[order_id]", order_id.to_string()),
            ("metadata[order_number]", order_number.to_string()),
        ];
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(self.secret_key.expose_secret())
            .header("Idempotency-Key", order_id.to_string())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|b| b.error.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());
            tracing::warn!(status = status.as_u16(), %message, "Payment intent creation failed");
            return Err(PaymentError::Api { status: status.as_u16(), message });
        }
        let intent = response.json::<PaymentIntent>().await?;
        tracing::info!(intent_id = %intent.id, "Created payment intent");
        Ok(intent)
    }

    /// Verifies and parses a webhook delivery.
    pub fn parse_webhook(&self, payload: &[u8], signature_header: &str, now: i64) -> Result<WebhookEvent, PaymentError> {
        verify_webhook(payload, signature_header, &self.webhook_secret, now)?;
        WebhookEvent::parse(payload)
    }
}

/// Checks a `t=<unix>,v1=<hex>` signature header against
/// HMAC-SHA256(`"{t}.{payload}"`). Any one matching `v1` entry is enough.
pub fn verify_webhook(payload: &[u8], signature_header: &str, secret: &SecretString, now: i64) -> Result<(), PaymentError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = Some(t),
            Some(("v1", sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::InvalidSignature("missing timestamp".into()))?;
    let ts: i64 = timestamp.parse().map_err(|_| PaymentError::InvalidSignature("invalid timestamp".into()))?;
    if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::InvalidSignature("timestamp outside tolerance".into()));
    }
    if signatures.is_empty() {
        return Err(PaymentError::InvalidSignature("no v1 signature".into()));
    }

    let expected = compute_signature(payload, timestamp, secret)?;
    if signatures.iter().any(|sig| constant_time_eq(expected.as_bytes(), sig.as_bytes())) {
        Ok(())
    } else {
        Err(PaymentError::InvalidSignature("signature mismatch".into()))
    }
}

/// Builds the header the provider would send for `payload` at `timestamp`.
pub fn signature_header(payload: &[u8], secret: &SecretString, timestamp: i64) -> Result<String, PaymentError> {
    let t = timestamp.to_string();
    Ok(format!("t={t},v1={}", compute_signature(payload, &t, secret)?))
}

fn compute_signature(payload: &[u8], timestamp: &str, secret: &SecretString) -> Result<String, PaymentError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| PaymentError::InvalidSignature(e.to_string()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
    Canceled,
    Refunded,
}

/// A webhook delivery reduced to what order processing needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub id: String,
    pub event_type: String,
    /// `None` for event types the storefront does not act on.
    pub outcome: Option<(PaymentOutcome, String)>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData { object: serde_json::Value }

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, PaymentError> {
        let raw: RawEvent = serde_json::from_slice(payload)?;
        let object = &raw.data.object;
        let field = |name: &str| object.get(name).and_then(|v| v.as_str()).map(str::to_string);

        let outcome = match raw.event_type.as_str() {
            "payment_intent.succeeded" => field("id").map(|id| (PaymentOutcome::Succeeded, id)),
            "payment_intent.payment_failed" => field("id").map(|id| (PaymentOutcome::Failed, id)),
            "payment_intent.canceled" => field("id").map(|id| (PaymentOutcome::Canceled, id)),
            // Charges point back at the intent that created them.
            "charge.refunded" => field("payment_intent").map(|id| (PaymentOutcome::Refunded, id)),
            _ => None,
        };
        Ok(Self { id: raw.id, event_type: raw.event_type, outcome })
    }

    pub fn intent_id(&self) -> Option<&str> { self.outcome.as_ref().map(|(_, id)| id.as_str()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NOW: i64 = 1_700_000_000;

    fn secret() -> SecretString { SecretString::from("whsec_test") }

    #[test]
    fn test_verify_webhook_accepts_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let header = signature_header(payload, &secret(), NOW).unwrap();
        assert!(verify_webhook(payload, &header, &secret(), NOW + 10).is_ok());
    }

    #[test]
    fn test_verify_webhook_accepts_any_matching_v1() {
        let payload = br#"{"id":"evt_1"}"#;
        let valid = signature_header(payload, &secret(), NOW).unwrap();
        let sig = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={sig}");
        assert!(verify_webhook(payload, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn test_verify_webhook_rejects_tampering() {
        let header = signature_header(br#"{"amount":100}"#, &secret(), NOW).unwrap();
        let err = verify_webhook(br#"{"amount":1}"#, &header, &secret(), NOW).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature(_)));

        let other = SecretString::from("whsec_other");
        assert!(verify_webhook(br#"{"amount":100}"#, &header, &other, NOW).is_err());
    }

    #[test]
    fn test_verify_webhook_rejects_stale_and_malformed_headers() {
        let payload = b"{}";
        let header = signature_header(payload, &secret(), NOW).unwrap();
        assert!(verify_webhook(payload, &header, &secret(), NOW + SIGNATURE_TOLERANCE_SECS + 1).is_err());
        assert!(verify_webhook(payload, "v1=abc", &secret(), NOW).is_err());
        assert!(verify_webhook(payload, &format!("t={NOW}"), &secret(), NOW).is_err());
        assert!(verify_webhook(payload, "t=soon,v1=abc", &secret(), NOW).is_err());
    }

    #[test]
    fn test_parse_webhook_events() {
        let succeeded = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
        let event = WebhookEvent::parse(succeeded).unwrap();
        assert_eq!(event.outcome, Some((PaymentOutcome::Succeeded, "pi_1".to_string())));

        let refunded = br#"{"id":"evt_2","type":"charge.refunded","data":{"object":{"id":"ch_1","payment_intent":"pi_9"}}}"#;
        assert_eq!(WebhookEvent::parse(refunded).unwrap().intent_id(), Some("pi_9"));

        let other = br#"{"id":"evt_3","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let event = WebhookEvent::parse(other).unwrap();
        assert_eq!(event.outcome, None);
        assert_eq!(event.event_type, "customer.created");

        assert!(matches!(WebhookEvent::parse(b"not json"), Err(PaymentError::MalformedEvent(_))));
    }

    fn client(api_base: &str) -> PaymentClient {
        PaymentClient::new(&PaymentsConfig {
            secret_key: SecretString::from("sk_test_123"),
            webhook_secret: secret(),
            api_base: api_base.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_intent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .and(header("authorization", "Bearer sk_test_123"))
            .and(body_string_contains("amount=125050"))
            .and(body_string_contains("currency=myr"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123", "client_secret": "pi_123_secret_abc", "status": "requires_payment_method"
            })))
            .mount(&server)
            .await;

        let intent = client(&server.uri()).create_intent(Uuid::now_v7(), "ORD-00000001", 125_050, "MYR").await.unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.client_secret.as_deref(), Some("pi_123_secret_abc"));
    }

    #[tokio::test]
    async fn test_create_intent_surfaces_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": { "message": "Amount must be at least 2.00 myr" }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).create_intent(Uuid::now_v7(), "ORD-00000002", 10, "MYR").await.unwrap_err();
        match err {
            PaymentError::Api { status, message } => {
                assert_eq!(status, 402);
                assert!(message.contains("at least"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
