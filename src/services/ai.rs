//! Generative text client (Anthropic Messages API) and the prompts the
//! storefront sends it.

use std::fmt::Write as _;

use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use validator::Validate;

use crate::config::AiConfig;
use crate::db::faqs::Faq;
use crate::domain::aggregates::Product;
use crate::domain::value_objects::DeliveryMethod;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

/// Turns of chat history forwarded to the model.
pub const MAX_HISTORY: usize = 10;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("model returned no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole { User, Assistant }

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[validate(length(min = 1, max = 2000))]
    pub content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct MessagesResponse { content: Vec<ContentBlock> }

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody { error: ApiErrorDetail }

#[derive(Debug, Deserialize)]
struct ApiErrorDetail { message: String }

#[derive(Clone)]
pub struct AiClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    api_base: String,
}

impl AiClient {
    pub fn new(config: &AiConfig) -> Result<Self, AiError> {
        Ok(Self {
            client: super::http_client()?,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    /// One non-streaming completion; returns the concatenated text blocks.
    #[instrument(skip(self, system, messages), fields(model = %self.model, turns = messages.len()))]
    pub async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String, AiError> {
        let request = MessagesRequest { model: &self.model, max_tokens: MAX_TOKENS, system, messages };
        let response = self
            .client
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.to_string(),
            };
            tracing::warn!(status = status.as_u16(), %message, "Text model request failed");
            return Err(AiError::Api { status: status.as_u16(), message });
        }

        let body = response.json::<MessagesResponse>().await?;
        let text: String = body
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        if text.trim().is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Keeps the last [`MAX_HISTORY`] turns, starting on a user turn.
pub fn recent_history(messages: &[ChatMessage]) -> &[ChatMessage] {
    let tail = &messages[messages.len().saturating_sub(MAX_HISTORY)..];
    let first_user = tail.iter().position(|m| m.role == ChatRole::User).unwrap_or(tail.len());
    &tail[first_user..]
}

/// System prompt for the storefront assistant, grounded in the live catalog
/// and published FAQs.
pub fn chat_system_prompt(store_name: &str, products: &[Product], faqs: &[Faq]) -> String {
    let mut prompt = format!(
        "You are the sales assistant for {store_name}, a ready-mix concrete supplier. \
         Answer questions about concrete grades, delivery methods and ordering. \
         Only quote prices listed below; prices are per cubic metre. \
         If you are unsure, suggest the customer sends an enquiry.\n\nDelivery methods: \
         normal (truck discharge at site), pump (concrete pump), tremie (underwater or deep pours).\n\nCatalog:\n"
    );
    for p in products {
        let prices: Vec<String> = DeliveryMethod::ALL
            .iter()
            .map(|m| format!("{} {} {}", m.as_str(), p.currency, p.prices.get(*m)))
            .collect();
        let stock = if p.is_purchasable() { "in stock" } else { "out of stock" };
        let _ = writeln!(prompt, "- {} (grade {}): {}; {stock}", p.name, p.grade, prices.join(", "));
    }
    if !faqs.is_empty() {
        prompt.push_str("\nFrequently asked questions:\n");
        for f in faqs {
            let _ = writeln!(prompt, "Q: {}\nA: {}", f.question, f.answer);
        }
    }
    prompt
}

pub const INSIGHTS_SYSTEM_PROMPT: &str = "You are a sales analyst for a ready-mix concrete supplier. \
    Summarise the figures you are given for the operations team in at most five short bullet points. \
    Point out notable grades, order statuses that need attention and any revenue trend. Do not invent numbers.";
