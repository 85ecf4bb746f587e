//! Image labeling client used to suggest product tags.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::instrument;

use crate::config::VisionConfig;

const MAX_LABELS: u32 = 10;

/// Labels below this confidence are not offered as tags.
pub const MIN_TAG_SCORE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub description: String,
    #[serde(default)]
    pub score: f32,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateResult {
    #[serde(default)]
    label_annotations: Vec<Label>,
    error: Option<StatusBody>,
}

#[derive(Debug, Deserialize)]
struct StatusBody { message: String }

#[derive(Debug, Deserialize)]
struct ErrorEnvelope { error: StatusBody }

#[derive(Clone)]
pub struct VisionClient {
    client: reqwest::Client,
    api_key: SecretString,
    api_base: String,
}

impl VisionClient {
    pub fn new(config: &VisionConfig) -> Result<Self, VisionError> {
        Ok(Self {
            client: super::http_client()?,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    #[instrument(skip(self))]
    pub async fn label_image(&self, image_url: &str) -> Result<Vec<Label>, VisionError> {
        let body = json!({
            "requests": [{
                "image": { "source": { "imageUri": image_url } },
                "features": [{ "type": "LABEL_DETECTION", "maxResults": MAX_LABELS }]
            }]
        });
        let response = self
            .client
            .post(format!("{}/v1/images:annotate", self.api_base))
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorEnvelope>().await {
                Ok(e) => e.error.message,
                Err(_) => status.to_string(),
            };
            return Err(VisionError::Api { status: status.as_u16(), message });
        }

        let result = response.json::<AnnotateResponse>().await?.responses.into_iter().next();
        match result {
            Some(AnnotateResult { error: Some(e), .. }) => Err(VisionError::Api { status: status.as_u16(), message: e.message }),
            Some(r) => {
                tracing::debug!(labels = r.label_annotations.len(), "Image labeled");
                Ok(r.label_annotations)
            }
            None => Ok(vec![]),
        }
    }
}

/// Lowercased, de-duplicated descriptions of confident labels, best first.
pub fn suggest_tags(labels: &[Label]) -> Vec<String> {
    let mut confident: Vec<&Label> = labels.iter().filter(|l| l.score >= MIN_TAG_SCORE).collect();
    confident.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut tags: Vec<String> = Vec::new();
    for label in confident {
        let tag = label.description.trim().to_lowercase();
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

/// Existing tags followed by new ones not already present.
pub fn merge_tags(existing: &[String], suggested: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for tag in suggested {
        if !merged.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            merged.push(tag.clone());
        }
    }
    merged
}
