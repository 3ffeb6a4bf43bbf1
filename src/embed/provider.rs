//! Adapter for the external embedding provider.
//!
//! The provider is a black box behind `EmbeddingProvider`: a list of
//! texts in, one vector per text out, order preserved. `OpenAiProvider`
//! talks to any OpenAI-compatible `/embeddings` endpoint.

use serde::Deserialize;
use std::time::Duration;

/// Request timeout; embedding batches of 100 posts can take a while.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("embedding request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("embedding API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("embedding API response malformed: {0}")]
    Malformed(String),
}

/// One vector per input text, in input order.
pub trait EmbeddingProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}

pub struct OpenAiProvider {
    api_base: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Self {
        let api_base = api_base.strip_suffix('/').unwrap_or(api_base).to_string();

        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());

        Self {
            api_base,
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        }
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl EmbeddingProvider for OpenAiProvider {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.api_base);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "model": self.model,
                "input": texts,
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json()?;
        if parsed.data.len() != texts.len() {
            return Err(ProviderError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_stripped() {
        let provider = OpenAiProvider::new("https://api.openai.com/v1/", "key", "model");
        assert_eq!(provider.api_base(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_empty_input_short_circuits() {
        // No request is made for an empty batch, so a bogus endpoint is fine.
        let provider = OpenAiProvider::new("http://localhost:1", "key", "model");
        let result = provider.embed(&[]).unwrap();
        assert!(result.is_empty());
    }
}
