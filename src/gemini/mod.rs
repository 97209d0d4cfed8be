//! Gemini client for video analysis and thumbnail generation.
//!
//! This module provides a client that talks to the Gemini `generateContent`
//! REST endpoint with the user's own API key. Each gateway call is a single
//! attempt; failures are returned to the caller unchanged.

mod analysis;
mod messages;
mod thumbnail;

use crate::config::{Config, Credentials};
use crate::error::GatewayError;
use anyhow::Context;
use messages::{GenerateContentRequest, GenerateContentResponse};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use zeroize::Zeroize;

/// Client for Gemini `generateContent` calls.
pub(crate) struct GeminiClient {
    base_url: Url,
    api_key: String,
    analysis_model: String,
    image_model: String,
    /// Ask the analysis model to ground its answer with Google Search
    search_grounding: bool,
    client: reqwest::Client,
}

impl GeminiClient {
    /// Create a new Gemini client from configuration and credentials.
    pub(crate) fn new(config: &Config, creds: &Credentials) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .connect_timeout(Duration::from_secs(config.http.connect_timeout_secs))
            .build()
            .context("Failed to create HTTP client for GeminiClient")?;

        Ok(Self {
            base_url: parse_base_url(&config.gemini.base_url)?,
            api_key: creds.api_key().to_string(),
            analysis_model: config.gemini.analysis_model.clone(),
            image_model: config.gemini.image_model.clone(),
            search_grounding: config.gemini.search_grounding,
            client,
        })
    }

    /// URL of the `generateContent` method for a model
    fn endpoint(&self, model: &str) -> Result<Url, GatewayError> {
        Ok(self
            .base_url
            .join(&format!("models/{}:generateContent", model))?)
    }

    /// Issue one `generateContent` call and decode the response body.
    #[instrument(skip(self, request))]
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GatewayError> {
        let url = self.endpoint(model)?;

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!(status = status.as_u16(), body_len = body.len(), "Gemini responded");

        if !status.is_success() {
            return Err(GatewayError::ServerError {
                status: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!("Failed to parse Gemini response: {}", e))
        })
    }
}

impl Drop for GeminiClient {
    fn drop(&mut self) {
        // Clear API key from memory
        self.api_key.zeroize();
    }
}

/// Parse the API base URL, making sure relative joins stay under its path
fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).with_context(|| format!("Invalid Gemini base URL: {}", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_with_base(base: &str) -> GeminiClient {
        GeminiClient {
            base_url: parse_base_url(base).unwrap(),
            api_key: "test-key".into(),
            analysis_model: "gemini-2.5-flash".into(),
            image_model: "gemini-2.5-flash-image".into(),
            search_grounding: false,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_endpoint_keeps_version_path() {
        let client = client_with_base("https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(
            client.endpoint("gemini-2.5-flash").unwrap().as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(parse_base_url("not a url").is_err());
    }
}
