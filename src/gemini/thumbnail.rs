//! Thumbnail generation via a Gemini image model

use super::messages::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig, Part,
};
use super::GeminiClient;
use crate::error::GatewayError;
use crate::gateway::{AspectRatio, ThumbnailGateway};
use async_trait::async_trait;
use tracing::{info, instrument};

/// Wrap the concept prompt in the house thumbnail style
fn styled_prompt(subject: &str) -> String {
    format!(
        "high-impact cinematic viral thumbnail, 4K, vivid colors, professional lighting. Subject: {}",
        subject
    )
}

fn build_thumbnail_request(prompt: &str, aspect_ratio: AspectRatio) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(styled_prompt(prompt))],
        }],
        generation_config: Some(GenerationConfig {
            image_config: Some(ImageConfig {
                aspect_ratio: aspect_ratio.as_str().to_string(),
            }),
            ..Default::default()
        }),
        tools: None,
    }
}

/// First inline image in the response as a displayable PNG data URI
fn extract_data_uri(response: &GenerateContentResponse) -> Result<String, GatewayError> {
    response
        .first_inline_data()
        .map(|image| format!("data:image/png;base64,{}", image.data))
        .ok_or(GatewayError::NoImageData)
}

#[async_trait]
impl ThumbnailGateway for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len(), aspect_ratio = %aspect_ratio))]
    async fn generate_thumbnail(
        &self,
        prompt: &str,
        aspect_ratio: AspectRatio,
    ) -> Result<String, GatewayError> {
        let request = build_thumbnail_request(prompt, aspect_ratio);
        let response = self.generate_content(&self.image_model, &request).await?;
        let data_uri = extract_data_uri(&response)?;
        info!(encoded_len = data_uri.len(), "Thumbnail image received");
        Ok(data_uri)
    }
}
