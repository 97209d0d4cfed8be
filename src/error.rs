use thiserror::Error;

use crate::video::OVERSIZE_MESSAGE;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid config.toml: {0}")]
    InvalidConfig(#[from] toml::de::Error),

    #[error("Missing API key: set {0} in the environment or a .env file")]
    MissingApiKey(&'static str),
}

/// Errors raised by the Gemini gateways
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    #[error("Response is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("Request was blocked by the model: {0}")]
    Blocked(String),

    #[error("No image data found in the response")]
    NoImageData,
}

impl GatewayError {
    /// Human-readable message with provider payloads unwrapped one level
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::ServerError { message, .. } => unwrap_provider_message(message),
            other => other.to_string(),
        }
    }
}

/// Errors that stop a pipeline run or a regeneration request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to read video: {0}")]
    Upload(#[from] std::io::Error),

    #[error("Analysis failed: {}", .0.user_message())]
    Analysis(GatewayError),

    #[error("Thumbnail generation failed: {}", .0.user_message())]
    Thumbnail(GatewayError),

    #[error("Thumbnail regeneration failed: {}", .0.user_message())]
    Regeneration(GatewayError),

    #[error("Session was reset before the run finished")]
    Superseded,
}

/// Upload rejections detected before any network call
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{OVERSIZE_MESSAGE} ({size} bytes, limit {max_size})")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("A video is already being processed")]
    Busy,
}

/// Extract `error.message` (or a top-level `message`) from a structured
/// provider payload, falling back to the raw text.
pub fn unwrap_provider_message(raw: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(raw) else {
        return raw.to_string();
    };

    value
        .get("error")
        .and_then(|error| error.get("message"))
        .or_else(|| value.get("message"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_nested_provider_message() {
        let raw = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(unwrap_provider_message(raw), "API key not valid.");
    }

    #[test]
    fn test_unwrap_top_level_message() {
        assert_eq!(unwrap_provider_message(r#"{"message":"quota"}"#), "quota");
    }

    #[test]
    fn test_unwrap_falls_back_to_raw_text() {
        assert_eq!(unwrap_provider_message("upstream timeout"), "upstream timeout");
        assert_eq!(unwrap_provider_message(r#"{"code":500}"#), r#"{"code":500}"#);
    }

    #[test]
    fn test_server_error_user_message() {
        let error = GatewayError::ServerError {
            status: 429,
            message: r#"{"error":{"message":"Resource has been exhausted"}}"#.to_string(),
        };
        assert_eq!(error.user_message(), "Resource has been exhausted");

        let pipeline = PipelineError::Analysis(error);
        assert_eq!(
            pipeline.to_string(),
            "Analysis failed: Resource has been exhausted"
        );
    }

    #[test]
    fn test_oversize_message() {
        let error = ValidationError::FileTooLarge {
            size: 60_000_000,
            max_size: 52_428_800,
        };
        assert!(error.to_string().starts_with(OVERSIZE_MESSAGE));
        assert!(error.to_string().contains("60000000 bytes"));
    }
}
