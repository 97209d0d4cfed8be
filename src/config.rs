//! Application configuration
//!
//! Static settings come from the embedded `config.toml`; model names and the
//! API base URL can be overridden from the environment (or a `.env` file).
//! The API key is only ever read from the environment.

use crate::error::AppError;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroize;

const CONFIG_TOML: &str = include_str!("../config.toml");

/// Environment variables checked for the API key, in order
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    pub(crate) gemini: GeminiConfig,
    pub(crate) http: HttpConfig,
    #[serde(default)]
    pub(crate) output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GeminiConfig {
    pub(crate) base_url: String,
    pub(crate) analysis_model: String,
    pub(crate) image_model: String,
    #[serde(default)]
    pub(crate) search_grounding: bool,
}

/// Transport-level limits for the HTTP client
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct HttpConfig {
    pub(crate) timeout_secs: u64,
    pub(crate) connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OutputConfig {
    /// Where thumbnails are written (None = Pictures/Viralyze)
    pub(crate) directory: Option<PathBuf>,
}

/// Load configuration from embedded config.toml plus environment overrides
pub(crate) fn load_config() -> Result<Config, AppError> {
    let config = parse_config(CONFIG_TOML)?;
    Ok(apply_overrides(config, |key| std::env::var(key).ok()))
}

fn parse_config(contents: &str) -> Result<Config, AppError> {
    let config: Config = toml::from_str(contents)?;
    if config.gemini.base_url.trim().is_empty() {
        return Err(AppError::Config("gemini.base_url must not be empty".into()));
    }
    Ok(config)
}

fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(base_url) = non_empty("VIRALYZE_BASE_URL") {
        config.gemini.base_url = base_url;
    }
    if let Some(model) = non_empty("VIRALYZE_ANALYSIS_MODEL") {
        config.gemini.analysis_model = model;
    }
    if let Some(model) = non_empty("VIRALYZE_IMAGE_MODEL") {
        config.gemini.image_model = model;
    }
    if let Some(flag) = non_empty("VIRALYZE_SEARCH_GROUNDING") {
        config.gemini.search_grounding =
            matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
    }
    if let Some(dir) = non_empty("VIRALYZE_OUTPUT_DIR") {
        config.output.directory = Some(PathBuf::from(dir));
    }
    config
}

/// Gemini API credential.
///
/// Cleared from memory on drop and never printed.
pub(crate) struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Read the API key from the process environment
    pub(crate) fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        API_KEY_VARS
            .iter()
            .find_map(|key| lookup(key).filter(|value| !value.trim().is_empty()))
            .map(|api_key| Self {
                api_key: api_key.trim().to_string(),
            })
            .ok_or(AppError::MissingApiKey(API_KEY_VARS[0]))
    }

    pub(crate) fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Drop for Credentials {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
