use std::env;
use std::time::Duration;
use crate::error::{AppError, Result};
use dotenvy::dotenv;
use url::Url;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Process-wide configuration, loaded once at startup.
///
/// Loading fails fast when no API key is available; nothing else in the
/// library reads the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub model_name: String,
    pub base_url: Url,
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let api_key = env::var("GEMINI_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::MissingEnvVar("GEMINI_API_KEY".to_string()))?;

        let mut config = Self::new(api_key)?;

        if let Ok(model) = env::var("GEMINI_MODEL") {
            config.model_name = model;
        }

        if let Ok(base) = env::var("GEMINI_BASE_URL") {
            config.base_url = parse_base_url(&base)?;
        }

        if let Ok(secs) = env::var("GEMINI_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| AppError::config(format!("GEMINI_TIMEOUT_SECS is not a number: {secs}")))?;
            config.request_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Builds a configuration with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AppError::config("API key must not be empty"));
        }

        Ok(Self {
            gemini_api_key: api_key,
            model_name: DEFAULT_MODEL.to_string(),
            base_url: parse_base_url(DEFAULT_BASE_URL)?,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Model path segment without a leading `models/`.
    pub fn model_id(&self) -> &str {
        self.model_name
            .strip_prefix("models/")
            .unwrap_or(&self.model_name)
    }
}

/// Parses a base URL, forcing a trailing slash so `Url::join` appends
/// instead of replacing the last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| AppError::Config(format!("Invalid base URL: {}", e)))
}
