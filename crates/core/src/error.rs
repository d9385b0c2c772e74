//! Error types for the ai-styler-core library.
//!
//! Every failure that can leave the library is an [`AppError`]. The
//! orchestrator and the state controller rely on [`AppError::is_retryable`]
//! to decide what is worth another attempt; classification happens where
//! the error is created (status codes in the transport).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur within the ai-styler-core library.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (missing keys, invalid values).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required environment variable was not found.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// No source image or no style was selected when generation was requested.
    #[error("{0}")]
    InputMissing(String),

    /// A generation is already running for the current selections.
    #[error("A generation is already in progress")]
    GenerationInFlight,

    /// The current result already reflects the current selections.
    #[error("Nothing changed since the last generation")]
    NothingChanged,

    /// The source file could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The payload is not a PNG or JPEG image.
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Base64 payload could not be decoded.
    #[error("Failed to decode image data: {0}")]
    Decode(String),

    /// Image processing or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Rate limited by the remote model.
    #[error("Rate limited by the image model, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// The model returned an abnormal completion or an explanation instead of an image.
    #[error("The model declined the request: {0}")]
    ModelRefused(String),

    /// The call succeeded but carried neither an image nor any text.
    #[error("No image was generated. The model may have declined the request.")]
    EmptyResponse,

    /// Network or protocol failure talking to the remote model.
    #[error("Transport error: {0}")]
    Transport(String),

    /// API key rejected by the remote model.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP status that is not otherwise classified.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an input validation error with the given message.
    pub fn input_missing(msg: impl Into<String>) -> Self {
        Self::InputMissing(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a model refusal with the given reason.
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::ModelRefused(reason.into())
    }

    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Returns true if the error is a rate limit and worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns the server-suggested delay, if the error carried one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_are_retryable() {
        assert!(AppError::RateLimited { retry_after: None }.is_retryable());

        assert!(!AppError::transport("connection reset").is_retryable());
        assert!(!AppError::refused("SAFETY").is_retryable());
        assert!(!AppError::EmptyResponse.is_retryable());
        assert!(!AppError::Api { status: 500, message: "boom".into() }.is_retryable());
        assert!(!AppError::input_missing("no image").is_retryable());
    }

    #[test]
    fn retry_after_only_from_rate_limit() {
        let err = AppError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(AppError::EmptyResponse.retry_after(), None);
    }

    #[test]
    fn display_messages() {
        assert_eq!(
            AppError::refused("SAFETY").to_string(),
            "The model declined the request: SAFETY"
        );
        assert_eq!(
            AppError::input_missing("Please upload an image first.").to_string(),
            "Please upload an image first."
        );
        let err = AppError::Read {
            path: PathBuf::from("missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Failed to read missing.png: not found");
    }
}
