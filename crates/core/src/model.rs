//! The request/response contract of the remote image model.
//!
//! The orchestrator only sees [`ImageModel`]; [`crate::gemini::GeminiClient`]
//! is the production implementation and tests drive scripted ones.

use crate::error::{AppError, Result};
use crate::image_processing::EncodedImage;
use async_trait::async_trait;

/// Which modalities the model is asked to return.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputModality {
    #[default]
    ImageOnly,
    ImageAndText,
}

impl OutputModality {
    pub fn as_wire(self) -> Vec<String> {
        match self {
            Self::ImageOnly => vec!["IMAGE".to_string()],
            Self::ImageAndText => vec!["IMAGE".to_string(), "TEXT".to_string()],
        }
    }
}

/// One call's worth of input.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelRequest {
    pub image: EncodedImage,
    pub prompt: String,
    pub modality: OutputModality,
}

/// One candidate from a model response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelCandidate {
    /// Completion status as reported by the API, e.g. `STOP` or `IMAGE_SAFETY`.
    pub finish_reason: Option<String>,
    pub image: Option<EncodedImage>,
    pub text: Option<String>,
}

impl ModelCandidate {
    /// A normal completion is `STOP` or no status at all.
    pub fn finished_normally(&self) -> bool {
        matches!(
            self.finish_reason.as_deref(),
            None | Some("STOP") | Some("FINISH_REASON_UNSPECIFIED")
        )
    }
}

/// A transport-level successful response.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ModelResponse {
    pub candidates: Vec<ModelCandidate>,
    /// Set when the whole prompt was blocked before any candidate was produced.
    pub block_reason: Option<String>,
}

impl ModelResponse {
    /// Wraps a single image as a normally finished response.
    pub fn with_image(image: EncodedImage) -> Self {
        Self {
            candidates: vec![ModelCandidate {
                finish_reason: Some("STOP".to_string()),
                image: Some(image),
                text: None,
            }],
            block_reason: None,
        }
    }

    /// The image of the first candidate, when that candidate finished
    /// normally and carries one.
    pub fn accepted_image(&self) -> Option<&EncodedImage> {
        let candidate = self.candidates.first()?;
        if candidate.finished_normally() {
            candidate.image.as_ref()
        } else {
            None
        }
    }

    /// Explanatory text of the first candidate, if any.
    pub fn text(&self) -> Option<&str> {
        self.candidates
            .first()
            .and_then(|c| c.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// Why this response produced no usable image.
    pub fn failure(&self) -> AppError {
        if let Some(reason) = &self.block_reason {
            return AppError::refused(reason.clone());
        }
        if let Some(candidate) = self.candidates.first() {
            if !candidate.finished_normally() {
                if let Some(reason) = &candidate.finish_reason {
                    return AppError::refused(reason.clone());
                }
            }
        }
        match self.text() {
            Some(text) => AppError::refused(text.to_string()),
            None => AppError::EmptyResponse,
        }
    }
}

/// A remote generative-image model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    /// Issues exactly one remote call.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse>;

    /// Name used in logs.
    fn name(&self) -> &str;
}
