use crate::config::Config;
use crate::error::{AppError, Result};
use crate::image_processing::EncodedImage;
use crate::model::{ImageModel, ModelCandidate, ModelRequest, ModelResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Gemini `generateContent` client for image output.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: Url,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let model = config.model_id().to_string();
        let endpoint = config
            .base_url
            .join(&format!("models/{model}:generateContent"))
            .map_err(|e| AppError::Config(format!("Invalid model endpoint: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.gemini_api_key.clone(),
            model,
            endpoint,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    /// Sends the image and the instruction text in one request.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let body = GeminiRequest::from_model_request(request);

        tracing::debug!(
            model = %self.model,
            prompt_chars = request.prompt.len(),
            image_bytes = request.image.approx_len(),
            "sending generateContent"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let text = response.text().await.unwrap_or_default();
            return Err(parse_error(status.as_u16(), retry_after, &text));
        }

        let text = response.text().await?;
        let parsed: GeminiResponse = serde_json::from_str(&text)
            .map_err(|e| AppError::transport(format!("Malformed response: {}", e)))?;

        Ok(parsed.into_model_response())
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Maps a non-success HTTP response to an error kind by status code.
fn parse_error(status: u16, retry_after: Option<Duration>, body: &str) -> AppError {
    let api_error = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| body.trim().chars().take(500).collect());
    let api_status = api_error.and_then(|e| e.status);

    match status {
        429 => AppError::RateLimited { retry_after },
        _ if api_status.as_deref() == Some("RESOURCE_EXHAUSTED") => {
            AppError::RateLimited { retry_after }
        }
        401 | 403 => AppError::Auth(message),
        _ => AppError::Api { status, message },
    }
}

// Request/Response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiRequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiRequestPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiConfig {
    response_modalities: Vec<String>,
}

impl GeminiRequest {
    fn from_model_request(request: &ModelRequest) -> Self {
        let parts = vec![
            GeminiRequestPart::InlineData {
                inline_data: InlineData {
                    mime_type: request.image.mime_type.clone(),
                    data: request.image.data.clone(),
                },
            },
            GeminiRequestPart::Text {
                text: request.prompt.clone(),
            },
        ];

        Self {
            contents: vec![GeminiContent { parts }],
            generation_config: GeminiConfig {
                response_modalities: request.modality.as_wire(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
    #[serde(default)]
    block_reason_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiResponse {
    fn into_model_response(self) -> ModelResponse {
        let block_reason = self.prompt_feedback.and_then(|feedback| {
            let reason = feedback.block_reason?;
            Some(feedback.block_reason_message.unwrap_or(reason))
        });

        let candidates = self
            .candidates
            .into_iter()
            .map(|candidate| {
                let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
                let mut image = None;
                let mut texts = Vec::new();
                for part in parts {
                    if let Some(text) = part.text {
                        texts.push(text);
                    }
                    if image.is_none() {
                        image = part
                            .inline_data
                            .map(|data| EncodedImage::new(data.data, data.mime_type));
                    }
                }
                ModelCandidate {
                    finish_reason: candidate.finish_reason,
                    image,
                    text: (!texts.is_empty()).then(|| texts.join("\n")),
                }
            })
            .collect();

        ModelResponse {
            candidates,
            block_reason,
        }
    }
}
