//! Candidate generation against an [`ImageModel`].
//!
//! A generation action issues up to [`GenerationPolicy::candidates`]
//! concurrent calls, each retried on rate limits according to
//! [`RetryPolicy`]. The action succeeds if at least one call yields an
//! image; otherwise it fails with the first call's reason.
//!
//! ```ignore
//! let orchestrator = Orchestrator::new(GeminiClient::new(&config)?)
//!     .with_policy(GenerationPolicy::fan_out(4));
//! let images = orchestrator.generate(&source, &prompt).await?;
//! ```

use crate::error::{AppError, Result};
use crate::image_processing::{EncodedImage, SourceImage};
use crate::model::{ImageModel, ModelRequest, ModelResponse, OutputModality};
use crate::prompt::StyleCatalog;
use crate::state::GenerationTicket;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Exponential backoff applied to rate-limited calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Factor applied to the delay after each retry.
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = self.multiplier.saturating_pow(retry.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

/// How many calls one generation action may make.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// Independent calls issued concurrently.
    pub candidates: usize,
    pub retry: RetryPolicy,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            candidates: 4,
            retry: RetryPolicy::default(),
        }
    }
}

impl GenerationPolicy {
    /// `n` concurrent calls, no retries.
    pub fn fan_out(n: usize) -> Self {
        Self {
            candidates: n,
            retry: RetryPolicy::none(),
        }
    }

    /// One call retried on rate limits.
    pub fn retrying(retry: RetryPolicy) -> Self {
        Self {
            candidates: 1,
            retry,
        }
    }

    /// Upper bound on remote calls per generation action.
    pub fn max_calls(&self) -> usize {
        self.candidates.max(1) * self.retry.max_attempts.max(1) as usize
    }
}

/// Drives an [`ImageModel`] under a [`GenerationPolicy`].
pub struct Orchestrator<M> {
    model: M,
    policy: GenerationPolicy,
    modality: OutputModality,
}

impl<M: ImageModel> Orchestrator<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            policy: GenerationPolicy::default(),
            modality: OutputModality::ImageOnly,
        }
    }

    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_modality(mut self, modality: OutputModality) -> Self {
        self.modality = modality;
        self
    }

    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Runs one generation action.
    ///
    /// Returns the accepted images in completion order, never empty.
    ///
    /// # Errors
    ///
    /// When no call produced an image: the first call's transport error, or
    /// the reason extracted from its response ([`AppError::ModelRefused`] /
    /// [`AppError::EmptyResponse`]).
    pub async fn generate(&self, source: &SourceImage, prompt: &str) -> Result<Vec<EncodedImage>> {
        let request = ModelRequest {
            image: source.clone(),
            prompt: prompt.to_string(),
            modality: self.modality,
        };
        let calls = self.policy.candidates.max(1);

        tracing::info!(
            model = self.model.name(),
            calls,
            max_calls = self.policy.max_calls(),
            "starting generation"
        );

        let finished = AtomicUsize::new(0);
        let outcomes = join_all((0..calls).map(|slot| {
            let request = &request;
            let finished = &finished;
            async move {
                let outcome = self.call_with_retry(request, slot).await;
                (finished.fetch_add(1, Ordering::Relaxed), outcome)
            }
        }))
        .await;

        let mut accepted: Vec<(usize, EncodedImage)> = Vec::new();
        for (slot, (order, outcome)) in outcomes.iter().enumerate() {
            match outcome {
                Ok(response) => match response.accepted_image() {
                    Some(image) => accepted.push((*order, image.clone())),
                    None => tracing::warn!(slot, reason = %response.failure(), "candidate rejected"),
                },
                Err(e) => tracing::warn!(slot, error = %e, "candidate call failed"),
            }
        }

        if !accepted.is_empty() {
            accepted.sort_by_key(|(order, _)| *order);
            tracing::info!(accepted = accepted.len(), calls, "generation finished");
            return Ok(accepted.into_iter().map(|(_, image)| image).collect());
        }

        let first = outcomes.into_iter().next().map(|(_, outcome)| outcome);
        let error = match first {
            Some(Ok(response)) => response.failure(),
            Some(Err(e)) => e,
            None => AppError::EmptyResponse,
        };
        tracing::warn!(error = %error, "generation produced no images");
        Err(error)
    }

    /// Runs the generation a controller ticket describes.
    pub async fn run<C: StyleCatalog>(&self, ticket: &GenerationTicket<C>) -> Result<Vec<EncodedImage>> {
        let prompt = ticket.request.prompt();
        tracing::debug!(ticket = ticket.id, catalog = C::NAME, prompt_chars = prompt.len(), "running ticket");
        self.generate(&ticket.request.source, &prompt).await
    }

    /// One call slot, retrying only on rate limits.
    async fn call_with_retry(&self, request: &ModelRequest, slot: usize) -> Result<ModelResponse> {
        let retry = &self.policy.retry;
        let max_attempts = retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.model.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let backoff = retry.delay_for(attempt);
                    let delay = backoff.max(e.retry_after().unwrap_or_default());
                    tracing::warn!(
                        slot,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelCandidate;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays a fixed sequence of outcomes and records when each call happened.
    struct ScriptedModel {
        script: Mutex<VecDeque<Result<ModelResponse>>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Result<ModelResponse>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_times(&self) -> Vec<Instant> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageModel for ScriptedModel {
        async fn generate(&self, _request: &ModelRequest) -> Result<ModelResponse> {
            self.calls.lock().unwrap().push(Instant::now());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(AppError::transport("script exhausted")))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn image(tag: &str) -> Result<ModelResponse> {
        Ok(ModelResponse::with_image(EncodedImage::new(tag, "image/png")))
    }

    fn finished(reason: &str) -> Result<ModelResponse> {
        Ok(ModelResponse {
            candidates: vec![ModelCandidate {
                finish_reason: Some(reason.to_string()),
                ..Default::default()
            }],
            block_reason: None,
        })
    }

    fn rate_limited() -> Result<ModelResponse> {
        Err(AppError::RateLimited { retry_after: None })
    }

    fn source() -> SourceImage {
        EncodedImage::new("c291cmNl", "image/png")
    }

    #[test]
    fn backoff_doubles() {
        let retry = RetryPolicy::default();
        assert_eq!(retry.delay_for(1), Duration::from_secs(2));
        assert_eq!(retry.delay_for(2), Duration::from_secs(4));
        assert_eq!(retry.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn call_budget() {
        assert_eq!(GenerationPolicy::default().max_calls(), 12);
        assert_eq!(GenerationPolicy::fan_out(4).max_calls(), 4);
        assert_eq!(GenerationPolicy::retrying(RetryPolicy::default()).max_calls(), 3);
    }

    #[tokio::test]
    async fn fan_out_keeps_only_valid_candidates() {
        let model = ScriptedModel::new(vec![
            image("a"),
            finished("IMAGE_SAFETY"),
            image("b"),
            finished("OTHER"),
        ]);
        let orchestrator = Orchestrator::new(model).with_policy(GenerationPolicy::fan_out(4));

        let images = orchestrator.generate(&source(), "prompt").await.unwrap();

        assert_eq!(images.len(), 2);
        assert_eq!(orchestrator.model().call_times().len(), 4);
    }

    #[tokio::test]
    async fn fan_out_all_failed_reports_first_reason() {
        let model = ScriptedModel::new(vec![
            finished("IMAGE_SAFETY"),
            finished("OTHER"),
            Err(AppError::transport("reset")),
            finished("RECITATION"),
        ]);
        let orchestrator = Orchestrator::new(model).with_policy(GenerationPolicy::fan_out(4));

        let err = orchestrator.generate(&source(), "prompt").await.unwrap_err();

        assert!(matches!(err, AppError::ModelRefused(ref r) if r == "IMAGE_SAFETY"));
        assert_eq!(orchestrator.model().call_times().len(), 4);
    }

    #[tokio::test]
    async fn fan_out_first_transport_error_is_surfaced() {
        let model = ScriptedModel::new(vec![
            Err(AppError::transport("connection refused")),
            finished("SAFETY"),
        ]);
        let orchestrator = Orchestrator::new(model).with_policy(GenerationPolicy::fan_out(2));

        let err = orchestrator.generate(&source(), "prompt").await.unwrap_err();
        assert!(matches!(err, AppError::Transport(ref m) if m == "connection refused"));
    }

    #[tokio::test]
    async fn empty_response_without_text() {
        let model = ScriptedModel::new(vec![finished("STOP")]);
        let orchestrator = Orchestrator::new(model).with_policy(GenerationPolicy::fan_out(1));

        let err = orchestrator.generate(&source(), "prompt").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_rate_limits_with_backoff() {
        let model = ScriptedModel::new(vec![rate_limited(), rate_limited(), image("ok")]);
        let orchestrator =
            Orchestrator::new(model).with_policy(GenerationPolicy::retrying(RetryPolicy::default()));

        let images = orchestrator.generate(&source(), "prompt").await.unwrap();

        assert_eq!(images, vec![EncodedImage::new("ok", "image/png")]);
        let times = orchestrator.model().call_times();
        assert_eq!(times.len(), 3);
        assert_eq!(times[1] - times[0], Duration::from_secs(2));
        assert_eq!(times[2] - times[1], Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let model = ScriptedModel::new(vec![rate_limited(), rate_limited(), rate_limited(), image("late")]);
        let orchestrator =
            Orchestrator::new(model).with_policy(GenerationPolicy::retrying(RetryPolicy::default()));

        let err = orchestrator.generate(&source(), "prompt").await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(orchestrator.model().call_times().len(), 3);
    }

    #[tokio::test]
    async fn non_rate_limit_error_is_not_retried() {
        let model = ScriptedModel::new(vec![
            Err(AppError::Api { status: 500, message: "boom".into() }),
            image("never"),
        ]);
        let orchestrator =
            Orchestrator::new(model).with_policy(GenerationPolicy::retrying(RetryPolicy::default()));

        let err = orchestrator.generate(&source(), "prompt").await.unwrap_err();

        assert!(matches!(err, AppError::Api { status: 500, .. }));
        assert_eq!(orchestrator.model().call_times().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn server_hint_extends_backoff() {
        let model = ScriptedModel::new(vec![
            Err(AppError::RateLimited { retry_after: Some(Duration::from_secs(10)) }),
            image("ok"),
        ]);
        let orchestrator =
            Orchestrator::new(model).with_policy(GenerationPolicy::retrying(RetryPolicy::default()));

        orchestrator.generate(&source(), "prompt").await.unwrap();

        let times = orchestrator.model().call_times();
        assert_eq!(times[1] - times[0], Duration::from_secs(10));
    }
}
