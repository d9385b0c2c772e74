//! AI-Styler Core Library
//!
//! Turns an uploaded photo into stylised renditions (portraits or stickers)
//! using an image-capable Gemini model.
//!
//! # Overview
//!
//! - **Prompt composition**: closed style catalogs and their modifiers via [`prompt`]
//! - **Image handling**: Base64 encoding and PNG export via [`image_processing`]
//! - **Generation**: fan-out and rate-limit retries via [`orchestrator`]
//! - **State**: the upload/select/generate workflow via [`state`]
//!
//! # Quick Start
//!
//! ```ignore
//! use ai_styler_core::{Controller, Styler};
//! use ai_styler_core::prompt::{Sticker, StickerStyle};
//!
//! let styler = Styler::new()?;
//! let mut controller = Controller::<Sticker>::new();
//! controller.upload_file("me.jpg")?;
//! controller.set_style(StickerStyle::Watercolor);
//! let ticket = controller.start_generation()?;
//! styler.fulfil(&mut controller, ticket).await;
//! ```
//!
//! # Module Structure
//!
//! - [`config`]: Configuration loading from the environment
//! - [`download`]: Writing candidates to disk
//! - [`error`]: Error types and result aliases
//! - [`gemini`]: Gemini `generateContent` transport
//! - [`image_processing`]: Encoding and format checks
//! - [`model`]: The [`ImageModel`] seam
//! - [`orchestrator`]: Candidate fan-out and retries
//! - [`prompt`]: Style catalogs and prompt text
//! - [`settings`]: Persisted user preferences
//! - [`state`]: The workflow controller

pub mod config;
pub mod download;
pub mod error;
pub mod gemini;
pub mod image_processing;
pub mod model;
pub mod orchestrator;
pub mod prompt;
pub mod settings;
pub mod state;

// Re-export primary types for convenience
pub use config::Config;
pub use error::{AppError, Result};
pub use gemini::GeminiClient;
pub use image_processing::{EncodedImage, ImageProcessor, SourceImage};
pub use model::{ImageModel, ModelRequest, ModelResponse};
pub use orchestrator::{GenerationPolicy, Orchestrator, RetryPolicy};
pub use settings::Settings;
pub use state::{Controller, GenerationResult, GenerationTicket, Phase};

use prompt::StyleCatalog;

/// Main entry point wiring configuration, the Gemini transport and the
/// orchestrator together.
pub struct Styler {
    config: Config,
    orchestrator: Orchestrator<GeminiClient>,
}

impl Styler {
    /// Loads configuration from the environment (including `.env` files)
    /// and uses the default generation policy.
    ///
    /// # Errors
    ///
    /// Returns an error if no API key is configured or the HTTP client
    /// cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?, GenerationPolicy::default())
    }

    pub fn with_config(config: Config, policy: GenerationPolicy) -> Result<Self> {
        let client = GeminiClient::new(&config)?;
        Ok(Self {
            config,
            orchestrator: Orchestrator::new(client).with_policy(policy),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> &Orchestrator<GeminiClient> {
        &self.orchestrator
    }

    /// Runs `ticket` and commits the outcome to `controller`.
    ///
    /// Returns `false` if the controller moved on before the call finished.
    pub async fn fulfil<C: StyleCatalog>(
        &self,
        controller: &mut Controller<C>,
        ticket: GenerationTicket<C>,
    ) -> bool {
        let outcome = self.orchestrator.run(&ticket).await;
        controller.complete(ticket.id, outcome)
    }
}

/// Initializes the library by loading environment variables.
///
/// Call this once at application startup before using any other functions.
pub fn init() {
    let _ = dotenvy::dotenv();
}
