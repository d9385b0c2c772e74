//! Application state and the transitions user actions trigger.
//!
//! The controller follows a small state machine:
//! `Idle` -> `Ready` (upload) -> `Generating` (start) -> `Ready` (complete)
//!
//! Every generation start hands out a [`GenerationTicket`]. Only the ticket
//! of the latest request may commit a result; uploads and newer requests
//! bump the counter, so a response that arrives late is dropped instead of
//! overwriting newer state.

use crate::error::{AppError, Result};
use crate::image_processing::{EncodedImage, ImageProcessor, SourceImage};
use crate::prompt::{
    BlurLevel, HexColor, LineThickness, OutlineDistance, Portrait, PortraitBackground,
    PortraitStyle, ShadingLevel, Sticker, StickerBackground, StickerStyle, StyleCatalog,
    WatercolorVariant,
};
use std::path::Path;

const NO_IMAGE: &str = "Please upload an image first.";
const NO_STYLE: &str = "Please select a style first.";
const LOAD_FAILED: &str = "Failed to load the image. Please try another file.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No image uploaded yet.
    Idle,
    /// Image present, nothing in flight.
    Ready,
    /// A request is in flight.
    Generating,
}

/// The candidates of one generation plus the one being previewed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenerationResult {
    images: Vec<EncodedImage>,
    selected: usize,
}

impl GenerationResult {
    pub fn new(images: Vec<EncodedImage>) -> Self {
        Self { images, selected: 0 }
    }

    pub fn images(&self) -> &[EncodedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        (!self.images.is_empty()).then_some(self.selected)
    }

    pub fn selected(&self) -> Option<&EncodedImage> {
        self.images.get(self.selected)
    }
}

/// Everything the orchestrator needs for one generation action.
#[derive(Clone, Debug)]
pub struct GenerationRequest<C: StyleCatalog> {
    pub source: SourceImage,
    pub style: C::Style,
    pub modifiers: C::Modifiers,
}

impl<C: StyleCatalog> GenerationRequest<C> {
    pub fn prompt(&self) -> String {
        C::compose(self.style, &self.modifiers)
    }
}

/// Proof that a generation was started; pass its id back to
/// [`Controller::complete`].
#[derive(Clone, Debug)]
pub struct GenerationTicket<C: StyleCatalog> {
    pub id: u64,
    pub request: GenerationRequest<C>,
}

/// Holds the current selections, the uploaded image, and the last result.
#[derive(Clone, Debug)]
pub struct Controller<C: StyleCatalog> {
    source: Option<SourceImage>,
    style: Option<C::Style>,
    modifiers: C::Modifiers,
    result: GenerationResult,
    phase: Phase,
    error: Option<String>,
    dirty: bool,
    auto_regenerate: bool,
    latest_request: u64,
    in_flight: Option<u64>,
}

impl<C: StyleCatalog> Default for Controller<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: StyleCatalog> Controller<C> {
    pub fn new() -> Self {
        Self {
            source: None,
            style: None,
            modifiers: C::Modifiers::default(),
            result: GenerationResult::default(),
            phase: Phase::Idle,
            error: None,
            dirty: true,
            auto_regenerate: false,
            latest_request: 0,
            in_flight: None,
        }
    }

    /// Starts a generation whenever a selection changes.
    pub fn with_auto_regenerate(mut self, enabled: bool) -> Self {
        self.auto_regenerate = enabled;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Generating
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn style(&self) -> Option<C::Style> {
        self.style
    }

    pub fn modifiers(&self) -> &C::Modifiers {
        &self.modifiers
    }

    pub fn result(&self) -> &GenerationResult {
        &self.result
    }

    pub fn selected_candidate(&self) -> Option<&EncodedImage> {
        self.result.selected()
    }

    /// Whether the "generate" action would be accepted right now.
    pub fn can_generate(&self) -> bool {
        self.source.is_some()
            && self.style.is_some()
            && self.phase != Phase::Generating
            && (self.dirty || self.result.is_empty())
    }

    /// Replaces the source image and resets every selection to defaults.
    ///
    /// Allowed in any phase. A request still in flight is not cancelled but
    /// its completion will be discarded.
    pub fn upload(&mut self, source: SourceImage) {
        tracing::info!(mime_type = %source.mime_type, catalog = C::NAME, "image uploaded");
        self.source = Some(source);
        self.style = Some(C::default_style());
        self.modifiers = C::Modifiers::default();
        self.result = GenerationResult::default();
        self.error = None;
        self.dirty = true;
        self.phase = Phase::Ready;
        self.latest_request += 1;
        self.in_flight = None;
    }

    /// Reads a file and uploads it. On failure the error text is set and
    /// the current image, if any, is kept.
    pub fn upload_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match ImageProcessor::load_file(path) {
            Ok(source) => {
                self.upload(source);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "image upload failed");
                self.error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Drag-and-drop entry point: anything that is not PNG or JPEG is
    /// ignored without touching state. Returns whether the drop was taken.
    pub fn drop_bytes(&mut self, bytes: &[u8]) -> bool {
        match ImageProcessor::encode_bytes(bytes) {
            Ok(source) => {
                self.upload(source);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "ignoring dropped file");
                false
            }
        }
    }

    pub fn set_style(&mut self, style: C::Style) -> Option<GenerationTicket<C>> {
        self.change(Some(style), |_| {})
    }

    /// Applies `update` to the modifiers, then resets whatever the current
    /// style does not use.
    pub fn update_modifiers(
        &mut self,
        update: impl FnOnce(&mut C::Modifiers),
    ) -> Option<GenerationTicket<C>> {
        self.change(None, update)
    }

    fn change(
        &mut self,
        style: Option<C::Style>,
        update: impl FnOnce(&mut C::Modifiers),
    ) -> Option<GenerationTicket<C>> {
        if let Some(style) = style {
            self.style = Some(style);
        }
        update(&mut self.modifiers);
        if let Some(style) = self.style {
            C::reset_irrelevant(style, &mut self.modifiers);
        }
        self.dirty = true;

        if !self.auto_regenerate {
            return None;
        }
        match (self.source.clone(), self.style) {
            (Some(source), Some(style)) => Some(self.begin(source, style)),
            _ => None,
        }
    }

    /// Validates the selections and moves to `Generating`.
    ///
    /// # Errors
    ///
    /// [`AppError::InputMissing`] without an image or style (the inline
    /// error text is set too), [`AppError::GenerationInFlight`] while a
    /// request runs, [`AppError::NothingChanged`] when the current result is
    /// already up to date.
    pub fn start_generation(&mut self) -> Result<GenerationTicket<C>> {
        let Some(source) = self.source.clone() else {
            self.error = Some(NO_IMAGE.to_string());
            return Err(AppError::input_missing(NO_IMAGE));
        };
        let Some(style) = self.style else {
            self.error = Some(NO_STYLE.to_string());
            return Err(AppError::input_missing(NO_STYLE));
        };
        if self.phase == Phase::Generating {
            return Err(AppError::GenerationInFlight);
        }
        if !self.dirty && !self.result.is_empty() {
            return Err(AppError::NothingChanged);
        }
        Ok(self.begin(source, style))
    }

    fn begin(&mut self, source: SourceImage, style: C::Style) -> GenerationTicket<C> {
        self.latest_request += 1;
        self.in_flight = Some(self.latest_request);
        self.phase = Phase::Generating;
        self.error = None;
        self.dirty = false;
        self.result = GenerationResult::default();

        tracing::info!(id = self.latest_request, %style, catalog = C::NAME, "generation started");
        GenerationTicket {
            id: self.latest_request,
            request: GenerationRequest {
                source,
                style,
                modifiers: self.modifiers.clone(),
            },
        }
    }

    /// Commits the outcome of the request `ticket_id`.
    ///
    /// Returns `false` and leaves state untouched when a newer request or
    /// upload superseded the ticket.
    pub fn complete(&mut self, ticket_id: u64, outcome: Result<Vec<EncodedImage>>) -> bool {
        if self.in_flight != Some(ticket_id) {
            tracing::debug!(ticket_id, latest = self.latest_request, "discarding stale generation result");
            return false;
        }

        self.in_flight = None;
        self.phase = Phase::Ready;

        match outcome {
            Ok(images) if !images.is_empty() => {
                tracing::info!(ticket_id, candidates = images.len(), "generation committed");
                self.result = GenerationResult::new(images);
                self.error = None;
            }
            Ok(_) => self.fail(AppError::EmptyResponse),
            Err(e) => self.fail(e),
        }
        true
    }

    fn fail(&mut self, error: AppError) {
        tracing::warn!(error = %error, "generation failed");
        self.result = GenerationResult::default();
        self.error = Some(format!("Generation failed: {error}"));
        self.dirty = true;
    }

    /// Changes the previewed candidate. Returns `false` when nothing changed.
    pub fn select_candidate(&mut self, index: usize) -> bool {
        if index >= self.result.len() || index == self.result.selected {
            return false;
        }
        self.result.selected = index;
        true
    }
}

impl Controller<Portrait> {
    /// Shading only exists for sketches, so picking a level selects
    /// [`PortraitStyle::Sketch`].
    pub fn set_shading(&mut self, level: ShadingLevel) -> Option<GenerationTicket<Portrait>> {
        self.change(Some(PortraitStyle::Sketch), |m| m.shading = level)
    }

    pub fn set_background(&mut self, background: PortraitBackground) -> Option<GenerationTicket<Portrait>> {
        self.change(None, |m| m.background = background)
    }

    pub fn set_background_color(&mut self, color: HexColor) -> Option<GenerationTicket<Portrait>> {
        self.change(None, |m| m.color = color)
    }
}

impl Controller<Sticker> {
    pub fn set_shading(&mut self, level: ShadingLevel) -> Option<GenerationTicket<Sticker>> {
        self.change(Some(StickerStyle::Sketch), |m| m.shading = level)
    }

    pub fn set_blur(&mut self, level: BlurLevel) -> Option<GenerationTicket<Sticker>> {
        self.change(Some(StickerStyle::BlackAndWhite), |m| m.blur = level)
    }

    pub fn set_watercolor(&mut self, variant: WatercolorVariant) -> Option<GenerationTicket<Sticker>> {
        self.change(Some(StickerStyle::Watercolor), |m| m.watercolor = variant)
    }

    pub fn set_thickness(&mut self, value: f32) -> Option<GenerationTicket<Sticker>> {
        self.change(None, |m| m.thickness = LineThickness(value))
    }

    pub fn set_background(&mut self, background: StickerBackground) -> Option<GenerationTicket<Sticker>> {
        self.change(None, |m| m.background = background)
    }

    /// Ignored (reset to 0) unless the background is transparent.
    pub fn set_outline(&mut self, value: f32) -> Option<GenerationTicket<Sticker>> {
        self.change(None, |m| m.outline = OutlineDistance(value))
    }
}
