//! Prompt composition.
//!
//! A prompt is assembled from `###`-headed sections so the model can tell
//! style instructions apart from output rules. Each app revision ships its
//! own closed set of styles and modifiers as a separate catalog
//! ([`portrait::Portrait`], [`sticker::Sticker`]) behind the
//! [`StyleCatalog`] trait.
//!
//! Every function here is a pure string builder: the same selection always
//! produces a byte-identical prompt.

pub mod modifiers;
pub mod portrait;
pub mod sticker;

pub use modifiers::{
    BlurLevel, HexColor, LineThickness, OutlineDistance, ShadingLevel, WatercolorVariant,
};
pub use portrait::{Portrait, PortraitBackground, PortraitModifiers, PortraitStyle};
pub use sticker::{Sticker, StickerBackground, StickerModifiers, StickerStyle};

use std::fmt;
use std::str::FromStr;

/// A closed catalog of styles and the modifiers that refine them.
pub trait StyleCatalog {
    type Style: Copy + Eq + fmt::Debug + fmt::Display + FromStr + Send + Sync + 'static;
    type Modifiers: Clone + PartialEq + fmt::Debug + Default + Send + Sync;

    /// Short identifier of the revision, used in logs and the CLI.
    const NAME: &'static str;

    /// All styles in display order.
    fn styles() -> &'static [Self::Style];

    /// Style selected when a new image is uploaded.
    fn default_style() -> Self::Style;

    /// Resets every modifier that has no meaning for `style`.
    fn reset_irrelevant(style: Self::Style, modifiers: &mut Self::Modifiers);

    /// Builds the instruction text sent alongside the image.
    fn compose(style: Self::Style, modifiers: &Self::Modifiers) -> String;

    /// Whether the composed prompt asks for a transparent background.
    fn wants_transparency(_modifiers: &Self::Modifiers) -> bool {
        false
    }
}

/// Opening line shared by every revision.
pub(crate) const PREAMBLE: &str =
    "Transform the given image according to the following instructions.";

/// Collects prompt sections and joins them with blank lines.
pub(crate) struct Sections {
    parts: Vec<String>,
}

impl Sections {
    pub(crate) fn new(preamble: &str) -> Self {
        Self {
            parts: vec![preamble.to_string()],
        }
    }

    pub(crate) fn push(&mut self, header: &str, body: impl AsRef<str>) {
        self.parts.push(format!("{header}\n{}", body.as_ref()));
    }

    pub(crate) fn finish(self) -> String {
        self.parts.join("\n\n").trim().to_string()
    }
}

/// Output rules appended to every prompt.
pub(crate) fn output_rules(transparent: bool) -> String {
    let mut rules = vec![
        "-   **Important**: The final response must contain only the generated image.",
        "-   Do not include any kind of text in the response: no descriptions, titles, or annotations.",
        "-   Return image data only.",
    ];
    if transparent {
        rules.push(
            "-   The background must be fully transparent (alpha channel). Do not fill it with any color.",
        );
    }
    rules.join("\n")
}

pub(crate) const OUTPUT_RULES_HEADER: &str = "### Output Rules ###";

/// Rounds a continuous control value to a table level.
///
/// Returns `None` for non-finite values and for anything that rounds
/// outside `min..=max`.
pub(crate) fn round_level(value: f32, min: u8, max: u8) -> Option<u8> {
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < f32::from(min) || rounded > f32::from(max) {
        return None;
    }
    Some(rounded as u8)
}

/// Parses a style or modifier name case-insensitively, accepting `-`/`_`
/// and spaces interchangeably.
pub(crate) fn normalize_name(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, '-' | '_' | ' '))
        .collect()
}
