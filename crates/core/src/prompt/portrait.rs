//! The portrait revision: four painterly styles and a choice between keeping
//! the original background or replacing it with a solid color.

use crate::error::AppError;
use crate::prompt::modifiers::{HexColor, LineThickness, ShadingLevel};
use crate::prompt::{normalize_name, output_rules, Sections, StyleCatalog, OUTPUT_RULES_HEADER, PREAMBLE};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortraitStyle {
    Ghibli,
    Pixar,
    Illustration,
    Sketch,
}

impl PortraitStyle {
    pub const ALL: [PortraitStyle; 4] = [Self::Ghibli, Self::Pixar, Self::Illustration, Self::Sketch];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ghibli => "ghibli",
            Self::Pixar => "pixar",
            Self::Illustration => "illustration",
            Self::Sketch => "sketch",
        }
    }

    fn base_description(self) -> &'static str {
        match self {
            Self::Ghibli => {
                "Do not simply imitate the original photo; recreate it entirely as a scene from a Studio Ghibli animated film. \
                 Capture Ghibli's hand-painted texture, soft and warm colors, and lyrical, dreamlike atmosphere. \
                 Characters should be richly expressive. \
                 If the original has a background, paint that background as a detailed, beautiful watercolor-style scene as well. \
                 Use the original composition as a reference, but avoid realistic rendering and push the artistic interpretation as far as possible. \
                 The result must be beautiful animation artwork, not a photograph."
            }
            Self::Pixar => {
                "Recreate the original image entirely as charming 3D character art that could appear in a Pixar animated film. \
                 Avoid realistic rendering; emphasise Pixar's exaggerated, emotional expressions, large lively eyes, and soft rounded shapes. \
                 Render skin, hair, and clothing textures so they look appealing and stylish rather than realistic. \
                 Use warm, vivid colors and cinematic lighting to bring the character to life. \
                 The result must be lovable 3D animated character art, not a photograph."
            }
            Self::Illustration => {
                "Convert the original image into a modern vector portrait illustration. \
                 The style features clear, clean lines, flat cel shading with solid-color shadows, and separated color blocks. \
                 Never use gradient effects. \
                 Most importantly, keep the main shapes and structure of the original image unchanged. \
                 The result must be refined, minimal vector art."
            }
            Self::Sketch => {
                "A clean black-and-white line-art sketch of the subject. \
                 Preserve the subject's key features and forms accurately."
            }
        }
    }

    fn forbids_photorealism(self) -> bool {
        matches!(self, Self::Ghibli | Self::Pixar)
    }
}

impl fmt::Display for PortraitStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PortraitStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| AppError::config(format!("Unknown portrait style: {s}")))
    }
}

/// How the background of the source image is treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PortraitBackground {
    /// Restyle the whole image, background included.
    #[default]
    Original,
    /// Replace the background with [`PortraitModifiers::color`].
    SolidColor,
}

impl FromStr for PortraitBackground {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "original" | "keep" => Ok(Self::Original),
            "color" | "solidcolor" | "solid" => Ok(Self::SolidColor),
            _ => Err(AppError::config(format!("Unknown background mode: {s}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PortraitModifiers {
    /// Only read for [`PortraitStyle::Sketch`].
    pub shading: ShadingLevel,
    pub background: PortraitBackground,
    /// Only read for [`PortraitBackground::SolidColor`].
    pub color: HexColor,
}

fn background_instruction(modifiers: &PortraitModifiers) -> String {
    match modifiers.background {
        PortraitBackground::SolidColor => {
            let color = &modifiers.color;
            format!(
                "Remove the background of the original image and replace it with the specified solid background color ({color}). \
                 The main subject must stay sharp and centered. \
                 Keep the original composition and change only the background to the solid color. \
                 Very important: the final image must never contain color palettes, color swatches, UI elements, text, or numbers. \
                 It must contain only the stylized subject on the solid background. \
                 If the background of the original image is already transparent, apply the style to the main subject only and fill the background with the color {color}."
            )
        }
        PortraitBackground::Original => "If the original image has a background, transform the entire image, background included, into the requested style. \
             Keep the composition and overall mood of the original, but reinterpret every element in the chosen style. \
             Do not remove the background or turn it into a solid color. \
             If the background of the original image is transparent, apply the style to the main subject only and keep the transparent background as it is. \
             Do not add a new background."
            .to_string(),
    }
}

/// Marker type for the portrait catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct Portrait;

impl StyleCatalog for Portrait {
    type Style = PortraitStyle;
    type Modifiers = PortraitModifiers;

    const NAME: &'static str = "portrait";

    fn styles() -> &'static [PortraitStyle] {
        &PortraitStyle::ALL
    }

    fn default_style() -> PortraitStyle {
        PortraitStyle::Ghibli
    }

    fn reset_irrelevant(style: PortraitStyle, modifiers: &mut PortraitModifiers) {
        if style != PortraitStyle::Sketch {
            modifiers.shading = ShadingLevel::default();
        }
    }

    fn compose(style: PortraitStyle, modifiers: &PortraitModifiers) -> String {
        let mut style_text = style.base_description().to_string();
        if style == PortraitStyle::Sketch {
            style_text.push(' ');
            style_text.push_str(modifiers.shading.instruction());
        }
        style_text.push(' ');
        style_text.push_str(&background_instruction(modifiers));

        let mut sections = Sections::new(PREAMBLE);
        sections.push("### **Style Instructions**", style_text);

        if style != PortraitStyle::Sketch {
            sections.push("### **Line Thickness**", LineThickness::MEDIUM.instruction());
        }

        if style.forbids_photorealism() {
            sections.push(
                "### **Styles to Avoid**",
                "The result must never be a photorealistic image (photorealistic, photo) or a 3D render (3D render).",
            );
        }

        sections.push(OUTPUT_RULES_HEADER, output_rules(false));
        sections.finish()
    }
}
