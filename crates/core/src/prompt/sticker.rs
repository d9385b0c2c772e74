//! The sticker revision: seven styles with style-scoped modifiers, a
//! continuous line thickness, and optional background removal with a
//! die-cut outline.

use crate::error::AppError;
use crate::prompt::modifiers::{
    BlurLevel, LineThickness, OutlineDistance, ShadingLevel, WatercolorVariant,
};
use crate::prompt::{normalize_name, output_rules, Sections, StyleCatalog, OUTPUT_RULES_HEADER, PREAMBLE};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StickerStyle {
    Cartoon,
    Ghibli,
    Pixar,
    ThreeD,
    Sketch,
    BlackAndWhite,
    Watercolor,
}

impl StickerStyle {
    pub const ALL: [StickerStyle; 7] = [
        Self::Cartoon,
        Self::Ghibli,
        Self::Pixar,
        Self::ThreeD,
        Self::Sketch,
        Self::BlackAndWhite,
        Self::Watercolor,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cartoon => "cartoon",
            Self::Ghibli => "ghibli",
            Self::Pixar => "pixar",
            Self::ThreeD => "3d",
            Self::Sketch => "sketch",
            Self::BlackAndWhite => "blackandwhite",
            Self::Watercolor => "watercolor",
        }
    }

    fn base_description(self) -> &'static str {
        match self {
            Self::Cartoon => {
                "Redraw the subject as a classic flat cartoon with bold clean outlines, simplified shapes, and bright solid colors. \
                 Keep the pose and the recognisable features of the subject."
            }
            Self::Ghibli => {
                "Recreate the subject in the style of a Studio Ghibli animated film: hand-painted texture, soft warm colors, and a gentle, lyrical mood. \
                 Faces should be expressive and simple."
            }
            Self::Pixar => {
                "Recreate the subject as appealing 3D animated character art in the style of a Pixar film, with large lively eyes, soft rounded forms, and warm cinematic lighting."
            }
            Self::ThreeD => {
                "Rebuild the subject as a polished stylized 3D model, like a collectible vinyl toy, with smooth materials, soft studio lighting, and clean geometry."
            }
            Self::Sketch => {
                "A clean black-and-white line-art sketch of the subject. \
                 Preserve the subject's key features and forms accurately."
            }
            Self::BlackAndWhite => {
                "Reinterpret the subject as a monochrome illustration using only black, white, and shades of gray, with strong tonal contrast and simplified forms."
            }
            Self::Watercolor => {
                "Paint the subject as a hand-made watercolor illustration on textured paper, with transparent layered washes and visible brush strokes."
            }
        }
    }

    /// Pixar and 3D already ask for rendered output, so they carry no clause.
    fn exclusion(self) -> Option<&'static str> {
        match self {
            Self::Pixar | Self::ThreeD => None,
            _ => Some(
                "The result must never be a photorealistic image (photorealistic, photo) or a 3D render (3D render).",
            ),
        }
    }
}

impl fmt::Display for StickerStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StickerStyle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize_name(s);
        match wanted.as_str() {
            "threed" => return Ok(Self::ThreeD),
            "bw" | "monochrome" => return Ok(Self::BlackAndWhite),
            _ => {}
        }
        Self::ALL
            .into_iter()
            .find(|style| style.as_str() == wanted)
            .ok_or_else(|| AppError::config(format!("Unknown sticker style: {s}")))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum StickerBackground {
    /// Restyle the whole image, background included.
    #[default]
    Keep,
    /// Remove the background and return a transparent image.
    Transparent,
}

impl FromStr for StickerBackground {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_name(s).as_str() {
            "keep" | "original" => Ok(Self::Keep),
            "transparent" | "remove" | "none" => Ok(Self::Transparent),
            _ => Err(AppError::config(format!("Unknown background mode: {s}"))),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StickerModifiers {
    /// Only read for [`StickerStyle::Sketch`].
    pub shading: ShadingLevel,
    /// Only read for [`StickerStyle::BlackAndWhite`].
    pub blur: BlurLevel,
    /// Only read for [`StickerStyle::Watercolor`].
    pub watercolor: WatercolorVariant,
    pub thickness: LineThickness,
    pub background: StickerBackground,
    /// Only read for [`StickerBackground::Transparent`].
    pub outline: OutlineDistance,
}

const KEEP_BACKGROUND: &str = "If the original image has a background, transform the entire image, background included, into the requested style. \
     Keep the original composition and mood. Do not remove the background and do not add a new one.";

const REMOVE_BACKGROUND: &str = "Remove the background entirely. \
     Isolate the main subject and place it on a fully transparent background. \
     Leave no remnants of the original background, no ground shadows, and no solid fill.";

const SILHOUETTE_RULES: [&str; 6] = [
    "-   Trace the outer silhouette of the subject and offset it outward by the same distance everywhere.",
    "-   Fill the offset area with solid white so the subject sits on a die-cut sticker shape.",
    "-   Bridge small gaps between limbs, fingers, or hair strands instead of following them.",
    "-   Keep the outline smooth with rounded corners and no jagged or broken edges.",
    "-   Everything outside the offset silhouette must stay fully transparent.",
    "-   Do not add drop shadows, borders, or text to the sticker.",
];

fn outline_section(description: &str) -> String {
    let mut body = format!("Add a sticker-style outline with {description}.\n");
    body.push_str(&SILHOUETTE_RULES.join("\n"));
    body
}

/// Marker type for the sticker catalog.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sticker;

impl StyleCatalog for Sticker {
    type Style = StickerStyle;
    type Modifiers = StickerModifiers;

    const NAME: &'static str = "sticker";

    fn styles() -> &'static [StickerStyle] {
        &StickerStyle::ALL
    }

    fn default_style() -> StickerStyle {
        StickerStyle::Cartoon
    }

    fn reset_irrelevant(style: StickerStyle, modifiers: &mut StickerModifiers) {
        if style != StickerStyle::Sketch {
            modifiers.shading = ShadingLevel::default();
        }
        if style != StickerStyle::BlackAndWhite {
            modifiers.blur = BlurLevel::default();
        }
        if style != StickerStyle::Watercolor {
            modifiers.watercolor = WatercolorVariant::default();
        }
        if modifiers.background == StickerBackground::Keep {
            modifiers.outline = OutlineDistance::NONE;
        }
    }

    fn compose(style: StickerStyle, modifiers: &StickerModifiers) -> String {
        let transparent = Self::wants_transparency(modifiers);
        let mut sections = Sections::new(PREAMBLE);

        sections.push("### **Style**", style.base_description());

        match style {
            StickerStyle::Sketch => sections.push("### **Shading**", modifiers.shading.instruction()),
            StickerStyle::BlackAndWhite => sections.push("### **Blur**", modifiers.blur.instruction()),
            StickerStyle::Watercolor => {
                sections.push("### **Watercolor Variant**", modifiers.watercolor.instruction())
            }
            _ => {}
        }

        sections.push("### **Line Thickness**", modifiers.thickness.instruction());

        if transparent {
            sections.push("### **Background**", REMOVE_BACKGROUND);
            if let Some(description) = modifiers.outline.description() {
                sections.push("### **Sticker Outline**", outline_section(description));
            }
        } else {
            sections.push("### **Background**", KEEP_BACKGROUND);
        }

        if let Some(exclusion) = style.exclusion() {
            sections.push("### **Styles to Avoid**", exclusion);
        }
        sections.push(OUTPUT_RULES_HEADER, output_rules(transparent));
        sections.finish()
    }

    fn wants_transparency(modifiers: &StickerModifiers) -> bool {
        modifiers.background == StickerBackground::Transparent
    }
}
