//! Modifier levels shared by the style catalogs, with their prompt text.

use crate::error::AppError;
use crate::prompt::{normalize_name, round_level};
use std::fmt;
use std::str::FromStr;

/// Shading intensity for sketch styles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ShadingLevel {
    None,
    Light,
    #[default]
    Medium,
    Heavy,
}

impl ShadingLevel {
    pub const ALL: [ShadingLevel; 4] = [Self::None, Self::Light, Self::Medium, Self::Heavy];

    pub fn instruction(self) -> &'static str {
        match self {
            Self::None => "Use clean lines without any shading or cross-hatching.",
            Self::Light => {
                "Apply light, subtle shading to suggest form and add a little depth."
            }
            Self::Medium => {
                "Use moderate shading and cross-hatching to create a clear sense of depth and volume."
            }
            Self::Heavy => {
                "Apply heavy, dramatic shading with deep shadows to create strong contrast and a bold feel."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
        }
    }
}

/// Gaussian blur strength for the monochrome style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlurLevel {
    Light,
    #[default]
    Medium,
    Heavy,
}

impl BlurLevel {
    pub const ALL: [BlurLevel; 3] = [Self::Light, Self::Medium, Self::Heavy];

    pub fn instruction(self) -> &'static str {
        match self {
            Self::Light => {
                "Apply a light Gaussian blur that softens fine texture while every edge stays readable."
            }
            Self::Medium => {
                "Apply a moderate Gaussian blur that smooths surfaces and softens the background while the subject's outline stays clear."
            }
            Self::Heavy => {
                "Apply a strong Gaussian blur for a dreamy soft-focus look; only the main silhouette should remain crisp."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Heavy => "heavy",
        }
    }
}

/// Watercolor rendering variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WatercolorVariant {
    #[default]
    Soft,
    Vibrant,
}

impl WatercolorVariant {
    pub const ALL: [WatercolorVariant; 2] = [Self::Soft, Self::Vibrant];

    pub fn instruction(self) -> &'static str {
        match self {
            Self::Soft => {
                "Use soft, diluted washes with gently bleeding edges and a pale, airy palette. Let the paper texture show through."
            }
            Self::Vibrant => {
                "Use saturated, vivid pigments with bold wet-on-wet blooms and crisp dried edges. Colors should feel rich and luminous."
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Vibrant => "vibrant",
        }
    }
}

const THICKNESS_TEXT: [&str; 5] = [
    "Use very thin, delicate hairlines.",
    "Use thin, fine lines.",
    "Use lines of medium thickness.",
    "Use thick, confident lines.",
    "Use very thick, bold lines, like a marker outline.",
];

/// Line thickness as a continuous control value in `1.0..=5.0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineThickness(pub f32);

impl LineThickness {
    pub const MEDIUM: LineThickness = LineThickness(3.0);

    /// Table level 1-5, or `None` when the value rounds outside the table.
    pub fn level(self) -> Option<u8> {
        round_level(self.0, 1, 5)
    }

    /// Prompt text for the rounded level; medium when out of table.
    pub fn instruction(self) -> &'static str {
        let level = self.level().unwrap_or(3);
        THICKNESS_TEXT[usize::from(level - 1)]
    }
}

impl Default for LineThickness {
    fn default() -> Self {
        Self::MEDIUM
    }
}

const OUTLINE_TEXT: [&str; 5] = [
    "a very tight margin that hugs the subject",
    "a narrow margin around the subject",
    "a medium margin around the subject",
    "a wide margin around the subject",
    "a very wide margin that gives the subject plenty of room",
];

/// Sticker outline distance as a continuous control value in `0.0..=5.0`.
///
/// Level 0 means no outline.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OutlineDistance(pub f32);

impl OutlineDistance {
    pub const NONE: OutlineDistance = OutlineDistance(0.0);

    /// Rounded level 0-5; out-of-table values fall back to 3.
    pub fn level(self) -> u8 {
        round_level(self.0, 0, 5).unwrap_or(3)
    }

    pub fn is_enabled(self) -> bool {
        self.level() > 0
    }

    /// Qualitative margin description, `None` when the outline is off.
    pub fn description(self) -> Option<&'static str> {
        match self.level() {
            0 => None,
            level => Some(OUTLINE_TEXT[usize::from(level - 1)]),
        }
    }
}

/// A `#RRGGBB` color, stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct HexColor(String);

impl HexColor {
    pub fn white() -> Self {
        Self("#FFFFFF".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::white()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HexColor {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AppError::config(format!("Invalid color: {s}")));
        }
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(AppError::config(format!("Invalid color: {s}"))),
        };
        Ok(Self(format!("#{}", expanded.to_ascii_uppercase())))
    }
}

macro_rules! impl_level_parse {
    ($ty:ty, $what:literal) => {
        impl FromStr for $ty {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let wanted = normalize_name(s);
                Self::ALL
                    .into_iter()
                    .find(|level| level.as_str() == wanted)
                    .ok_or_else(|| AppError::config(format!("Unknown {}: {s}", $what)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_level_parse!(ShadingLevel, "shading level");
impl_level_parse!(BlurLevel, "blur level");
impl_level_parse!(WatercolorVariant, "watercolor variant");
