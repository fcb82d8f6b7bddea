//! Style attributes a document can carry over a span of text.

use serde::{Deserialize, Serialize};

/// An ARGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub a: u8,
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    /// Creates an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { a: 255, r, g, b }
    }

    /// Creates a color with an explicit alpha channel.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { a, r, g, b }
    }

    pub const LIGHT_GRAY: Color = Color::rgb(211, 211, 211);
}

/// Paint used for foreground text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Brush {
    Solid(Color),
    /// Two-stop gradient at a fixed angle.
    LinearGradient { from: Color, to: Color, angle: f32 },
}

impl Brush {
    /// Gradient angle used for descriptor-defined gradients.
    pub const DEFAULT_GRADIENT_ANGLE: f32 = 45.0;

    pub fn gradient(from: Color, to: Color) -> Self {
        Brush::LinearGradient {
            from,
            to,
            angle: Self::DEFAULT_GRADIENT_ANGLE,
        }
    }
}

/// Font weight on the usual 1..=999 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const THIN: FontWeight = FontWeight(100);
    pub const EXTRA_LIGHT: FontWeight = FontWeight(200);
    pub const LIGHT: FontWeight = FontWeight(300);
    pub const NORMAL: FontWeight = FontWeight(400);
    pub const MEDIUM: FontWeight = FontWeight(500);
    pub const SEMI_BOLD: FontWeight = FontWeight(600);
    pub const BOLD: FontWeight = FontWeight(700);
    pub const EXTRA_BOLD: FontWeight = FontWeight(800);
    pub const BLACK: FontWeight = FontWeight(900);
    pub const EXTRA_BLACK: FontWeight = FontWeight(950);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

/// A single style attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StyleProperty {
    Foreground(Brush),
    FontWeight(FontWeight),
}

impl StyleProperty {
    /// Two properties of the same kind replace each other.
    pub fn same_kind(&self, other: &StyleProperty) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// A styled span inside one block, in block-relative character offsets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyledSpan {
    pub start: usize,
    pub end: usize,
    pub property: StyleProperty,
}
