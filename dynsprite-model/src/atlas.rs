//! Geometry and glyph records produced by the atlas packer.

use crate::dimensions::ImageDimensions;

/// First code point handed out to packed glyphs (Unicode private use area).
pub const PRIVATE_USE_START: u32 = 0xE000;

/// Last code point of the basic multilingual plane private use area.
pub const PRIVATE_USE_END: u32 = 0xF8FF;

/// Rect within the atlas, in pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtlasRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl AtlasRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(self) -> u32 {
        self.y + self.height
    }

    /// True when the two rects share at least one pixel.
    pub const fn overlaps(self, other: AtlasRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// A reserved region of the atlas. Slots are handed out once and never
/// reclaimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AtlasSlot {
    pub index: u32,
    pub rect: AtlasRect,
}

/// Layout metrics used by text renderers to place an inline glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub bearing_y: i32,
    pub advance: u32,
}

impl GlyphMetrics {
    /// Metrics for an icon sitting on the baseline: no horizontal bearing,
    /// top edge at the full image height, advance equal to the width.
    pub fn for_icon(dimensions: ImageDimensions) -> Self {
        let (width, height) = dimensions.as_u32_tuple();
        Self {
            width,
            height,
            bearing_x: 0,
            bearing_y: i32::try_from(height).unwrap_or(i32::MAX),
            advance: width,
        }
    }
}

/// An icon addressable from text through its private-use code point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GlyphRecord {
    pub name: String,
    pub code_point: u32,
    pub slot: AtlasSlot,
    pub metrics: GlyphMetrics,
    pub scale: f32,
}

impl GlyphRecord {
    pub fn rect(&self) -> AtlasRect {
        self.slot.rect
    }

    /// The glyph's code point as a `char`, if it is a valid scalar value.
    pub fn as_char(&self) -> Option<char> {
        char::from_u32(self.code_point)
    }
}
