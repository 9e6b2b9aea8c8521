use std::fmt;
use std::num::NonZeroU32;

use crate::error::ModelError;

/// Non-zero pixel dimensions for a decoded sprite.
///
/// Decoders reject empty images up front so the atlas packer never has to
/// reason about zero-area slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageDimensions {
    pub width: NonZeroU32,
    pub height: NonZeroU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDimensionsError {
    ZeroWidth,
    ZeroHeight,
}

impl fmt::Display for ImageDimensionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWidth => f.write_str("image width is zero"),
            Self::ZeroHeight => f.write_str("image height is zero"),
        }
    }
}

impl std::error::Error for ImageDimensionsError {}

impl From<ImageDimensionsError> for ModelError {
    fn from(err: ImageDimensionsError) -> Self {
        ModelError::InvalidDimensions(err.to_string())
    }
}

impl ImageDimensions {
    pub const fn new(width: NonZeroU32, height: NonZeroU32) -> Self {
        Self { width, height }
    }

    pub const fn width_u32(self) -> u32 {
        self.width.get()
    }

    pub const fn height_u32(self) -> u32 {
        self.height.get()
    }

    pub const fn as_u32_tuple(self) -> (u32, u32) {
        (self.width.get(), self.height.get())
    }

    /// Number of bytes an RGBA8 buffer of this size occupies.
    pub fn rgba_len(self) -> usize {
        self.width.get() as usize * self.height.get() as usize * 4
    }
}

impl TryFrom<(u32, u32)> for ImageDimensions {
    type Error = ImageDimensionsError;

    fn try_from(value: (u32, u32)) -> Result<Self, Self::Error> {
        let (width, height) = value;
        let width =
            NonZeroU32::new(width).ok_or(ImageDimensionsError::ZeroWidth)?;
        let height =
            NonZeroU32::new(height).ok_or(ImageDimensionsError::ZeroHeight)?;
        Ok(Self { width, height })
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
