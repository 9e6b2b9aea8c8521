use std::fmt;

use dynsprite_model::ImageDimensions;
use image::RgbaImage;

use crate::error::{Result, SpriteError};

/// A decoded RGBA8 image together with the key it was loaded from.
///
/// Sprites are shared as `Arc<Sprite>` between the cache and its subscribers;
/// the pixels are never mutated after decode.
#[derive(Clone, PartialEq)]
pub struct Sprite {
    key: String,
    image: RgbaImage,
    dimensions: ImageDimensions,
}

impl Sprite {
    pub fn from_rgba(key: impl Into<String>, image: RgbaImage) -> Result<Self> {
        let key = key.into();
        let dimensions = ImageDimensions::try_from(image.dimensions())
            .map_err(|e| SpriteError::decode(&key, e))?;
        Ok(Self {
            key,
            image,
            dimensions,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    pub fn width(&self) -> u32 {
        self.dimensions.width_u32()
    }

    pub fn height(&self) -> u32 {
        self.dimensions.height_u32()
    }
}

impl fmt::Debug for Sprite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sprite")
            .field("key", &self.key)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}
