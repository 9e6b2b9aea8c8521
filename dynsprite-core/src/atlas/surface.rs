use image::{RgbaImage, imageops};

use dynsprite_model::AtlasRect;

/// The shared RGBA texture glyphs are blitted into.
///
/// Writes go through a scratch copy that replaces the live image in one step,
/// so readers holding the previous revision never see a half-written cell.
pub struct AtlasSurface {
    image: RgbaImage,
    revision: u64,
}

impl std::fmt::Debug for AtlasSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasSurface")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("revision", &self.revision)
            .finish()
    }
}

impl AtlasSurface {
    /// Fully transparent surface.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            revision: 0,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Bumped on every committed blit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Copy `source` into `rect` (clone, modify, swap in).
    pub(crate) fn commit_blit(&mut self, source: &RgbaImage, rect: AtlasRect) {
        let mut scratch = self.image.clone();
        imageops::replace(&mut scratch, source, i64::from(rect.x), i64::from(rect.y));
        self.image = scratch;
        self.revision += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn blit_lands_in_rect_and_bumps_revision() {
        let mut surface = AtlasSurface::new(8, 8);
        let red = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        surface.commit_blit(&red, AtlasRect::new(4, 0, 4, 4));

        assert_eq!(surface.revision(), 1);
        assert_eq!(surface.image().get_pixel(4, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(surface.image().get_pixel(7, 3), &Rgba([255, 0, 0, 255]));
        assert_eq!(surface.image().get_pixel(3, 0), &Rgba([0, 0, 0, 0]));
        assert_eq!(surface.image().get_pixel(4, 4), &Rgba([0, 0, 0, 0]));
    }
}
