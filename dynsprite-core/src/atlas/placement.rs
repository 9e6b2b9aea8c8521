use dynsprite_model::{AtlasRect, AtlasSlot, ImageDimensions};

use super::AtlasError;

/// Row-fill slot allocator over a grid of equal cells.
///
/// Slot `i` sits at `((i % per_row) * cell_w, (i / per_row) * cell_h)` with
/// `per_row = atlas_width / cell_w`. The cell size is either fixed up front
/// or taken from the first image placed.
#[derive(Debug, Clone)]
pub struct RowPlacer {
    atlas_width: u32,
    atlas_height: u32,
    cell: Option<(u32, u32)>,
    next_index: u32,
}

impl RowPlacer {
    pub fn new(
        atlas_width: u32,
        atlas_height: u32,
        cell: Option<(u32, u32)>,
    ) -> Result<Self, AtlasError> {
        if atlas_width == 0 || atlas_height == 0 {
            return Err(AtlasError::InvalidLayout(format!(
                "atlas must be non-empty, got {atlas_width}x{atlas_height}"
            )));
        }
        if let Some((w, h)) = cell {
            if w == 0 || h == 0 {
                return Err(AtlasError::InvalidLayout(format!(
                    "cell must be non-empty, got {w}x{h}"
                )));
            }
            if w > atlas_width || h > atlas_height {
                return Err(AtlasError::InvalidLayout(format!(
                    "cell {w}x{h} exceeds atlas {atlas_width}x{atlas_height}"
                )));
            }
        }
        Ok(Self {
            atlas_width,
            atlas_height,
            cell,
            next_index: 0,
        })
    }

    pub fn cell(&self) -> Option<(u32, u32)> {
        self.cell
    }

    /// Slots handed out so far.
    pub fn placed(&self) -> u32 {
        self.next_index
    }

    /// Total slots once the cell size is known.
    pub fn capacity(&self) -> Option<u32> {
        self.cell.map(|(w, h)| {
            (self.atlas_width / w).saturating_mul(self.atlas_height / h)
        })
    }

    /// Rect of slot `index`, ignoring whether it fits vertically.
    pub fn slot_rect(&self, index: u32) -> Option<AtlasRect> {
        let (w, h) = self.cell?;
        let per_row = self.atlas_width / w;
        Some(AtlasRect::new((index % per_row) * w, (index / per_row) * h, w, h))
    }

    /// Next slot for an image of `dimensions`. Does not reserve it; call
    /// [`RowPlacer::commit`] once the image is on the surface.
    pub fn plan(
        &self,
        name: &str,
        dimensions: ImageDimensions,
    ) -> Result<AtlasSlot, AtlasError> {
        let (width, height) = dimensions.as_u32_tuple();
        let (cell_w, cell_h) = match self.cell {
            Some(cell) => cell,
            None => {
                if width > self.atlas_width || height > self.atlas_height {
                    return Err(AtlasError::TooLarge {
                        name: name.to_string(),
                        width,
                        height,
                        atlas_width: self.atlas_width,
                        atlas_height: self.atlas_height,
                    });
                }
                (width, height)
            }
        };
        if (width, height) != (cell_w, cell_h) {
            return Err(AtlasError::CellSizeMismatch {
                name: name.to_string(),
                cell_width: cell_w,
                cell_height: cell_h,
                actual_width: width,
                actual_height: height,
            });
        }

        let per_row = self.atlas_width / cell_w;
        let index = self.next_index;
        let rect = AtlasRect::new(
            (index % per_row) * cell_w,
            (index / per_row) * cell_h,
            cell_w,
            cell_h,
        );
        if rect.bottom() > self.atlas_height {
            return Err(AtlasError::Full {
                capacity: per_row * (self.atlas_height / cell_h),
            });
        }
        Ok(AtlasSlot { index, rect })
    }

    pub fn commit(&mut self, slot: AtlasSlot) {
        if self.cell.is_none() {
            self.cell = Some((slot.rect.width, slot.rect.height));
        }
        self.next_index = slot.index + 1;
    }
}
