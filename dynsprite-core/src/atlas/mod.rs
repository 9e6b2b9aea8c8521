//! Dynamic glyph atlas.
//!
//! Small icons are blitted into fixed-size cells of one shared RGBA surface
//! and addressed from text through sequential private-use code points. The
//! packer is owned by the dispatcher's owning thread; nothing here locks.

mod packer;
mod placement;
mod surface;

use thiserror::Error;

pub use packer::{AtlasPacker, RefreshListener};
pub use placement::RowPlacer;
pub use surface::AtlasSurface;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    #[error("Invalid atlas layout: {0}")]
    InvalidLayout(String),

    #[error(
        "Icon '{name}' is {actual_width}x{actual_height} but atlas cells are {cell_width}x{cell_height}"
    )]
    CellSizeMismatch {
        name: String,
        cell_width: u32,
        cell_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Icon '{name}' ({width}x{height}) does not fit a {atlas_width}x{atlas_height} atlas")]
    TooLarge {
        name: String,
        width: u32,
        height: u32,
        atlas_width: u32,
        atlas_height: u32,
    },

    #[error("Atlas is full ({capacity} slots)")]
    Full { capacity: u32 },

    #[error("Private use code points exhausted")]
    CodePointsExhausted,

    #[error("Glyph '{0}' is already packed")]
    DuplicateName(String),
}
