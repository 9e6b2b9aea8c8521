//! Core data model definitions shared across dynsprite crates.
#![allow(missing_docs)]

pub mod atlas;
pub mod dimensions;
pub mod error;
pub mod manifest;

// Intentionally curated re-exports for downstream consumers.
pub use atlas::{
    AtlasRect, AtlasSlot, GlyphMetrics, GlyphRecord, PRIVATE_USE_END,
    PRIVATE_USE_START,
};
pub use dimensions::{ImageDimensions, ImageDimensionsError};
pub use error::{ModelError, Result as ModelResult};
pub use manifest::{
    AvatarPosition, AvatarSpec, DialogueLine, DialogueManifest, IconSpec,
};
