use crate::error::{Result, SpriteError};
use crate::sprite::Sprite;

/// Turns raw bytes into pixels. Runs on the blocking pool, never on the
/// owning thread.
pub trait SpriteDecoder: Send + Sync {
    fn decode(&self, key: &str, bytes: &[u8]) -> Result<Sprite>;
}

/// Decoder backed by the `image` crate; the format is sniffed from the bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageDecoder;

impl SpriteDecoder for ImageDecoder {
    fn decode(&self, key: &str, bytes: &[u8]) -> Result<Sprite> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| SpriteError::decode(key, e))?;
        Sprite::from_rgba(key, img.to_rgba8())
    }
}
