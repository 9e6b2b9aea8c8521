//! Collaborators the cache delegates to: network fetch, image decode and
//! durable byte storage.

pub mod decode;
pub mod fetch;
pub mod store;

pub use decode::{ImageDecoder, SpriteDecoder};
pub use fetch::{HttpFetcher, ResourceFetcher};
pub use store::{
    CacacheStore, DurableStore, MemoryStore, SpriteStoreKey,
    sprite_store_key_for,
};
