//! # dynsprite core
//!
//! Remote sprite loading for renderers whose texture state lives on one
//! thread.
//!
//! ## Overview
//!
//! - **Dispatch**: a cross-thread work queue drained by the owning thread once
//!   per tick ([`Dispatcher`], [`MainThreadPump`])
//! - **Resource cache**: deduplicated async fetch with a memory tier, an
//!   optional durable store and owning-thread completion callbacks
//!   ([`ResourceCache`])
//! - **Atlas**: row-fill packing of icons into one surface addressed through
//!   private-use code points ([`AtlasPacker`])
//! - **Markup**: `{name}` placeholder expansion for dialogue text
//!
//! ## Examples
//!
//! ```no_run
//! use dynsprite_core::{
//!     AtlasPacker, AtlasSettings, CacheSettings, FetchSettings, SpriteServices,
//! };
//! use dynsprite_model::IconSpec;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut services: SpriteServices<AtlasPacker> = SpriteServices::build(
//!     &CacheSettings::default(),
//!     &FetchSettings::default(),
//!     tokio::runtime::Handle::current(),
//! )?;
//! let mut packer = AtlasPacker::new(&AtlasSettings::default())?;
//!
//! let icons = [IconSpec::new("smile", "https://example.com/smile.png")];
//! let done = packer.download_and_pack_all(services.cache(), &icons);
//! done.await;
//! services.pump_mut().drain(&mut packer);
//! assert!(packer.is_packed("smile"));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

/// Dynamic glyph atlas
pub mod atlas;

/// Deduplicating sprite cache
pub mod cache;

/// Cross-thread work queue drained by the owning thread
pub mod dispatch;

/// Error types
pub mod error;

/// Fetch, decode and durable store collaborators
pub mod infra;

/// Dialogue placeholder expansion
pub mod markup;

/// Service wiring
pub mod services;

/// Tunables shared with the config crate
pub mod settings;

/// Decoded sprite
pub mod sprite;

pub use atlas::{AtlasError, AtlasPacker, AtlasSurface};
pub use cache::{
    AllFinishedHandler, CacheStats, ResourceCache, SingleFinishedHandler,
    SpriteCallback, all_finished_handler, single_finished_handler,
    sprite_callback,
};
pub use dispatch::{Dispatcher, DrainReport, MainThreadPump};
pub use error::{Result, SpriteError};
pub use infra::{
    CacacheStore, DurableStore, HttpFetcher, ImageDecoder, MemoryStore,
    ResourceFetcher, SpriteDecoder,
};
pub use markup::{MarkupStyle, expand_placeholders};
pub use services::SpriteServices;
pub use settings::{AtlasSettings, CacheSettings, FetchSettings, PersistMode};
pub use sprite::Sprite;
