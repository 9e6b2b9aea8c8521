//! Configuration for dynsprite consumers.
//!
//! [`SpriteConfig`] bundles the cache, fetch, atlas and dispatch tunables and
//! knows how to find itself: an explicit path or inline JSON from the
//! environment, a conventional file in the working directory, or defaults.
//! [`apply_guard_rails`] rejects layouts the packer cannot honour and reports
//! softer problems as warnings.
#![allow(missing_docs)]

pub mod models;
pub mod validation;

pub use models::{
    CONFIG_JSON_ENV, CONFIG_PATH_ENV, ConfigSource, DispatchSettings,
    SpriteConfig, default_cache_root,
};
pub use validation::{
    ConfigGuardRailError, ConfigWarning, ConfigWarnings, apply_guard_rails,
};
