//! Tunables consumed by the cache, fetcher and atlas packer.
//!
//! These are plain serde structs so the config crate can embed them directly
//! in its file format.

use std::path::PathBuf;
use std::time::Duration;

use dynsprite_model::PRIVATE_USE_START;
use serde::{Deserialize, Serialize};

/// How the cache uses its durable store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistMode {
    /// Memory only; the durable store is never consulted.
    Disabled,
    /// Previously persisted bytes are read, new downloads are not written.
    ReadOnly,
    /// Read persisted bytes and write every successful download back.
    #[default]
    ReadWrite,
}

impl PersistMode {
    /// Persistence writes are unavailable on constrained web targets.
    pub fn effective(self) -> Self {
        if cfg!(target_arch = "wasm32") && self == Self::ReadWrite {
            Self::ReadOnly
        } else {
            self
        }
    }

    pub fn reads(self) -> bool {
        !matches!(self, Self::Disabled)
    }

    pub fn writes(self) -> bool {
        matches!(self, Self::ReadWrite)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
    pub persistence: PersistMode,
    /// Root directory of the on-disk blob store. When unset, persisted bytes
    /// only live as long as the process.
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchSettings {
    /// Per-request timeout; a timed out request counts as a failed fetch.
    pub timeout_ms: u64,
    /// Attempts per fetch, including the first one.
    pub max_retries: u32,
    /// Base delay for exponential backoff between attempts.
    pub retry_backoff_ms: u64,
    pub pool_max_idle_per_host: usize,
    pub user_agent: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            max_retries: 3,
            retry_backoff_ms: 100,
            pool_max_idle_per_host: 10,
            user_agent: None,
        }
    }
}

impl FetchSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AtlasSettings {
    pub width: u32,
    pub height: u32,
    /// Fixed slot size. When unset, the first packed icon decides it.
    pub cell_width: Option<u32>,
    pub cell_height: Option<u32>,
    pub first_code_point: u32,
}

impl Default for AtlasSettings {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            cell_width: None,
            cell_height: None,
            first_code_point: PRIVATE_USE_START,
        }
    }
}
