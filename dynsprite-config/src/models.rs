use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dynsprite_core::{AtlasSettings, CacheSettings, FetchSettings};

pub const CONFIG_PATH_ENV: &str = "DYNSPRITE_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "DYNSPRITE_CONFIG_JSON";

const CANDIDATES: &[&str] = &[
    "dynsprite.toml",
    "dynsprite.json",
    "config/dynsprite.toml",
    "config/dynsprite.json",
];

/// Source that produced the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

/// Owning-thread pump cadence for hosts without their own frame loop.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchSettings {
    /// Interval (ms) between dispatcher drains. Lower values deliver
    /// completions sooner at the cost of more wakeups.
    pub tick_ms: u64,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self { tick_ms: 16 }
    }
}

impl DispatchSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SpriteConfig {
    /// Durable store location and persistence mode. With no `root`, the
    /// platform cache directory is used.
    pub cache: CacheSettings,
    /// HTTP client timeouts, retry budget and pooling.
    pub fetch: FetchSettings,
    /// Surface size, optional fixed cell size and first glyph code point.
    pub atlas: AtlasSettings,
    pub dispatch: DispatchSettings,
}

/// Platform cache directory for persisted sprite bytes, if the platform has
/// one.
pub fn default_cache_root() -> Option<PathBuf> {
    ProjectDirs::from("dev", "dynsprite", "dynsprite")
        .map(|dirs| dirs.cache_dir().join("sprites"))
}

impl SpriteConfig {
    /// Load configuration using environment variables.
    /// Evaluation order:
    /// 1) `$DYNSPRITE_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$DYNSPRITE_CONFIG_JSON` (inline JSON),
    /// 3) the first existing default file in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        Self::load_with(|name| env::var(name).ok(), Path::new("."))
    }

    /// [`SpriteConfig::load_from_env`] with an injectable variable lookup and
    /// search directory for default files.
    pub fn load_with(
        lookup: impl Fn(&str) -> Option<String>,
        search_root: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::resolve(lookup, search_root)?;
        config.fill_defaults();
        debug!(?source, "sprite configuration loaded");
        Ok((config, source))
    }

    fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        search_root: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)> {
        if let Some(path_str) = lookup(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let config = Self::read_file(&path)?;
            return Ok((config, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(search_root) {
            let config = Self::read_file(&path)?;
            return Ok((config, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    /// Load an explicit config file, filling the same defaults as the env
    /// loader (platform cache root when persistence is enabled).
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let mut config = Self::read_file(path)?;
        config.fill_defaults();
        Ok(config)
    }

    fn read_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read sprite config from {}", path.display())
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid sprite config {}", path.display())
            }),
            Some("toml") => toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid sprite config {}: {}", path.display(), err)
            }),
            _ => Self::parse_from_str(&contents, &path.display().to_string()),
        }
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse sprite config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid sprite config json: {err}"))
    }

    fn find_default_file(search_root: &Path) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|candidate| search_root.join(candidate))
            .find(|path| path.is_file())
    }

    fn fill_defaults(&mut self) {
        if self.cache.root.is_none() && self.cache.persistence.reads() {
            self.cache.root = default_cache_root();
        }
    }
}
