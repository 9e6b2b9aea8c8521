//! `fetch` command: prefetch avatars, pack icons, render the dialogue.
//!
//! The calling thread owns the atlas packer and acts as the frame loop: it
//! drains the dispatcher every tick until the background fetches settle.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{info, warn};

use dynsprite_config::SpriteConfig;
use dynsprite_core::{
    AtlasPacker, CacheStats, HttpFetcher, MarkupStyle, ResourceFetcher,
    SpriteServices, expand_placeholders,
};
use dynsprite_model::{AvatarPosition, DialogueManifest, GlyphRecord};

/// One dialogue line after placeholder expansion.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedLine {
    pub speaker: String,
    pub text: String,
    /// Side of the avatar, when the speaker has one that loaded.
    pub avatar: Option<AvatarPosition>,
}

#[derive(Debug, Serialize)]
pub struct FetchReport {
    pub avatars_loaded: usize,
    pub avatars_failed: usize,
    pub glyphs: Vec<GlyphRecord>,
    pub lines: Vec<RenderedLine>,
    #[serde(skip)]
    pub stats: CacheStats,
}

/// Run the pipeline with the HTTP fetcher from `config`.
pub fn run_fetch(
    config: &SpriteConfig,
    manifest: &DialogueManifest,
    style: MarkupStyle,
    atlas_out: Option<&Path>,
    runtime: &Handle,
) -> anyhow::Result<FetchReport> {
    let fetcher = Arc::new(
        HttpFetcher::new(&config.fetch).context("failed to build HTTP fetcher")?,
    );
    run_fetch_with(config, manifest, style, atlas_out, runtime, fetcher)
}

pub fn run_fetch_with(
    config: &SpriteConfig,
    manifest: &DialogueManifest,
    style: MarkupStyle,
    atlas_out: Option<&Path>,
    runtime: &Handle,
    fetcher: Arc<dyn ResourceFetcher>,
) -> anyhow::Result<FetchReport> {
    let mut services: SpriteServices<AtlasPacker> =
        SpriteServices::build_with_fetcher(&config.cache, fetcher, runtime.clone())
            .context("failed to build sprite services")?;
    let mut packer =
        AtlasPacker::new(&config.atlas).context("invalid atlas settings")?;

    let cache = services.cache().clone();
    let avatar_keys: Vec<String> =
        manifest.avatar_urls().map(str::to_owned).collect();
    let avatars = cache.fetch_all(avatar_keys.clone());
    let icons = packer.download_and_pack_all(&cache, &manifest.icons);

    let work = runtime.spawn(async move { (avatars.await, icons.await) });
    let tick = config.dispatch.tick();
    while !work.is_finished() {
        services.pump_mut().drain(&mut packer);
        thread::sleep(tick);
    }
    // Completions are queued before their requests resolve, so one more pass
    // delivers everything that is left.
    services.pump_mut().drain(&mut packer);

    let (avatar_results, icons_fetched) = runtime
        .block_on(work)
        .context("fetch task failed")?;

    let mut loaded = std::collections::HashSet::new();
    for (key, result) in avatar_keys.iter().zip(&avatar_results) {
        if result.is_some() {
            loaded.insert(key.as_str());
        } else {
            warn!(url = %key, "avatar unavailable");
        }
    }
    let avatars_loaded = avatar_results.iter().filter(|r| r.is_some()).count();

    if let Some(path) = atlas_out {
        packer
            .surface()
            .image()
            .save(path)
            .with_context(|| format!("failed to write atlas to {}", path.display()))?;
        info!(path = %path.display(), revision = packer.surface().revision(), "atlas written");
    }

    let lines = manifest
        .dialogue
        .iter()
        .map(|line| RenderedLine {
            speaker: line.name.clone(),
            text: expand_placeholders(&line.text, &packer, style).into_owned(),
            avatar: manifest
                .avatar(&line.name)
                .filter(|avatar| loaded.contains(avatar.url.as_str()))
                .map(|avatar| avatar.position),
        })
        .collect();

    let stats = cache.stats();
    info!(
        avatars_loaded,
        icons_fetched,
        glyphs = packer.glyphs().len(),
        network_fetches = stats.network_fetches,
        store_hits = stats.store_hits,
        failures = stats.failures,
        "fetch complete"
    );

    Ok(FetchReport {
        avatars_loaded,
        avatars_failed: avatar_results.len() - avatars_loaded,
        glyphs: packer.glyphs().to_vec(),
        lines,
        stats,
    })
}
