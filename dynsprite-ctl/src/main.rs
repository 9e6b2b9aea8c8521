//! `dynsprite-ctl` entry point.

use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynsprite_config::{ConfigSource, SpriteConfig, apply_guard_rails};
use dynsprite_ctl::{Cli, Command, load_manifest, run_fetch};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dynsprite_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let (config, source) = match &cli.config {
        Some(path) => (
            SpriteConfig::load_from_file(path)?,
            ConfigSource::File(path.clone()),
        ),
        None => SpriteConfig::load_from_env()?,
    };
    let warnings = apply_guard_rails(&config).context("configuration rejected")?;
    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => warn!(hint = %hint, "{}", warning.message),
            None => warn!("{}", warning.message),
        }
    }
    info!(?source, "configuration loaded");

    match cli.command {
        Command::Config => {
            let rendered = toml::to_string_pretty(&config)
                .context("failed to render configuration")?;
            print!("{rendered}");
        }
        Command::Fetch(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("dynsprite-worker")
                .build()
                .context("failed to start tokio runtime")?;

            let manifest = load_manifest(&args.manifest, &config.fetch, runtime.handle())?;
            let report = run_fetch(
                &config,
                &manifest,
                args.style.into(),
                Some(&args.atlas_out),
                runtime.handle(),
            )?;

            let mut out = io::stdout().lock();
            if !args.no_glyphs {
                serde_json::to_writer_pretty(&mut out, &report.glyphs)
                    .context("failed to print glyph table")?;
                writeln!(out)?;
            }
            for line in &report.lines {
                match line.avatar {
                    Some(position) => writeln!(
                        out,
                        "[{}] {}: {}",
                        String::from(position),
                        line.speaker,
                        line.text
                    )?,
                    None => writeln!(out, "{}: {}", line.speaker, line.text)?,
                }
            }
            if report.avatars_failed > 0 {
                warn!(failed = report.avatars_failed, "some avatars could not be loaded");
            }
        }
    }

    Ok(())
}
