use std::fs;
use std::path::Path;

use anyhow::{Context, bail};
use tokio::runtime::Handle;
use url::Url;

use dynsprite_core::FetchSettings;
use dynsprite_model::DialogueManifest;

/// Read a manifest from an http(s) URL or a local JSON file and validate it.
pub fn load_manifest(
    source: &str,
    fetch: &FetchSettings,
    runtime: &Handle,
) -> anyhow::Result<DialogueManifest> {
    let raw = match Url::parse(source) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {
            runtime.block_on(download(url, fetch))?
        }
        _ => fs::read_to_string(Path::new(source))
            .with_context(|| format!("failed to read manifest {source}"))?,
    };

    let manifest: DialogueManifest = serde_json::from_str(&raw)
        .with_context(|| format!("invalid manifest {source}"))?;
    manifest
        .validate()
        .with_context(|| format!("invalid manifest {source}"))?;
    Ok(manifest)
}

async fn download(url: Url, fetch: &FetchSettings) -> anyhow::Result<String> {
    let client = reqwest::Client::builder()
        .timeout(fetch.timeout())
        .build()
        .context("failed to build HTTP client")?;
    let response = client
        .get(url.clone())
        .send()
        .await
        .with_context(|| format!("failed to download manifest {url}"))?;
    if !response.status().is_success() {
        bail!("manifest download failed: {url} returned {}", response.status());
    }
    response
        .text()
        .await
        .with_context(|| format!("failed to read manifest body from {url}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_and_validates_local_file() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dialogue.json");
        fs::write(
            &path,
            r#"{"dialogue":[{"name":"Sheldon","text":"{satisfied} hi"}],
                "emojies":[{"name":"satisfied","url":"https://cdn.example/s.png"}],
                "avatars":[{"name":"Sheldon","url":"https://cdn.example/a.png","position":"LEFT"}]}"#,
        )
        .unwrap();

        let manifest = load_manifest(
            path.to_str().unwrap(),
            &FetchSettings::default(),
            runtime.handle(),
        )
        .unwrap();
        assert_eq!(manifest.dialogue.len(), 1);
        assert!(manifest.avatar("Sheldon").unwrap().position.is_left());
    }

    #[test]
    fn missing_file_names_the_source() {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let err = load_manifest("/nonexistent/dialogue.json", &FetchSettings::default(), runtime.handle())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/dialogue.json"));
    }
}
