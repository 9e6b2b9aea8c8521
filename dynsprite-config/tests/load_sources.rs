use std::collections::HashMap;
use std::fs;

use dynsprite_config::{
    CONFIG_JSON_ENV, CONFIG_PATH_ENV, ConfigSource, SpriteConfig,
};
use dynsprite_core::PersistMode;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn env_path_wins_over_inline_json_and_files() {
    let dir = tempfile::tempdir().unwrap();
    let explicit = dir.path().join("explicit.toml");
    fs::write(&explicit, "[atlas]\nwidth = 128\n").unwrap();
    fs::write(dir.path().join("dynsprite.toml"), "[atlas]\nwidth = 64\n").unwrap();

    let (config, source) = SpriteConfig::load_with(
        lookup(&[
            (CONFIG_PATH_ENV, explicit.to_str().unwrap()),
            (CONFIG_JSON_ENV, r#"{"atlas": {"width": 32}}"#),
        ]),
        dir.path(),
    )
    .unwrap();

    assert_eq!(config.atlas.width, 128);
    assert_eq!(source, ConfigSource::EnvPath(explicit));
}

#[test]
fn inline_json_used_when_no_path() {
    let dir = tempfile::tempdir().unwrap();
    let (config, source) = SpriteConfig::load_with(
        lookup(&[
            (CONFIG_PATH_ENV, "  "),
            (CONFIG_JSON_ENV, r#"{"cache": {"persistence": "disabled"}}"#),
        ]),
        dir.path(),
    )
    .unwrap();

    assert_eq!(source, ConfigSource::EnvInline);
    assert_eq!(config.cache.persistence, PersistMode::Disabled);
    assert!(config.cache.root.is_none());
}

#[test]
fn default_file_found_under_config_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("config")).unwrap();
    let path = dir.path().join("config/dynsprite.json");
    fs::write(&path, r#"{"dispatch": {"tick_ms": 50}}"#).unwrap();

    let (config, source) = SpriteConfig::load_with(lookup(&[]), dir.path()).unwrap();
    assert_eq!(source, ConfigSource::File(path));
    assert_eq!(config.dispatch.tick_ms, 50);
}

#[test]
fn falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let (config, source) = SpriteConfig::load_with(lookup(&[]), dir.path()).unwrap();
    assert_eq!(source, ConfigSource::Default);
    assert_eq!(config.atlas.width, 512);
    assert_eq!(config.cache.persistence, PersistMode::ReadWrite);
}

#[test]
fn invalid_inline_json_names_the_variable() {
    let dir = tempfile::tempdir().unwrap();
    let err = SpriteConfig::load_with(lookup(&[(CONFIG_JSON_ENV, "{oops")]), dir.path())
        .unwrap_err();
    assert!(format!("{err:#}").contains(CONFIG_JSON_ENV));
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = SpriteConfig::load_with(
        lookup(&[(CONFIG_PATH_ENV, missing.to_str().unwrap())]),
        dir.path(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("failed to read sprite config"));
}

#[test]
fn explicit_file_gets_platform_cache_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sprites.toml");
    fs::write(&path, "[cache]\npersistence = \"read_write\"\n").unwrap();

    let config = SpriteConfig::load_from_file(&path).unwrap();
    assert_eq!(config.cache.persistence, PersistMode::ReadWrite);
    assert_eq!(config.cache.root, dynsprite_config::default_cache_root());
}

#[test]
fn explicit_file_keeps_configured_root() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("store");
    let path = dir.path().join("sprites.json");
    fs::write(
        &path,
        format!(r#"{{"cache": {{"root": {:?}, "persistence": "read_only"}}}}"#, root),
    )
    .unwrap();

    let config = SpriteConfig::load_from_file(&path).unwrap();
    assert_eq!(config.cache.root, Some(root));
}
