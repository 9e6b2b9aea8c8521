use thiserror::Error;

use dynsprite_model::{PRIVATE_USE_END, PRIVATE_USE_START};

use crate::models::SpriteConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigGuardRailError {
    #[error("atlas dimensions must be non-zero, got {width}x{height}")]
    EmptyAtlas { width: u32, height: u32 },
    #[error("atlas cell size needs both cell_width and cell_height")]
    PartialCellSize,
    #[error("atlas cell {cell_width}x{cell_height} is empty or larger than the {width}x{height} atlas")]
    InvalidCell {
        cell_width: u32,
        cell_height: u32,
        width: u32,
        height: u32,
    },
    #[error("first glyph code point U+{0:04X} is outside the private use area")]
    CodePointOutsidePrivateUse(u32),
    #[error("dispatch tick_ms must be non-zero")]
    ZeroTick,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn apply_guard_rails(
    config: &SpriteConfig,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let atlas = &config.atlas;

    if atlas.width == 0 || atlas.height == 0 {
        return Err(ConfigGuardRailError::EmptyAtlas {
            width: atlas.width,
            height: atlas.height,
        });
    }

    match (atlas.cell_width, atlas.cell_height) {
        (Some(cell_width), Some(cell_height)) => {
            if cell_width == 0
                || cell_height == 0
                || cell_width > atlas.width
                || cell_height > atlas.height
            {
                return Err(ConfigGuardRailError::InvalidCell {
                    cell_width,
                    cell_height,
                    width: atlas.width,
                    height: atlas.height,
                });
            }
            if atlas.width % cell_width != 0 {
                warnings.push_with_hint(
                    format!(
                        "atlas width {} is not a multiple of cell width {cell_width}; the right edge stays unused",
                        atlas.width
                    ),
                    "Pick an atlas width that is a multiple of the icon width",
                );
            }
        }
        (None, None) => {}
        _ => return Err(ConfigGuardRailError::PartialCellSize),
    }

    if !(PRIVATE_USE_START..=PRIVATE_USE_END).contains(&atlas.first_code_point) {
        return Err(ConfigGuardRailError::CodePointOutsidePrivateUse(
            atlas.first_code_point,
        ));
    }

    if config.dispatch.tick_ms == 0 {
        return Err(ConfigGuardRailError::ZeroTick);
    }

    if config.fetch.max_retries == 0 {
        warnings.push("fetch.max_retries is 0; every download still gets one attempt");
    }

    if config.cache.persistence.reads() && config.cache.root.is_none() {
        warnings.push_with_hint(
            "no cache root available; persisted sprites only live for this process",
            "Set cache.root or set cache.persistence = \"disabled\"",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn rooted() -> SpriteConfig {
        let mut config = SpriteConfig::default();
        config.cache.root = Some(PathBuf::from("/tmp/dynsprite"));
        config
    }

    #[test]
    fn defaults_pass_without_warnings() {
        let warnings = apply_guard_rails(&rooted()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn zero_atlas_is_rejected() {
        let mut config = rooted();
        config.atlas.height = 0;
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::EmptyAtlas { width: 512, height: 0 }
        );
    }

    #[test]
    fn oversized_cell_is_rejected() {
        let mut config = rooted();
        config.atlas.cell_width = Some(1024);
        config.atlas.cell_height = Some(16);
        assert!(matches!(
            apply_guard_rails(&config),
            Err(ConfigGuardRailError::InvalidCell { .. })
        ));

        config.atlas.cell_width = None;
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::PartialCellSize
        );
    }

    #[test]
    fn code_point_must_be_private_use() {
        let mut config = rooted();
        config.atlas.first_code_point = 0x1F600;
        assert_eq!(
            apply_guard_rails(&config).unwrap_err(),
            ConfigGuardRailError::CodePointOutsidePrivateUse(0x1F600)
        );
    }

    #[test]
    fn uneven_cells_and_missing_root_warn() {
        let mut config = SpriteConfig::default();
        config.atlas.cell_width = Some(48);
        config.atlas.cell_height = Some(48);
        let warnings = apply_guard_rails(&config).unwrap();
        assert_eq!(warnings.items.len(), 2);
        assert!(warnings.items.iter().all(|w| w.hint.is_some()));
    }
}
