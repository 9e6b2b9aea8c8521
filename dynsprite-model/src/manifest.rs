//! Dialogue manifest served to the renderer: speaker lines plus the remote
//! icons and avatars they reference.
//!
//! The wire format spells the icon list `emojies`; the field keeps that name
//! on the wire and a readable one in Rust.

use std::fmt;

use crate::error::{ModelError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DialogueManifest {
    pub dialogue: Vec<DialogueLine>,
    #[cfg_attr(feature = "serde", serde(rename = "emojies"))]
    pub icons: Vec<IconSpec>,
    pub avatars: Vec<AvatarSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DialogueLine {
    pub name: String,
    pub text: String,
}

impl fmt::Display for DialogueLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.text)
    }
}

/// A small remote image packed into the glyph atlas under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IconSpec {
    pub name: String,
    pub url: String,
}

impl IconSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AvatarSpec {
    pub name: String,
    pub url: String,
    pub position: AvatarPosition,
}

/// Side of the dialogue box an avatar is drawn on. Anything other than a
/// case-insensitive `left` is treated as `right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "String", into = "String"))]
pub enum AvatarPosition {
    Left,
    #[default]
    Right,
}

impl AvatarPosition {
    pub fn parse_lossy(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("left") {
            Self::Left
        } else {
            Self::Right
        }
    }

    pub fn is_left(self) -> bool {
        matches!(self, Self::Left)
    }
}

impl From<String> for AvatarPosition {
    fn from(value: String) -> Self {
        Self::parse_lossy(&value)
    }
}

impl From<AvatarPosition> for String {
    fn from(value: AvatarPosition) -> Self {
        match value {
            AvatarPosition::Left => "left".to_string(),
            AvatarPosition::Right => "right".to_string(),
        }
    }
}

impl DialogueManifest {
    // Later entries win when a name repeats.

    pub fn icon(&self, name: &str) -> Option<&IconSpec> {
        self.icons.iter().rev().find(|icon| icon.name == name)
    }

    pub fn avatar(&self, name: &str) -> Option<&AvatarSpec> {
        self.avatars.iter().rev().find(|avatar| avatar.name == name)
    }

    pub fn avatar_urls(&self) -> impl Iterator<Item = &str> {
        self.avatars.iter().map(|avatar| avatar.url.as_str())
    }

    /// Reject icons and avatars that cannot be fetched or addressed.
    pub fn validate(&self) -> Result<()> {
        for icon in &self.icons {
            if icon.name.trim().is_empty() {
                return Err(ModelError::InvalidManifest(format!(
                    "icon with url '{}' has no name",
                    icon.url
                )));
            }
            if icon.url.trim().is_empty() {
                return Err(ModelError::InvalidManifest(format!(
                    "icon '{}' has no url",
                    icon.name
                )));
            }
        }
        for avatar in &self.avatars {
            if avatar.url.trim().is_empty() {
                return Err(ModelError::InvalidManifest(format!(
                    "avatar '{}' has no url",
                    avatar.name
                )));
            }
        }
        Ok(())
    }
}
