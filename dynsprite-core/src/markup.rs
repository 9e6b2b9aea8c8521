//! `{name}` placeholder expansion for dialogue text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::atlas::AtlasPacker;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// How a resolved placeholder is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarkupStyle {
    /// Rich-text tag, `<sprite name="smile">`.
    #[default]
    SpriteTag,
    /// The glyph's private-use character.
    CodePoint,
}

/// Replace every `{name}` in `text`. Names with a packed glyph become
/// markup in `style`; unknown names are dropped.
pub fn expand_placeholders<'a>(
    text: &'a str,
    packer: &AtlasPacker,
    style: MarkupStyle,
) -> Cow<'a, str> {
    PLACEHOLDER.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        match (packer.glyph(name), style) {
            (Some(_), MarkupStyle::SpriteTag) => format!("<sprite name=\"{name}\">"),
            (Some(glyph), MarkupStyle::CodePoint) => {
                glyph.as_char().map(String::from).unwrap_or_default()
            }
            (None, _) => String::new(),
        }
    })
}

/// Placeholder names in `text`, in order of appearance.
pub fn placeholder_names(text: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AtlasSettings;
    use crate::sprite::Sprite;
    use image::{Rgba, RgbaImage};

    fn packer_with(names: &[&str]) -> AtlasPacker {
        let mut packer = AtlasPacker::new(&AtlasSettings::default()).unwrap();
        for name in names {
            let sprite =
                Sprite::from_rgba(*name, RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255])))
                    .unwrap();
            packer.pack(name, &sprite).unwrap();
        }
        packer
    }

    #[test]
    fn packed_names_become_sprite_tags() {
        let packer = packer_with(&["satisfied"]);
        let out = expand_placeholders(
            "{satisfied} Nice! {unknown}done",
            &packer,
            MarkupStyle::SpriteTag,
        );
        assert_eq!(out, "<sprite name=\"satisfied\"> Nice! done");
    }

    #[test]
    fn code_point_style_emits_private_use_chars() {
        let packer = packer_with(&["a", "b"]);
        let out = expand_placeholders("{b}{a}", &packer, MarkupStyle::CodePoint);
        assert_eq!(out, "\u{E001}\u{E000}");
    }

    #[test]
    fn text_without_placeholders_is_borrowed() {
        let packer = packer_with(&[]);
        let out = expand_placeholders("plain { text }", &packer, MarkupStyle::SpriteTag);
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn lists_placeholder_names() {
        let names: Vec<_> = placeholder_names("{x} and {y_2} but not {a-b}").collect();
        assert_eq!(names, ["x", "y_2"]);
    }
}
