use std::borrow::BorrowMut;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;

use futures::FutureExt;
use futures::future::join_all;
use tracing::{debug, info, warn};

use dynsprite_model::{
    GlyphMetrics, GlyphRecord, IconSpec, PRIVATE_USE_END, PRIVATE_USE_START,
};

use super::{AtlasError, AtlasSurface, RowPlacer};
use crate::cache::{ResourceCache, sprite_callback};
use crate::settings::AtlasSettings;
use crate::sprite::Sprite;

/// Called after every successful pack with the new glyph and the updated
/// surface, so renderers can re-upload the texture.
pub type RefreshListener = Box<dyn FnMut(&GlyphRecord, &AtlasSurface)>;

/// Owns the atlas surface and the glyph table.
pub struct AtlasPacker {
    surface: AtlasSurface,
    placer: RowPlacer,
    glyphs: Vec<GlyphRecord>,
    by_name: HashMap<String, usize>,
    by_code_point: HashMap<u32, usize>,
    next_code_point: u32,
    requested: HashSet<String>,
    listeners: Vec<RefreshListener>,
}

impl fmt::Debug for AtlasPacker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasPacker")
            .field("surface", &self.surface)
            .field("placer", &self.placer)
            .field("glyphs", &self.glyphs.len())
            .field("requested", &self.requested.len())
            .field("next_code_point", &format_args!("U+{:04X}", self.next_code_point))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl AtlasPacker {
    pub fn new(settings: &AtlasSettings) -> Result<Self, AtlasError> {
        let cell = match (settings.cell_width, settings.cell_height) {
            (Some(w), Some(h)) => Some((w, h)),
            (None, None) => None,
            _ => {
                return Err(AtlasError::InvalidLayout(
                    "cell_width and cell_height must be set together".into(),
                ));
            }
        };
        if !(PRIVATE_USE_START..=PRIVATE_USE_END).contains(&settings.first_code_point) {
            return Err(AtlasError::InvalidLayout(format!(
                "first code point U+{:04X} is outside the private use area",
                settings.first_code_point
            )));
        }
        let placer = RowPlacer::new(settings.width, settings.height, cell)?;
        Ok(Self {
            surface: AtlasSurface::new(settings.width, settings.height),
            placer,
            glyphs: Vec::new(),
            by_name: HashMap::new(),
            by_code_point: HashMap::new(),
            next_code_point: settings.first_code_point,
            requested: HashSet::new(),
            listeners: Vec::new(),
        })
    }

    /// Blit `sprite` into the next free slot and register it as `name`.
    pub fn pack(&mut self, name: &str, sprite: &Sprite) -> Result<GlyphRecord, AtlasError> {
        if self.by_name.contains_key(name) {
            return Err(AtlasError::DuplicateName(name.to_string()));
        }
        if self.next_code_point > PRIVATE_USE_END {
            return Err(AtlasError::CodePointsExhausted);
        }

        let slot = self.placer.plan(name, sprite.dimensions())?;
        self.surface.commit_blit(sprite.image(), slot.rect);
        self.placer.commit(slot);

        let record = GlyphRecord {
            name: name.to_string(),
            code_point: self.next_code_point,
            slot,
            metrics: GlyphMetrics::for_icon(sprite.dimensions()),
            scale: 1.0,
        };
        self.next_code_point += 1;

        let idx = self.glyphs.len();
        self.by_name.insert(record.name.clone(), idx);
        self.by_code_point.insert(record.code_point, idx);
        self.glyphs.push(record.clone());
        self.requested.remove(name);

        info!(
            glyph = name,
            code_point = %format_args!("U+{:04X}", record.code_point),
            slot.index = slot.index,
            slot.x = slot.rect.x,
            slot.y = slot.rect.y,
            revision = self.surface.revision(),
            "glyph packed"
        );

        for listener in &mut self.listeners {
            listener(&record, &self.surface);
        }
        Ok(record)
    }

    /// Fetch every icon through `cache` and pack it on the owning thread once
    /// its notification is drained.
    ///
    /// Names already packed or already requested are skipped without touching
    /// the cache. The returned future resolves, with the number of icons
    /// fetched successfully, once every fetch it started has settled; the
    /// packing itself happens on the next pump drain after that.
    pub fn download_and_pack_all<S>(
        &mut self,
        cache: &ResourceCache<S>,
        items: &[IconSpec],
    ) -> impl Future<Output = usize> + Send + 'static + use<S>
    where
        S: BorrowMut<AtlasPacker> + 'static,
    {
        let mut fetches = Vec::new();
        for item in items {
            if self.is_packed(&item.name) || self.requested.contains(&item.name) {
                debug!(icon = %item.name, "icon already packed or requested");
                continue;
            }
            if item.name.is_empty() || item.url.is_empty() {
                warn!(icon = %item.name, url = %item.url, "skipping icon without name or url");
                continue;
            }
            self.requested.insert(item.name.clone());

            let name = item.name.clone();
            let callback = sprite_callback(move |state: &mut S, sprite| {
                let packer: &mut AtlasPacker = state.borrow_mut();
                match sprite {
                    Some(sprite) => {
                        if let Err(e) = packer.pack(&name, &sprite) {
                            warn!(icon = %name, err = %e, "failed to pack icon");
                            packer.requested.remove(&name);
                        }
                    }
                    None => {
                        packer.requested.remove(&name);
                    }
                }
            });
            fetches.push(cache.get_or_fetch_with(&item.url, callback));
        }

        debug!(count = fetches.len(), "icon fetches started");
        join_all(fetches).map(|results| results.iter().filter(|r| r.is_some()).count())
    }

    pub fn is_packed(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// True while a fetch for `name` is in flight or awaiting its pack.
    pub fn is_requested(&self, name: &str) -> bool {
        self.requested.contains(name)
    }

    pub fn glyph(&self, name: &str) -> Option<&GlyphRecord> {
        self.by_name.get(name).map(|&idx| &self.glyphs[idx])
    }

    pub fn glyph_by_code_point(&self, code_point: u32) -> Option<&GlyphRecord> {
        self.by_code_point.get(&code_point).map(|&idx| &self.glyphs[idx])
    }

    /// Packed glyphs in packing order.
    pub fn glyphs(&self) -> &[GlyphRecord] {
        &self.glyphs
    }

    pub fn surface(&self) -> &AtlasSurface {
        &self.surface
    }

    pub fn on_refresh(&mut self, listener: RefreshListener) {
        self.listeners.push(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn settings(width: u32, height: u32) -> AtlasSettings {
        AtlasSettings {
            width,
            height,
            ..AtlasSettings::default()
        }
    }

    fn icon(w: u32, h: u32, shade: u8) -> Sprite {
        Sprite::from_rgba("test", RgbaImage::from_pixel(w, h, Rgba([shade, shade, shade, 255])))
            .unwrap()
    }

    #[test]
    fn five_icons_wrap_onto_second_row() {
        let mut packer = AtlasPacker::new(&settings(128, 128)).unwrap();
        let origins: Vec<_> = (0..5)
            .map(|i| {
                let rec = packer.pack(&format!("icon{i}"), &icon(32, 32, 10)).unwrap();
                (rec.rect().x, rec.rect().y)
            })
            .collect();
        assert_eq!(origins, [(0, 0), (32, 0), (64, 0), (96, 0), (0, 32)]);
        assert_eq!(packer.surface().revision(), 5);
    }

    #[test]
    fn records_sequential_private_use_code_points() {
        let mut packer = AtlasPacker::new(&settings(64, 64)).unwrap();
        let a = packer.pack("satisfied", &icon(16, 16, 1)).unwrap();
        let b = packer.pack("laughing", &icon(16, 16, 2)).unwrap();

        assert_eq!(a.code_point, PRIVATE_USE_START);
        assert_eq!(b.code_point, PRIVATE_USE_START + 1);
        assert_eq!(b.metrics.bearing_y, 16);
        assert_eq!(b.metrics.advance, 16);
        assert_eq!(b.scale, 1.0);
        assert_eq!(packer.glyph_by_code_point(PRIVATE_USE_START + 1), Some(&b));
        assert_eq!(packer.glyph("satisfied"), Some(&a));
        assert_eq!(
            packer.surface().image().get_pixel(16, 0),
            &Rgba([2, 2, 2, 255])
        );
    }

    #[test]
    fn duplicate_and_mismatched_icons_leave_state_untouched() {
        let mut packer = AtlasPacker::new(&settings(64, 64)).unwrap();
        packer.pack("a", &icon(16, 16, 1)).unwrap();

        assert_eq!(
            packer.pack("a", &icon(16, 16, 1)).unwrap_err(),
            AtlasError::DuplicateName("a".into())
        );
        assert!(matches!(
            packer.pack("b", &icon(8, 8, 1)),
            Err(AtlasError::CellSizeMismatch { .. })
        ));
        assert_eq!(packer.glyphs().len(), 1);
        assert_eq!(packer.surface().revision(), 1);

        let c = packer.pack("c", &icon(16, 16, 1)).unwrap();
        assert_eq!(c.slot.index, 1);
        assert_eq!(c.code_point, PRIVATE_USE_START + 1);
    }

    #[test]
    fn code_points_run_out_at_end_of_private_use_area() {
        let mut packer = AtlasPacker::new(&AtlasSettings {
            first_code_point: PRIVATE_USE_END,
            ..settings(64, 64)
        })
        .unwrap();
        packer.pack("last", &icon(8, 8, 1)).unwrap();
        assert_eq!(
            packer.pack("overflow", &icon(8, 8, 1)).unwrap_err(),
            AtlasError::CodePointsExhausted
        );
    }

    #[test]
    fn refresh_listeners_see_each_pack() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut packer = AtlasPacker::new(&settings(64, 64)).unwrap();
        let sink = Rc::clone(&seen);
        packer.on_refresh(Box::new(move |glyph, surface| {
            RefCell::borrow_mut(&sink).push((glyph.name.clone(), surface.revision()));
        }));

        packer.pack("a", &icon(8, 8, 1)).unwrap();
        packer.pack("b", &icon(8, 8, 1)).unwrap();
        assert_eq!(*seen.borrow(), [("a".to_string(), 1), ("b".to_string(), 2)]);
    }

    #[test]
    fn rejects_bad_settings() {
        assert!(AtlasPacker::new(&AtlasSettings {
            first_code_point: 0x41,
            ..AtlasSettings::default()
        })
        .is_err());
        assert!(AtlasPacker::new(&AtlasSettings {
            cell_width: Some(16),
            ..AtlasSettings::default()
        })
        .is_err());
    }
}
