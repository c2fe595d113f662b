//! A font instance at one exact pixel size
//!
//! Owns the shaping and rasterization handles bound to the size, the atlas
//! pages its glyphs live on, and a glyph slot cache keyed by
//! `(glyph_id << 2) | subpixel_bucket`. Slots are cached whether or not
//! rasterization succeeded, so a bad glyph costs one attempt per session.

use crate::atlas::{GlyphAtlas, TextureBackend, TextureHandle};
use crate::config::TextConfig;
use crate::rasterizer::{GlyphRasterizer, SwashRasterizer};
use crate::shaper::{BuzzShaper, ShapingEngine, StoredGlyph, StoredGlyphs};
use crate::subpixel::SubpixelBucket;
use crate::{Result, TextError};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Vertical metrics in pixels at the instance size
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FontMetrics {
    /// Baseline-to-baseline distance
    pub line_height: f32,
    /// Distance from baseline to top of the em box
    pub ascender: f32,
    /// Distance from baseline to bottom of the em box (positive)
    pub descender: f32,
    /// Half of the line height not covered by ascender + descender
    pub top_adjustment: f32,
}

impl FontMetrics {
    /// Metrics from the face's horizontal header, rounded to whole pixels
    /// outward the way hinted rasterizers report them.
    pub fn from_face(face: &ttf_parser::Face<'_>, px_size: i32) -> Self {
        let scale = px_size as f32 / face.units_per_em() as f32;
        let ascender = (face.ascender() as f32 * scale).ceil();
        let descender = (-(face.descender() as f32) * scale).ceil();
        let line_height = ((face.ascender() as f32 - face.descender() as f32
            + face.line_gap() as f32)
            * scale)
            .round();
        Self::new(line_height, ascender, descender)
    }

    pub fn new(line_height: f32, ascender: f32, descender: f32) -> Self {
        Self {
            line_height,
            ascender,
            descender,
            top_adjustment: (line_height - (ascender + descender)) / 2.0,
        }
    }
}

/// Where a rasterized glyph lives in the atlas
///
/// `width == 0` means there is nothing to draw: the glyph is blank, failed
/// to rasterize, or was too large for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphSlot {
    /// Index into [`SizedFont::pages`]
    pub page: u16,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Horizontal bearing
    pub left: i16,
    /// Vertical bearing
    pub top: i16,
}

impl GlyphSlot {
    pub fn is_empty(&self) -> bool {
        self.width == 0
    }
}

/// Cache key for a glyph at a sub-pixel phase
pub fn glyph_key(glyph_id: u16, bucket: SubpixelBucket) -> u32 {
    (u32::from(glyph_id) << 2) | u32::from(bucket.index())
}

/// One font bound to one pixel size
pub struct SizedFont {
    px_size: i32,
    metrics: FontMetrics,
    shaper: Box<dyn ShapingEngine>,
    rasterizer: Box<dyn GlyphRasterizer>,
    atlas: GlyphAtlas,
    glyph_slots: FxHashMap<u32, GlyphSlot>,
}

impl SizedFont {
    /// Bind font data to `px_size`.
    ///
    /// Fails when the shaping or rasterization handle cannot be created; the
    /// font is unusable at this size.
    pub fn create(data: Arc<[u8]>, px_size: i32, config: &TextConfig) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|_| TextError::ShapingHandle { size: px_size })?;
        let metrics = FontMetrics::from_face(&face, px_size);

        let shaper = BuzzShaper::new(Arc::clone(&data), 0, px_size)?;
        let rasterizer = SwashRasterizer::new(data, 0, px_size as f32)
            .map_err(|_| TextError::ShapingHandle { size: px_size })?;

        tracing::debug!(
            "Created font instance at {}px (line height {}, ascender {}, descender {})",
            px_size,
            metrics.line_height,
            metrics.ascender,
            metrics.descender
        );

        Ok(Self::with_providers(
            px_size,
            metrics,
            Box::new(shaper),
            Box::new(rasterizer),
            GlyphAtlas::new(config.page_size, config.glyph_padding),
        ))
    }

    /// Assemble an instance from explicit providers.
    pub fn with_providers(
        px_size: i32,
        metrics: FontMetrics,
        shaper: Box<dyn ShapingEngine>,
        rasterizer: Box<dyn GlyphRasterizer>,
        atlas: GlyphAtlas,
    ) -> Self {
        Self {
            px_size,
            metrics,
            shaper,
            rasterizer,
            atlas,
            glyph_slots: FxHashMap::default(),
        }
    }

    pub fn px_size(&self) -> i32 {
        self.px_size
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn line_height(&self, ui_scale: f32) -> f32 {
        self.metrics.line_height / ui_scale
    }

    pub fn ascender(&self, ui_scale: f32) -> f32 {
        self.metrics.ascender / ui_scale
    }

    pub fn descender(&self, ui_scale: f32) -> f32 {
        self.metrics.descender / ui_scale
    }

    pub fn top_adjustment(&self, ui_scale: f32) -> f32 {
        self.metrics.top_adjustment / ui_scale
    }

    /// Atlas page textures, indexed by [`GlyphSlot::page`]
    pub fn pages(&self) -> &[TextureHandle] {
        self.atlas.pages()
    }

    pub fn shaper_mut(&mut self) -> &mut dyn ShapingEngine {
        self.shaper.as_mut()
    }

    /// Cached slot, if the glyph was already requested
    pub fn glyph(&self, glyph_id: u16, bucket: SubpixelBucket) -> Option<GlyphSlot> {
        self.glyph_slots.get(&glyph_key(glyph_id, bucket)).copied()
    }

    /// Slot for a glyph at a sub-pixel phase, rasterizing on first request.
    pub fn get_or_create(
        &mut self,
        backend: &mut dyn TextureBackend,
        glyph_id: u16,
        bucket: SubpixelBucket,
    ) -> GlyphSlot {
        let key = glyph_key(glyph_id, bucket);
        if let Some(slot) = self.glyph_slots.get(&key) {
            return *slot;
        }

        let slot = self.make_glyph(backend, glyph_id, bucket);
        self.glyph_slots.insert(key, slot);
        slot
    }

    fn make_glyph(
        &mut self,
        backend: &mut dyn TextureBackend,
        glyph_id: u16,
        bucket: SubpixelBucket,
    ) -> GlyphSlot {
        // Glyph 0 is .notdef; render nothing for it
        if glyph_id == 0 {
            return GlyphSlot::default();
        }

        tracing::trace!(
            "Rasterizing glyph {} (bucket {}) at {}px",
            glyph_id,
            bucket.index(),
            self.px_size
        );

        let Some(bitmap) = self.rasterizer.rasterize(glyph_id, bucket) else {
            tracing::warn!("Glyph {} failed to rasterize at {}px", glyph_id, self.px_size);
            return GlyphSlot::default();
        };
        if bitmap.is_empty() {
            return GlyphSlot::default();
        }

        let Some(allocation) = self.atlas.insert(backend, &bitmap) else {
            tracing::warn!(
                "Glyph {} ({}x{}) does not fit a {}px atlas page",
                glyph_id,
                bitmap.width,
                bitmap.height,
                self.atlas.page_size()
            );
            return GlyphSlot::default();
        };

        GlyphSlot {
            page: allocation.page,
            x: allocation.x,
            y: allocation.y,
            width: bitmap.width,
            height: bitmap.height,
            left: bitmap.left as i16,
            top: bitmap.top as i16,
        }
    }

    /// Width of `count` glyphs starting at `start`, in UI units.
    pub fn text_extent(&self, glyphs: &StoredGlyphs, start: usize, count: usize, ui_scale: f32) -> f32 {
        let total: f32 = glyphs
            .glyphs
            .iter()
            .skip(start)
            .take(count)
            .map(StoredGlyph::advance_px)
            .sum();
        total / ui_scale
    }

    /// Shape `text` with guessed properties and return its width in UI
    /// units. Glyphs are rasterized at phase 0 along the way.
    pub fn measure(&mut self, backend: &mut dyn TextureBackend, text: &str, ui_scale: f32) -> f32 {
        let glyphs = self.shaper.shape_guessed(text);
        let mut x = 0.0;
        for g in &glyphs {
            self.get_or_create(backend, g.glyph_id as u16, SubpixelBucket::ZERO);
            x += g.advance_px();
        }
        x / ui_scale
    }

    /// Drop every cached slot and delete the atlas pages.
    pub fn reset(&mut self, backend: &mut dyn TextureBackend) {
        self.atlas.reset(backend);
        self.glyph_slots.clear();
    }
}
