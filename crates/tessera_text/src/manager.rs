//! Font manager
//!
//! Owns every loaded [`Font`], the segmentation rules compiled per base
//! language, the bidi reorderer, and the texture backend atlas pages are
//! created on. Callers resolve a locale once, then shape and rasterize
//! through the returned [`ResolvedLocale`].

use crate::atlas::{CpuTextures, TextureBackend, TextureHandle};
use crate::bidi::{BidiReorderer, TextDirection, UnicodeBidiReorderer};
use crate::cluster::{ClusterLayoutBuilder, LayoutDetails};
use crate::config::TextConfig;
use crate::font::{Font, FontId, FontSelection};
use crate::run::RunShaper;
use crate::segment::BreakRules;
use crate::shaper::{ShapeRequest, StoredGlyphs};
use crate::sized::{FontMetrics, GlyphSlot, SizedFont};
use crate::subpixel::SubpixelBucket;
use crate::{Result, TextError};
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;

/// Font files configured for a locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleFonts {
    /// Locale tag, e.g. `en-US` or `ar_EG`
    pub locale: String,
    /// Body font file name, relative to [`TextConfig::font_dir`]
    pub body_font: String,
    /// Header font file name, relative to [`TextConfig::font_dir`]
    pub header_font: String,
}

impl LocaleFonts {
    pub fn new(
        locale: impl Into<String>,
        body_font: impl Into<String>,
        header_font: impl Into<String>,
    ) -> Self {
        Self {
            locale: locale.into(),
            body_font: body_font.into(),
            header_font: header_font.into(),
        }
    }

    /// Base language of the locale tag (`en-US` -> `en`)
    pub fn language(&self) -> &str {
        self.locale
            .split(['-', '_'])
            .next()
            .unwrap_or(&self.locale)
    }
}

/// Fonts and rules resolved for one locale
#[derive(Debug, Clone)]
pub struct ResolvedLocale {
    pub language: String,
    /// Slot of the body font in the manager
    pub body: usize,
    /// Slot of the header font in the manager
    pub header: usize,
    pub rules: Arc<BreakRules>,
}

impl ResolvedLocale {
    pub fn body_font_id(&self, target_line_size: f32) -> FontId {
        FontId::new(FontSelection::Body, target_line_size)
    }

    pub fn header_font_id(&self, target_line_size: f32) -> FontId {
        FontId::new(FontSelection::Header, target_line_size)
    }

    pub fn slot(&self, selection: FontSelection) -> usize {
        match selection {
            FontSelection::Body => self.body,
            FontSelection::Header => self.header,
        }
    }
}

/// Font, size and UI scale of a piece of text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font: FontId,
    /// Size before UI scaling
    pub size: i32,
    pub ui_scale: f32,
}

impl TextStyle {
    pub fn new(font: FontId, size: i32, ui_scale: f32) -> Self {
        Self {
            font,
            size,
            ui_scale,
        }
    }
}

/// Registry of fonts and per-language segmentation rules
pub struct FontManager<B: TextureBackend = CpuTextures> {
    config: TextConfig,
    fonts: Vec<Font>,
    rules: FxHashMap<String, Arc<BreakRules>>,
    bidi: Box<dyn BidiReorderer>,
    backend: B,
}

impl FontManager<CpuTextures> {
    /// Manager keeping atlas pages in memory
    pub fn with_cpu_textures(config: TextConfig) -> Self {
        Self::new(config, CpuTextures::new())
    }
}

impl<B: TextureBackend> FontManager<B> {
    pub fn new(config: TextConfig, backend: B) -> Self {
        Self {
            config,
            fonts: Vec::new(),
            rules: FxHashMap::default(),
            bidi: Box::new(UnicodeBidiReorderer),
            backend,
        }
    }

    /// Replace the bidi reorderer
    pub fn with_bidi(mut self, bidi: Box<dyn BidiReorderer>) -> Self {
        self.bidi = bidi;
        self
    }

    pub fn config(&self) -> &TextConfig {
        &self.config
    }

    pub fn textures(&self) -> &B {
        &self.backend
    }

    pub fn textures_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Load the locale's fonts and compile its segmentation rules.
    ///
    /// Rules are compiled once per base language; fonts already loaded
    /// under the same file name are reused.
    pub fn resolve_locale(&mut self, locale: &LocaleFonts) -> Result<ResolvedLocale> {
        let language = locale.language().to_ascii_lowercase();
        let rules = self.rules_for(&language)?;
        let body = self.load_font(&locale.body_font)?;
        let header = self.load_font(&locale.header_font)?;

        tracing::info!(
            "Resolved locale {} (body: {}, header: {})",
            locale.locale,
            locale.body_font,
            locale.header_font
        );

        Ok(ResolvedLocale {
            language,
            body,
            header,
            rules,
        })
    }

    /// Segmentation rules for a base language, compiled on first use
    pub fn rules_for(&mut self, language: &str) -> Result<Arc<BreakRules>> {
        if let Some(rules) = self.rules.get(language) {
            return Ok(Arc::clone(rules));
        }
        let rules = Arc::new(BreakRules::compile(language)?);
        self.rules.insert(language.to_string(), Arc::clone(&rules));
        Ok(rules)
    }

    /// Slot of a font file, loading it from the font directory if needed.
    pub fn load_font(&mut self, file_name: &str) -> Result<usize> {
        if let Some(slot) = self.find_font(file_name) {
            return Ok(slot);
        }
        let font = Font::from_file(&self.config.font_dir.join(file_name))?;
        Ok(self.add_font(font))
    }

    /// Register an already loaded font. A font with the same file name
    /// keeps its slot.
    pub fn add_font(&mut self, font: Font) -> usize {
        if let Some(slot) = self.find_font(font.file_name()) {
            return slot;
        }
        self.fonts.push(font);
        self.fonts.len() - 1
    }

    fn find_font(&self, file_name: &str) -> Option<usize> {
        let name = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        self.fonts.iter().position(|f| f.file_name() == name)
    }

    pub fn font(&self, slot: usize) -> Option<&Font> {
        self.fonts.get(slot)
    }

    pub fn font_count(&self) -> usize {
        self.fonts.len()
    }

    /// Slot a font id selects within a locale
    pub fn slot_for(&self, locale: &ResolvedLocale, id: FontId) -> Result<usize> {
        let slot = locale.slot(id.selection());
        if slot < self.fonts.len() {
            Ok(slot)
        } else {
            Err(TextError::UnknownFont(id))
        }
    }

    fn sized(&mut self, locale: &ResolvedLocale, style: TextStyle) -> Result<&mut SizedFont> {
        let slot = self.slot_for(locale, style.font)?;
        self.fonts[slot].instance(style.size, style.ui_scale, &self.config)
    }

    /// Shape `text` bidi-aware. With `layout`, clusters are appended to the
    /// given details starting at the given source offset.
    pub fn shape(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        text: &str,
        request: &ShapeRequest,
        base: TextDirection,
        layout: Option<(&mut LayoutDetails, u32)>,
    ) -> Result<StoredGlyphs> {
        let slot = self.slot_for(locale, style.font)?;
        let Self {
            config,
            fonts,
            bidi,
            ..
        } = self;
        let sized = fonts[slot].instance(style.size, style.ui_scale, config)?;
        let mut shaper = RunShaper::new(sized.shaper_mut(), &**bidi, config.max_features);

        let glyphs = match layout {
            Some((details, details_offset)) => {
                let mut builder =
                    ClusterLayoutBuilder::new(details, &locale.rules, details_offset, style.ui_scale);
                shaper.shape(text, request, base, Some(&mut builder))
            }
            None => shaper.shape(text, request, base, None),
        };
        Ok(glyphs)
    }

    /// Shape `text` as one run in `direction`, skipping bidi analysis.
    pub fn shape_bidiless(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        text: &str,
        request: &ShapeRequest,
        direction: TextDirection,
    ) -> Result<StoredGlyphs> {
        let slot = self.slot_for(locale, style.font)?;
        let Self {
            config,
            fonts,
            bidi,
            ..
        } = self;
        let sized = fonts[slot].instance(style.size, style.ui_scale, config)?;
        let mut shaper = RunShaper::new(sized.shaper_mut(), &**bidi, config.max_features);
        Ok(shaper.shape_bidiless(text, request, direction))
    }

    /// Atlas slot of a glyph at a sub-pixel phase, rasterizing on first use
    pub fn glyph_slot(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        glyph_id: u16,
        bucket: SubpixelBucket,
    ) -> Result<GlyphSlot> {
        let slot = self.slot_for(locale, style.font)?;
        let Self {
            config,
            fonts,
            backend,
            ..
        } = self;
        let sized = fonts[slot].instance(style.size, style.ui_scale, config)?;
        Ok(sized.get_or_create(backend, glyph_id, bucket))
    }

    /// Glyph slot for a glyph drawn at pen position `x` (pixels): the
    /// whole-pixel position to draw at and the slot of the matching phase.
    pub fn place_glyph(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        glyph_id: u16,
        x: f32,
    ) -> Result<(i32, GlyphSlot)> {
        let (pixel, bucket) = SubpixelBucket::quantize(x);
        let slot = self.glyph_slot(locale, style, glyph_id, bucket)?;
        Ok((pixel, slot))
    }

    /// Texture of an atlas page referenced by [`GlyphSlot::page`]
    pub fn page_texture(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        page: u16,
    ) -> Result<Option<TextureHandle>> {
        let sized = self.sized(locale, style)?;
        Ok(sized.pages().get(usize::from(page)).copied())
    }

    pub fn metrics(&mut self, locale: &ResolvedLocale, style: TextStyle) -> Result<FontMetrics> {
        let ui_scale = style.ui_scale;
        let sized = self.sized(locale, style)?;
        Ok(FontMetrics {
            line_height: sized.line_height(ui_scale),
            ascender: sized.ascender(ui_scale),
            descender: sized.descender(ui_scale),
            top_adjustment: sized.top_adjustment(ui_scale),
        })
    }

    pub fn line_height(&mut self, locale: &ResolvedLocale, style: TextStyle) -> Result<f32> {
        let ui_scale = style.ui_scale;
        Ok(self.sized(locale, style)?.line_height(ui_scale))
    }

    /// Width of `count` glyphs starting at `start`, in UI units
    pub fn text_extent(
        &mut self,
        locale: &ResolvedLocale,
        style: TextStyle,
        glyphs: &StoredGlyphs,
        start: usize,
        count: usize,
    ) -> Result<f32> {
        let ui_scale = style.ui_scale;
        Ok(self
            .sized(locale, style)?
            .text_extent(glyphs, start, count, ui_scale))
    }

    /// Width of `text` shaped with guessed properties, in UI units
    pub fn measure(&mut self, locale: &ResolvedLocale, style: TextStyle, text: &str) -> Result<f32> {
        let slot = self.slot_for(locale, style.font)?;
        let Self {
            config,
            fonts,
            backend,
            ..
        } = self;
        let sized = fonts[slot].instance(style.size, style.ui_scale, config)?;
        Ok(sized.measure(backend, text, style.ui_scale))
    }

    /// Whether the selected font can render `ch`
    pub fn can_display(&self, locale: &ResolvedLocale, id: FontId, ch: char) -> Result<bool> {
        let slot = self.slot_for(locale, id)?;
        Ok(self.fonts[slot].can_display(ch))
    }

    /// Drop every sized instance of every font and delete their atlas
    /// pages. Must not run while glyph slots are still being drawn.
    pub fn reset_fonts(&mut self) {
        for font in &mut self.fonts {
            font.reset_instances(&mut self.backend);
        }
        tracing::debug!("Reset {} fonts", self.fonts.len());
    }
}
