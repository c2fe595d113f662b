//! Text shaping using rustybuzz (HarfBuzz port)
//!
//! Converts text to positioned glyphs. Advances and offsets are kept in
//! 26.6 fixed point (64 units per pixel) at the size the shaper is bound to.

use crate::bidi::TextDirection;
use crate::{Result, TextError};
use rustybuzz::{Direction, Face, Feature, Language, Script, UnicodeBuffer};
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use ttf_parser::Tag;

/// Fixed-point units per pixel for glyph advances and offsets
pub const FIXED_POINT_SCALE: f32 = 64.0;

/// One shaped glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StoredGlyph {
    /// Glyph ID in the font
    pub glyph_id: u32,
    /// Byte offset of the source cluster this glyph belongs to
    pub cluster: u32,
    pub x_advance: i32,
    pub y_advance: i32,
    pub x_offset: i32,
    pub y_offset: i32,
}

impl StoredGlyph {
    /// Horizontal advance in pixels
    pub fn advance_px(&self) -> f32 {
        self.x_advance as f32 / FIXED_POINT_SCALE
    }
}

/// Shaped glyphs of one text run in left-to-right visual order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredGlyphs {
    pub glyphs: Vec<StoredGlyph>,
}

impl StoredGlyphs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of `count` glyphs starting at `offset`
    ///
    /// The range is clamped to the glyphs that exist.
    pub fn slice(&self, offset: usize, count: usize) -> Self {
        let start = offset.min(self.glyphs.len());
        let end = offset.saturating_add(count).min(self.glyphs.len());
        Self {
            glyphs: self.glyphs[start..end].to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StoredGlyph> {
        self.glyphs.iter()
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    /// Sum of horizontal advances in fixed-point units
    pub fn total_advance(&self) -> i64 {
        self.glyphs.iter().map(|g| i64::from(g.x_advance)).sum()
    }
}

/// Script, language and OpenType features for a shaping call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeRequest {
    /// ISO 15924 script tag (e.g. `Latn`, `Arab`); guessed when `None`
    pub script: Option<Tag>,
    /// BCP 47 language (e.g. `en`, `ar`); guessed when `None`
    pub language: Option<String>,
    /// Features enabled over the whole run
    pub features: Vec<Tag>,
}

impl ShapeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(mut self, script: &[u8; 4]) -> Self {
        self.script = Some(Tag::from_bytes(script));
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.language = Some(language.to_string());
        self
    }

    pub fn with_feature(mut self, feature: &[u8; 4]) -> Self {
        self.features.push(Tag::from_bytes(feature));
        self
    }

    /// Borrowed parameters for one direction, with at most `max_features`
    /// features. Extra features are dropped.
    pub fn params(&self, direction: TextDirection, max_features: usize) -> ShapeParams<'_> {
        if self.features.len() > max_features {
            tracing::warn!(
                "Dropping {} shaping features past the limit of {}",
                self.features.len() - max_features,
                max_features
            );
        }
        let count = self.features.len().min(max_features);
        ShapeParams {
            direction,
            script: self.script,
            language: self.language.as_deref(),
            features: &self.features[..count],
        }
    }
}

/// Parameters handed to a [`ShapingEngine`] for one directional run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeParams<'a> {
    pub direction: TextDirection,
    pub script: Option<Tag>,
    pub language: Option<&'a str>,
    pub features: &'a [Tag],
}

/// A text shaper bound to one font at one pixel size
pub trait ShapingEngine {
    /// Shape `text[range]` as a single run.
    ///
    /// Glyphs are returned in visual order (reversed logical order for RTL),
    /// with `cluster` as a byte offset into `text`, not into the range.
    fn shape(
        &mut self,
        text: &str,
        range: Range<usize>,
        params: &ShapeParams<'_>,
    ) -> Vec<StoredGlyph>;

    /// Shape `text` with direction, script and language guessed from content
    /// and no features.
    fn shape_guessed(&mut self, text: &str) -> Vec<StoredGlyph> {
        let params = ShapeParams {
            direction: TextDirection::Ltr,
            script: None,
            language: None,
            features: &[],
        };
        self.shape(text, 0..text.len(), &params)
    }
}

/// [`ShapingEngine`] backed by rustybuzz
pub struct BuzzShaper {
    data: Arc<[u8]>,
    face_index: u32,
    /// Font units to 26.6 fixed point at the bound size
    scale: f32,
}

impl BuzzShaper {
    /// Bind a shaper to font data at `px_size` pixels per em.
    pub fn new(data: Arc<[u8]>, face_index: u32, px_size: i32) -> Result<Self> {
        let face = Face::from_slice(&data, face_index)
            .ok_or(TextError::ShapingHandle { size: px_size })?;
        let units_per_em = face.units_per_em();
        if units_per_em == 0 || px_size <= 0 {
            return Err(TextError::ShapingHandle { size: px_size });
        }
        let scale = px_size as f32 * FIXED_POINT_SCALE / units_per_em as f32;
        Ok(Self {
            data,
            face_index,
            scale,
        })
    }

    fn to_fixed(&self, units: i32) -> i32 {
        (units as f32 * self.scale).round() as i32
    }

    fn run(&self, buffer: UnicodeBuffer, features: &[Feature], base: u32) -> Vec<StoredGlyph> {
        let Some(face) = Face::from_slice(&self.data, self.face_index) else {
            return Vec::new();
        };
        let output = rustybuzz::shape(&face, features, buffer);

        output
            .glyph_infos()
            .iter()
            .zip(output.glyph_positions())
            .map(|(info, pos)| StoredGlyph {
                glyph_id: info.glyph_id,
                cluster: info.cluster + base,
                x_advance: self.to_fixed(pos.x_advance),
                y_advance: self.to_fixed(pos.y_advance),
                x_offset: self.to_fixed(pos.x_offset),
                y_offset: self.to_fixed(pos.y_offset),
            })
            .collect()
    }
}

impl ShapingEngine for BuzzShaper {
    fn shape(
        &mut self,
        text: &str,
        range: Range<usize>,
        params: &ShapeParams<'_>,
    ) -> Vec<StoredGlyph> {
        let base = range.start as u32;
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(&text[range]);
        buffer.set_direction(match params.direction {
            TextDirection::Ltr => Direction::LeftToRight,
            TextDirection::Rtl => Direction::RightToLeft,
        });
        if let Some(script) = params.script.and_then(Script::from_iso15924_tag) {
            buffer.set_script(script);
        }
        if let Some(language) = params.language.and_then(|l| Language::from_str(l).ok()) {
            buffer.set_language(language);
        }
        buffer.guess_segment_properties();

        let features: Vec<Feature> = params
            .features
            .iter()
            .map(|tag| Feature::new(*tag, 1, ..))
            .collect();

        self.run(buffer, &features, base)
    }

    fn shape_guessed(&mut self, text: &str) -> Vec<StoredGlyph> {
        let mut buffer = UnicodeBuffer::new();
        buffer.push_str(text);
        buffer.guess_segment_properties();
        self.run(buffer, &[], 0)
    }
}
