//! Deterministic providers and font discovery shared by unit tests

use crate::bidi::TextDirection;
use crate::rasterizer::{GlyphBitmap, GlyphRasterizer};
use crate::shaper::{ShapeParams, ShapingEngine, StoredGlyph};
use crate::subpixel::SubpixelBucket;
use std::cell::Cell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

/// Shapes one glyph per char with a fixed advance, except for registered
/// ligature strings which become a single glyph.
pub struct FixedAdvanceShaper {
    advance: i32,
    ligatures: Vec<(&'static str, i32)>,
}

impl FixedAdvanceShaper {
    pub fn new(advance: i32) -> Self {
        Self {
            advance,
            ligatures: Vec::new(),
        }
    }

    pub fn with_ligature(mut self, text: &'static str, advance: i32) -> Self {
        self.ligatures.push((text, advance));
        self
    }
}

impl ShapingEngine for FixedAdvanceShaper {
    fn shape(
        &mut self,
        text: &str,
        range: Range<usize>,
        params: &ShapeParams<'_>,
    ) -> Vec<StoredGlyph> {
        let base = range.start;
        let slice = &text[range];
        let mut glyphs = Vec::new();
        let mut pos = 0;
        while pos < slice.len() {
            let rest = &slice[pos..];
            if let Some((lig, advance)) = self.ligatures.iter().find(|(l, _)| rest.starts_with(l)) {
                glyphs.push(StoredGlyph {
                    glyph_id: 0xFFFF,
                    cluster: (base + pos) as u32,
                    x_advance: *advance,
                    ..Default::default()
                });
                pos += lig.len();
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            glyphs.push(StoredGlyph {
                glyph_id: ch as u32,
                cluster: (base + pos) as u32,
                x_advance: self.advance,
                ..Default::default()
            });
            pos += ch.len_utf8();
        }
        if params.direction == TextDirection::Rtl {
            glyphs.reverse();
        }
        glyphs
    }
}

/// Rasterizer stub returning fixed-size bitmaps and counting calls.
///
/// Glyph ids listed in `failing` return `None`.
pub struct CountingRasterizer {
    pub calls: Rc<Cell<usize>>,
    pub width: u32,
    pub height: u32,
    pub failing: Vec<u16>,
}

impl CountingRasterizer {
    pub fn new(width: u32, height: u32) -> (Self, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Self {
                calls: Rc::clone(&calls),
                width,
                height,
                failing: Vec::new(),
            },
            calls,
        )
    }
}

impl GlyphRasterizer for CountingRasterizer {
    fn rasterize(&mut self, glyph_id: u16, subpixel: SubpixelBucket) -> Option<GlyphBitmap> {
        self.calls.set(self.calls.get() + 1);
        if self.failing.contains(&glyph_id) {
            return None;
        }
        Some(GlyphBitmap {
            width: self.width,
            height: self.height,
            pitch: self.width as usize,
            left: i32::from(subpixel.index()),
            top: self.height as i32,
            data: vec![0x80; (self.width * self.height) as usize],
        })
    }
}

/// Any installed sans-serif (or failing that, any) font face.
pub fn system_font() -> Option<(Arc<[u8]>, u32)> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let query = fontdb::Query {
        families: &[fontdb::Family::SansSerif],
        ..Default::default()
    };
    let id = db
        .query(&query)
        .or_else(|| db.faces().next().map(|face| face.id))?;
    db.with_face_data(id, |data, index| (Arc::from(data), index))
}
