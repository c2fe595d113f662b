//! Glyph rasterization using swash
//!
//! Converts glyph outlines to 8-bit coverage bitmaps for the glyph atlas.
//! The horizontal sub-pixel phase is applied as a translation of the outline
//! before rendering, so each [`SubpixelBucket`] gets its own bitmap.

use crate::subpixel::SubpixelBucket;
use crate::{Result, TextError};
use std::sync::Arc;
use swash::scale::{Render, ScaleContext, Source};
use swash::zeno::{Format, Vector};

/// Coverage bitmap produced by a rasterizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    /// Bitmap width in pixels
    pub width: u32,
    /// Bitmap height in pixels
    pub height: u32,
    /// Bytes between the starts of consecutive rows (>= width)
    pub pitch: usize,
    /// Horizontal bearing (offset from pen position to left edge)
    pub left: i32,
    /// Vertical bearing (offset from baseline to top edge)
    pub top: i32,
    /// 8-bit coverage, `pitch * height` bytes
    pub data: Vec<u8>,
}

impl GlyphBitmap {
    /// Bitmap with no pixels (whitespace and similar)
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Rows copied scanline by scanline with the padding dropped
    pub fn packed_rows(&self) -> Vec<u8> {
        let width = self.width as usize;
        let mut packed = Vec::with_capacity(width * self.height as usize);
        for row in self.data.chunks(self.pitch).take(self.height as usize) {
            packed.extend_from_slice(&row[..width]);
        }
        packed
    }
}

/// Turns a glyph id into a bitmap at a fixed pixel size
///
/// `None` signals that the glyph could not be rasterized; the caller records
/// an empty slot and never asks again.
pub trait GlyphRasterizer {
    fn rasterize(&mut self, glyph_id: u16, subpixel: SubpixelBucket) -> Option<GlyphBitmap>;
}

/// Glyph rasterizer using swash, bound to one font at one pixel size
pub struct SwashRasterizer {
    /// Swash scale context (caches scaling state)
    scale_context: ScaleContext,
    data: Arc<[u8]>,
    face_index: usize,
    px_size: f32,
}

impl SwashRasterizer {
    /// Bind a rasterizer to font data at `px_size`.
    pub fn new(data: Arc<[u8]>, face_index: usize, px_size: f32) -> Result<Self> {
        if swash::FontRef::from_index(&data, face_index).is_none() {
            return Err(TextError::InvalidFontData(format!(
                "swash cannot read face {}",
                face_index
            )));
        }
        Ok(Self {
            scale_context: ScaleContext::new(),
            data,
            face_index,
            px_size,
        })
    }
}

impl GlyphRasterizer for SwashRasterizer {
    fn rasterize(&mut self, glyph_id: u16, subpixel: SubpixelBucket) -> Option<GlyphBitmap> {
        let swash_font = swash::FontRef::from_index(&self.data, self.face_index)?;

        let mut scaler = self
            .scale_context
            .builder(swash_font)
            .size(self.px_size)
            .hint(true)
            .build();

        let image = Render::new(&[Source::Outline])
            .format(Format::Alpha)
            .offset(Vector::new(subpixel.phase(), 0.0))
            .render(&mut scaler, glyph_id)?;

        let width = image.placement.width;
        Some(GlyphBitmap {
            width,
            height: image.placement.height,
            pitch: width as usize,
            left: image.placement.left,
            top: image.placement.top,
            data: image.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packed_rows_drops_padding() {
        let bitmap = GlyphBitmap {
            width: 2,
            height: 3,
            pitch: 3,
            left: 0,
            top: 0,
            data: vec![1, 2, 0, 3, 4, 0, 5, 6, 0],
        };
        assert_eq!(bitmap.packed_rows(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_rejects_garbage_font_data() {
        let data: Arc<[u8]> = Arc::from(&b"not a font"[..]);
        assert!(SwashRasterizer::new(data, 0, 16.0).is_err());
    }
}
