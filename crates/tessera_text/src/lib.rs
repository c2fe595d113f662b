//! Text shaping, bidirectional layout, and glyph atlas management
//!
//! This crate provides:
//! - Font resolution per locale (body/header font files, segmentation rules)
//! - Per-size font instances with cached metrics and glyph slots
//! - Text shaping (HarfBuzz via rustybuzz), bidi-aware or single-direction
//! - Grapheme cluster layout with visual-order links for cursor movement
//! - Glyph rasterization with sub-pixel positioning (swash)
//! - Shelf-packed glyph atlas pages behind a texture backend
//!
//! # Architecture
//!
//! ```text
//! FontManager ── resolve_locale ──► Font ── instance(size) ──► SizedFont
//!                                                               │
//!            RunShaper ◄── ShapingEngine + BidiReorderer ───────┤
//!               │                                               │
//!               ├──► StoredGlyphs                               ▼
//!               └──► LayoutDetails (ClusterLayoutBuilder)   GlyphAtlas pages
//! ```
//!
//! Everything here is single-threaded and owned by the caller; there is no
//! global state.

pub mod atlas;
pub mod bidi;
pub mod cluster;
pub mod config;
pub mod font;
pub mod manager;
pub mod rasterizer;
pub mod run;
pub mod segment;
pub mod shaper;
pub mod sized;
pub mod subpixel;

#[cfg(test)]
mod test_support;

pub use atlas::{AtlasAllocation, CpuTextures, GlyphAtlas, TextureBackend, TextureHandle};
pub use bidi::{BidiReorderer, TextDirection, UnicodeBidiReorderer, VisualRun};
pub use cluster::{ClusterLayoutBuilder, ExGraphemeClusterInfo, LayoutDetails};
pub use config::TextConfig;
pub use font::{
    font_index_from_name, font_size_from_name, is_black_font, Font, FontId, FontSelection,
};
pub use manager::{FontManager, LocaleFonts, ResolvedLocale, TextStyle};
pub use rasterizer::{GlyphBitmap, GlyphRasterizer, SwashRasterizer};
pub use run::RunShaper;
pub use segment::{BreakKind, BreakRules};
pub use shaper::{
    BuzzShaper, ShapeRequest, ShapingEngine, StoredGlyph, StoredGlyphs, FIXED_POINT_SCALE,
};
pub use sized::{FontMetrics, GlyphSlot, SizedFont};
pub use subpixel::SubpixelBucket;

use std::path::PathBuf;
use thiserror::Error;

/// Text engine errors
///
/// All of these are unrecoverable for the font they concern. Per-glyph
/// rasterization problems are not errors; they produce empty glyph slots.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("Font file not found: {}", .file.display())]
    FontNotFound { file: PathBuf },

    #[error("Failed to read font file {}: {source}", .file.display())]
    FontRead {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid font data: {0}")]
    InvalidFontData(String),

    #[error("Cannot create shaping handle at {size}px")]
    ShapingHandle { size: i32 },

    #[error("Cannot compile {kind:?} break rules for language '{language}'")]
    SegmentationRules { language: String, kind: BreakKind },

    #[error("Unknown font id {0:?}")]
    UnknownFont(FontId),

    #[error("Invalid text config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TextError>;
