//! Run shaping
//!
//! Turns one text run into a flat, visually ordered glyph sequence. The
//! bidi-aware path splits the run into directional sub-runs and shapes each
//! one separately; the bidi-less path shapes everything as one run.

use crate::bidi::{BidiReorderer, TextDirection, VisualRun};
use crate::cluster::ClusterLayoutBuilder;
use crate::shaper::{ShapeRequest, ShapingEngine, StoredGlyphs};

/// Shapes runs with one engine and one bidi reorderer
pub struct RunShaper<'a> {
    engine: &'a mut dyn ShapingEngine,
    bidi: &'a dyn BidiReorderer,
    max_features: usize,
}

impl<'a> RunShaper<'a> {
    pub fn new(
        engine: &'a mut dyn ShapingEngine,
        bidi: &'a dyn BidiReorderer,
        max_features: usize,
    ) -> Self {
        Self {
            engine,
            bidi,
            max_features,
        }
    }

    /// Shape `text` bidi-aware.
    ///
    /// Sub-runs are appended in the visual order the reorderer returns. When
    /// `layout` is given, every sub-run is also added to it as clusters.
    pub fn shape(
        &mut self,
        text: &str,
        request: &ShapeRequest,
        base: TextDirection,
        mut layout: Option<&mut ClusterLayoutBuilder<'_>>,
    ) -> StoredGlyphs {
        let mut out = StoredGlyphs::new();
        if text.is_empty() {
            return out;
        }

        let runs = self.bidi.reorder(text, base);
        tracing::trace!("Shaping {} bytes as {} visual runs", text.len(), runs.len());

        for run in &runs {
            let params = request.params(run.direction, self.max_features);
            let glyphs = self.engine.shape(text, run.range(), &params);
            if let Some(builder) = layout.as_deref_mut() {
                builder.add_run(text, run, &glyphs);
            }
            out.glyphs.extend(glyphs);
        }
        out
    }

    /// Shape `text` as a single run in `direction`, skipping bidi analysis.
    ///
    /// For right-to-left text the result is still stored left to right, so
    /// it is the reverse of the same text shaped left to right.
    pub fn shape_bidiless(
        &mut self,
        text: &str,
        request: &ShapeRequest,
        direction: TextDirection,
    ) -> StoredGlyphs {
        if text.is_empty() {
            return StoredGlyphs::new();
        }
        let params = request.params(direction, self.max_features);
        StoredGlyphs {
            glyphs: self.engine.shape(text, 0..text.len(), &params),
        }
    }

    /// Directional runs of `text` in visual order, as the bidi-aware path
    /// splits them.
    pub fn visual_runs(&self, text: &str, base: TextDirection) -> Vec<VisualRun> {
        self.bidi.reorder(text, base)
    }
}
