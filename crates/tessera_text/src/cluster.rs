//! Grapheme cluster layout for cursor movement and selection
//!
//! Clusters, not glyphs, are what a cursor steps over and a selection
//! covers. For every directional run the builder:
//!
//! 1. appends one [`ExGraphemeClusterInfo`] per grapheme cluster,
//! 2. links clusters into a visual left/right chain that continues across
//!    run boundaries (indices into the cluster list, `-1` for none),
//! 3. tags word starts and ends,
//! 4. maps each cluster to an x-offset and width from the shaped glyphs.
//!
//! A cluster owns every adjacent glyph shaped for it (a base and its marks).
//! When several clusters share one glyph (a ligature, or a glyph whose
//! cluster does not start a grapheme) the glyph advance is split evenly
//! between them. LTR groups are filled from the left in logical order; RTL
//! groups are filled from the right, so the first logical cluster sits at
//! the visual right end of the glyph.

use crate::bidi::{TextDirection, VisualRun};
use crate::segment::BreakRules;
use crate::shaper::{StoredGlyph, FIXED_POINT_SCALE};
use std::ops::Range;

/// Placement of one grapheme cluster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExGraphemeClusterInfo {
    /// Byte offset of the cluster's first text unit
    pub source_offset: u32,
    /// Number of bytes the cluster spans
    pub unit_length: u32,
    /// Rendered x position relative to the start of the laid out text
    pub x_offset: f32,
    /// Rendered width
    pub width: f32,
    /// Cluster visually to the left, or -1
    pub visual_left: i32,
    /// Cluster visually to the right, or -1
    pub visual_right: i32,
    /// Line index within the layout
    pub line: u32,
    pub flags: u8,
}

impl ExGraphemeClusterInfo {
    pub const F_IS_WORD_START: u8 = 0x01;
    pub const F_IS_WORD_END: u8 = 0x02;
    pub const F_HAS_RTL_DIRECTIONALITY: u8 = 0x10;

    pub fn has_rtl_directionality(&self) -> bool {
        self.flags & Self::F_HAS_RTL_DIRECTIONALITY != 0
    }

    pub fn is_word_start(&self) -> bool {
        self.flags & Self::F_IS_WORD_START != 0
    }

    pub fn is_word_end(&self) -> bool {
        self.flags & Self::F_IS_WORD_END != 0
    }
}

impl Default for ExGraphemeClusterInfo {
    fn default() -> Self {
        Self {
            source_offset: 0,
            unit_length: 0,
            x_offset: 0.0,
            width: 0.0,
            visual_left: -1,
            visual_right: -1,
            line: 0,
            flags: 0,
        }
    }
}

/// Cluster placements for one laid out block of text
///
/// Callers append runs line by line and bump `total_lines` between lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutDetails {
    pub clusters: Vec<ExGraphemeClusterInfo>,
    pub total_lines: u32,
}

impl LayoutDetails {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
        self.total_lines = 0;
    }

    /// Start stamping appended clusters with the next line index.
    pub fn new_line(&mut self) {
        self.total_lines += 1;
    }

    /// Cluster indices in visual order, chain by chain.
    ///
    /// Each chain starts at a cluster with no left neighbor.
    pub fn visual_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.clusters.len());
        for (head, cluster) in self.clusters.iter().enumerate() {
            if cluster.visual_left != -1 {
                continue;
            }
            let mut current = head as i32;
            while current != -1 && out.len() < self.clusters.len() {
                out.push(current as usize);
                current = self.clusters[current as usize].visual_right;
            }
        }
        out
    }
}

/// Appends shaped runs to a [`LayoutDetails`]
///
/// One builder spans one shaping call: it remembers the visually rightmost
/// cluster of the previous run so the next run can splice onto it, and the
/// accumulated advance so x-offsets continue across runs.
pub struct ClusterLayoutBuilder<'a> {
    details: &'a mut LayoutDetails,
    rules: &'a BreakRules,
    details_offset: u32,
    ui_scale: f32,
    last_run_rightmost: Option<usize>,
    run_x: i64,
}

impl<'a> ClusterLayoutBuilder<'a> {
    /// `details_offset` is added to every `source_offset`, so a paragraph can
    /// be appended in several calls.
    pub fn new(
        details: &'a mut LayoutDetails,
        rules: &'a BreakRules,
        details_offset: u32,
        ui_scale: f32,
    ) -> Self {
        Self {
            details,
            rules,
            details_offset,
            ui_scale,
            last_run_rightmost: None,
            run_x: 0,
        }
    }

    /// Add one directional run. `glyphs` are the run's shaped glyphs in
    /// visual order with clusters as byte offsets into `text`.
    pub fn add_run(&mut self, text: &str, run: &VisualRun, glyphs: &[StoredGlyph]) {
        let first_new = self.details.clusters.len();
        let slice = &text[run.range()];
        let base = run.start as u32 + self.details_offset;

        self.push_clusters(slice, run, base, first_new);
        self.link(run.direction, first_new);
        self.tag_words(slice, base, first_new);
        self.place(run, glyphs, first_new);

        self.run_x += glyphs.iter().map(|g| i64::from(g.x_advance)).sum::<i64>();
    }

    fn push_clusters(&mut self, slice: &str, run: &VisualRun, base: u32, first_new: usize) {
        let line = self.details.total_lines;
        let flags = if run.direction.is_rtl() {
            ExGraphemeClusterInfo::F_HAS_RTL_DIRECTIONALITY
        } else {
            0
        };

        for range in self.rules.graphemes(slice) {
            if range.start == 0 && first_new != 0 {
                // The cluster before this run ends the current line
                self.details.clusters[first_new - 1].line = line;
            }
            self.details.clusters.push(ExGraphemeClusterInfo {
                source_offset: base + range.start as u32,
                unit_length: range.len() as u32,
                line,
                flags,
                ..Default::default()
            });
        }
    }

    fn link(&mut self, direction: TextDirection, first_new: usize) {
        let end = self.details.clusters.len();
        if first_new == end {
            return;
        }

        // RTL clusters are laid out right to left: the first logical cluster
        // is the run's rightmost anchor.
        let visual: Vec<usize> = match direction {
            TextDirection::Ltr => (first_new..end).collect(),
            TextDirection::Rtl => (first_new..end).rev().collect(),
        };

        let clusters = &mut self.details.clusters;
        if let Some(prev) = self.last_run_rightmost {
            clusters[prev].visual_right = visual[0] as i32;
            clusters[visual[0]].visual_left = prev as i32;
        }
        for pair in visual.windows(2) {
            clusters[pair[0]].visual_right = pair[1] as i32;
            clusters[pair[1]].visual_left = pair[0] as i32;
        }

        self.last_run_rightmost = visual.last().copied();
    }

    fn tag_words(&mut self, slice: &str, base: u32, first_new: usize) {
        let clusters = &mut self.details.clusters[first_new..];

        for word in self.rules.words(slice) {
            let start = base + word.start as u32;
            let end = base + word.end as u32;

            if let Some(c) = clusters.iter_mut().find(|c| c.source_offset == start) {
                c.flags |= ExGraphemeClusterInfo::F_IS_WORD_START;
            }
            if let Some(c) = clusters
                .iter_mut()
                .rev()
                .find(|c| start <= c.source_offset && c.source_offset < end)
            {
                c.flags |= ExGraphemeClusterInfo::F_IS_WORD_END;
            }
        }
    }

    fn place(&mut self, run: &VisualRun, glyphs: &[StoredGlyph], first_new: usize) {
        let to_text = self.details_offset;

        // Left edge of every glyph within the run, in fixed point
        let mut glyph_left = Vec::with_capacity(glyphs.len());
        let mut x = 0i64;
        for g in glyphs {
            glyph_left.push(x);
            x += i64::from(g.x_advance);
        }

        // Owning glyph span of every new cluster: the glyphs sharing the
        // cluster value of the first exact match, else of the glyph with the
        // greatest cluster before it. Marks shaped around a base glyph land
        // in the same span.
        let owners: Vec<Option<Range<usize>>> = self.details.clusters[first_new..]
            .iter()
            .map(|c| {
                let offset = c.source_offset - to_text;
                glyphs
                    .iter()
                    .position(|g| g.cluster == offset)
                    .or_else(|| {
                        glyphs
                            .iter()
                            .enumerate()
                            .filter(|(_, g)| g.cluster < offset)
                            .max_by_key(|(j, g)| (g.cluster, std::cmp::Reverse(*j)))
                            .map(|(j, _)| j)
                    })
                    .map(|j| glyph_span(glyphs, j))
            })
            .collect();

        let px = FIXED_POINT_SCALE * self.ui_scale;
        for (i, owner) in owners.iter().enumerate() {
            let Some(span) = owner else {
                continue;
            };
            // Clusters of a group are contiguous in logical order
            let group_start = owners[..i]
                .iter()
                .rposition(|o| o.as_ref() != Some(span))
                .map_or(0, |p| p + 1);
            let group_end = owners[i..]
                .iter()
                .position(|o| o.as_ref() != Some(span))
                .map_or(owners.len(), |p| i + p);
            let n = (group_end - group_start) as i64;
            let pos = (i - group_start) as i64;
            let advance: i64 = glyphs[span.clone()]
                .iter()
                .map(|g| i64::from(g.x_advance))
                .sum();

            let (left, right) = match run.direction {
                TextDirection::Ltr => (advance * pos / n, advance * (pos + 1) / n),
                TextDirection::Rtl => (advance * (n - pos - 1) / n, advance * (n - pos) / n),
            };

            let cluster = &mut self.details.clusters[first_new + i];
            cluster.x_offset = (self.run_x + glyph_left[span.start] + left) as f32 / px;
            cluster.width = (right - left) as f32 / px;
        }
    }
}

/// Contiguous glyphs around `j` that share its cluster value
fn glyph_span(glyphs: &[StoredGlyph], j: usize) -> Range<usize> {
    let cluster = glyphs[j].cluster;
    let start = glyphs[..j]
        .iter()
        .rposition(|g| g.cluster != cluster)
        .map_or(0, |p| p + 1);
    let end = glyphs[j..]
        .iter()
        .position(|g| g.cluster != cluster)
        .map_or(glyphs.len(), |p| j + p);
    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidi::{BidiReorderer, UnicodeBidiReorderer};
    use crate::shaper::{ShapeRequest, ShapingEngine, StoredGlyphs};
    use crate::test_support::FixedAdvanceShaper;
    use pretty_assertions::assert_eq;

    fn layout(text: &str, base: TextDirection, shaper: &mut FixedAdvanceShaper) -> LayoutDetails {
        let rules = BreakRules::compile("en").unwrap();
        let mut details = LayoutDetails::new();
        let request = ShapeRequest::new();
        {
            let mut builder = ClusterLayoutBuilder::new(&mut details, &rules, 0, 1.0);
            for run in UnicodeBidiReorderer.reorder(text, base) {
                let params = request.params(run.direction, 10);
                let glyphs = shaper.shape(text, run.range(), &params);
                builder.add_run(text, &run, &glyphs);
            }
        }
        details
    }

    fn assert_simple_path(details: &LayoutDetails) {
        let order = details.visual_order();
        assert_eq!(order.len(), details.clusters.len(), "every cluster reachable once");
        for pair in order.windows(2) {
            assert_eq!(details.clusters[pair[0]].visual_right, pair[1] as i32);
            assert_eq!(details.clusters[pair[1]].visual_left, pair[0] as i32);
        }
    }

    #[test]
    fn test_ltr_clusters_and_positions() {
        let mut shaper = FixedAdvanceShaper::new(640);
        let details = layout("ab c", TextDirection::Ltr, &mut shaper);

        let offsets: Vec<u32> = details.clusters.iter().map(|c| c.source_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
        let xs: Vec<f32> = details.clusters.iter().map(|c| c.x_offset).collect();
        assert_eq!(xs, vec![0.0, 10.0, 20.0, 30.0]);
        assert!(details.clusters.iter().all(|c| c.width == 10.0));
        assert_eq!(details.visual_order(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_word_flags() {
        let mut shaper = FixedAdvanceShaper::new(640);
        let details = layout("ab cd", TextDirection::Ltr, &mut shaper);
        let c = &details.clusters;
        assert!(c[0].is_word_start() && !c[0].is_word_end());
        assert!(c[1].is_word_end() && !c[1].is_word_start());
        // The space is its own word segment
        assert!(c[2].is_word_start() && c[2].is_word_end());
        assert!(c[3].is_word_start());
        assert!(c[4].is_word_end());
    }

    #[test]
    fn test_mixed_direction_chain_is_connected() {
        let mut shaper = FixedAdvanceShaper::new(640);
        let details = layout("Aب", TextDirection::Ltr, &mut shaper);

        assert_eq!(details.clusters.len(), 2);
        let (a, b) = (&details.clusters[0], &details.clusters[1]);
        assert!(!a.has_rtl_directionality());
        assert!(b.has_rtl_directionality());
        assert_eq!((a.visual_left, a.visual_right), (-1, 1));
        assert_eq!((b.visual_left, b.visual_right), (0, -1));
        assert_eq!(b.source_offset, 1);
        assert_eq!(b.unit_length, 2);
        assert_eq!(b.x_offset, 10.0);
    }

    #[test]
    fn test_rtl_run_links_right_to_left() {
        let mut shaper = FixedAdvanceShaper::new(640);
        // "ab " then three Hebrew letters then " cd"
        let text = "ab אבג cd";
        let details = layout(text, TextDirection::Ltr, &mut shaper);
        assert_simple_path(&details);

        let order: Vec<&str> = details
            .visual_order()
            .into_iter()
            .map(|i| {
                let c = &details.clusters[i];
                &text[c.source_offset as usize..(c.source_offset + c.unit_length) as usize]
            })
            .collect();
        assert_eq!(order, vec!["a", "b", " ", "ג", "ב", "א", " ", "c", "d"]);

        // Visual order must also be left-to-right in x
        let xs: Vec<f32> = details
            .visual_order()
            .into_iter()
            .map(|i| details.clusters[i].x_offset)
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]), "{:?}", xs);
    }

    #[test]
    fn test_rtl_base_single_cluster_run_has_no_self_loop() {
        let mut shaper = FixedAdvanceShaper::new(640);
        let details = layout("ب", TextDirection::Rtl, &mut shaper);
        assert_eq!(details.clusters.len(), 1);
        assert_eq!(details.clusters[0].visual_left, -1);
        assert_eq!(details.clusters[0].visual_right, -1);
    }

    #[test]
    fn test_ligature_apportions_advance() {
        // "ffi" shapes to one glyph of advance 1000 fixed units
        let mut shaper = FixedAdvanceShaper::new(640).with_ligature("ffi", 1000);
        let details = layout("ffix", TextDirection::Ltr, &mut shaper);

        let c = &details.clusters;
        let widths: Vec<f32> = c[..3].iter().map(|c| c.width * 64.0).collect();
        assert_eq!(widths, vec![333.0, 333.0, 334.0]);
        let total: f32 = widths.iter().sum();
        assert_eq!(total, 1000.0);
        assert_eq!(c[0].x_offset, 0.0);
        assert_eq!(c[1].x_offset * 64.0, 333.0);
        assert_eq!(c[2].x_offset * 64.0, 666.0);
        assert_eq!(c[3].x_offset * 64.0, 1000.0);
    }

    #[test]
    fn test_rtl_ligature_fills_from_the_right() {
        let mut shaper = FixedAdvanceShaper::new(640).with_ligature("אב", 900);
        let details = layout("אב", TextDirection::Rtl, &mut shaper);

        let c = &details.clusters;
        assert_eq!(c.len(), 2);
        // First logical cluster occupies the right half
        assert_eq!(c[0].x_offset * 64.0, 450.0);
        assert_eq!(c[1].x_offset * 64.0, 0.0);
        assert_eq!((c[0].width + c[1].width) * 64.0, 900.0);
        assert_simple_path(&details);
        assert_eq!(details.visual_order(), vec![1, 0]);
    }

    #[test]
    fn test_line_and_offset_stamping() {
        let rules = BreakRules::compile("en").unwrap();
        let mut shaper = FixedAdvanceShaper::new(640);
        let request = ShapeRequest::new();
        let mut details = LayoutDetails::new();

        for (line, (text, offset)) in [("ab", 0u32), ("cd", 2u32)].into_iter().enumerate() {
            if line > 0 {
                details.new_line();
            }
            let mut builder = ClusterLayoutBuilder::new(&mut details, &rules, offset, 1.0);
            for run in UnicodeBidiReorderer.reorder(text, TextDirection::Ltr) {
                let glyphs = shaper.shape(text, run.range(), &request.params(run.direction, 10));
                builder.add_run(text, &run, &glyphs);
            }
        }

        let offsets: Vec<u32> = details.clusters.iter().map(|c| c.source_offset).collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
        let lines: Vec<u32> = details.clusters.iter().map(|c| c.line).collect();
        // The last cluster of the first line is re-stamped when the next
        // line's first run starts
        assert_eq!(lines, vec![0, 1, 1, 1]);
        assert_eq!(details.total_lines, 1);
    }

    #[test]
    fn test_ui_scale_divides_positions() {
        let rules = BreakRules::compile("en").unwrap();
        let mut shaper = FixedAdvanceShaper::new(640);
        let mut details = LayoutDetails::new();
        let text = "ab";
        {
            let mut builder = ClusterLayoutBuilder::new(&mut details, &rules, 0, 2.0);
            let run = VisualRun {
                start: 0,
                len: 2,
                direction: TextDirection::Ltr,
            };
            let glyphs = shaper.shape(text, run.range(), &ShapeRequest::new().params(run.direction, 10));
            builder.add_run(text, &run, &glyphs);
        }
        assert_eq!(details.clusters[1].x_offset, 5.0);
        assert_eq!(details.clusters[1].width, 5.0);
    }

    fn glyph(cluster: u32, x_advance: i32) -> StoredGlyph {
        StoredGlyph {
            glyph_id: cluster + 1,
            cluster,
            x_advance,
            ..Default::default()
        }
    }

    /// Lay out `text` as one run from hand-made glyphs
    fn layout_glyphs(text: &str, direction: TextDirection, glyphs: &[StoredGlyph]) -> LayoutDetails {
        let rules = BreakRules::compile("ar").unwrap();
        let mut details = LayoutDetails::new();
        {
            let mut builder = ClusterLayoutBuilder::new(&mut details, &rules, 0, 1.0);
            let run = VisualRun {
                start: 0,
                len: text.len(),
                direction,
            };
            builder.add_run(text, &run, glyphs);
        }
        details
    }

    fn total_width(details: &LayoutDetails) -> f32 {
        details.clusters.iter().map(|c| c.width).sum()
    }

    #[test]
    fn test_rtl_cluster_with_mark_keeps_base_advance() {
        // beh + fatha, then teh; shaped right to left the mark glyph comes
        // before its base
        let text = "\u{0628}\u{064E}\u{062A}";
        let glyphs = [glyph(4, 640), glyph(0, 0), glyph(0, 640)];
        let details = layout_glyphs(text, TextDirection::Rtl, &glyphs);

        let c = &details.clusters;
        assert_eq!(c.len(), 2);
        assert_eq!((c[0].source_offset, c[0].unit_length), (0, 4));
        assert_eq!((c[0].x_offset, c[0].width), (10.0, 10.0));
        assert_eq!((c[1].x_offset, c[1].width), (0.0, 10.0));

        let shaped = StoredGlyphs {
            glyphs: glyphs.to_vec(),
        };
        assert_eq!(total_width(&details) * 64.0, shaped.total_advance() as f32);
        assert_eq!(details.visual_order(), vec![1, 0]);
    }

    #[test]
    fn test_ltr_cluster_with_mark_keeps_base_advance() {
        // "e" + combining acute, then "x"
        let text = "e\u{301}x";
        let glyphs = [glyph(0, 640), glyph(0, 0), glyph(3, 640)];
        let details = layout_glyphs(text, TextDirection::Ltr, &glyphs);

        let c = &details.clusters;
        assert_eq!(c.len(), 2);
        assert_eq!((c[0].x_offset, c[0].width), (0.0, 10.0));
        assert_eq!((c[1].x_offset, c[1].width), (10.0, 10.0));
        assert_eq!(total_width(&details), 20.0);
    }

    #[test]
    fn test_multi_glyph_span_is_apportioned() {
        // One cluster value shaped as two glyphs, covering two graphemes
        let text = "ab";
        let glyphs = [glyph(0, 300), glyph(0, 340)];
        let details = layout_glyphs(text, TextDirection::Ltr, &glyphs);

        let widths: Vec<f32> = details.clusters.iter().map(|c| c.width * 64.0).collect();
        assert_eq!(widths, vec![320.0, 320.0]);
        assert_eq!(details.clusters[1].x_offset * 64.0, 320.0);
    }
}
