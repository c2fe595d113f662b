//! Bidirectional run splitting
//!
//! Splits text into directional runs and orders them visually, left to
//! right, using the Unicode Bidirectional Algorithm (unicode-bidi).

use unicode_bidi::{BidiInfo, Level};

/// Resolved writing direction of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

impl TextDirection {
    pub fn is_rtl(self) -> bool {
        self == TextDirection::Rtl
    }
}

/// A maximal single-direction range of the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualRun {
    /// Byte offset of the run start in logical order
    pub start: usize,
    /// Length in bytes
    pub len: usize,
    pub direction: TextDirection,
}

impl VisualRun {
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.len
    }
}

/// Orders directional runs of a text
pub trait BidiReorderer {
    /// Directional runs of `text` in left-to-right visual order.
    fn reorder(&self, text: &str, base: TextDirection) -> Vec<VisualRun>;
}

/// [`BidiReorderer`] backed by unicode-bidi
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeBidiReorderer;

impl BidiReorderer for UnicodeBidiReorderer {
    fn reorder(&self, text: &str, base: TextDirection) -> Vec<VisualRun> {
        let level = match base {
            TextDirection::Ltr => Level::ltr(),
            TextDirection::Rtl => Level::rtl(),
        };
        let info = BidiInfo::new(text, Some(level));

        let mut out = Vec::new();
        for para in &info.paragraphs {
            let (levels, runs) = info.visual_runs(para, para.range.clone());
            for run in runs {
                if run.is_empty() {
                    continue;
                }
                let direction = if levels[run.start].is_rtl() {
                    TextDirection::Rtl
                } else {
                    TextDirection::Ltr
                };
                out.push(VisualRun {
                    start: run.start,
                    len: run.len(),
                    direction,
                });
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pure_ltr_is_one_run() {
        let runs = UnicodeBidiReorderer.reorder("Hello world", TextDirection::Ltr);
        assert_eq!(
            runs,
            vec![VisualRun {
                start: 0,
                len: 11,
                direction: TextDirection::Ltr
            }]
        );
    }

    #[test]
    fn test_latin_then_arabic() {
        // 'ب' is two bytes in UTF-8
        let runs = UnicodeBidiReorderer.reorder("Aب", TextDirection::Ltr);
        assert_eq!(
            runs,
            vec![
                VisualRun {
                    start: 0,
                    len: 1,
                    direction: TextDirection::Ltr
                },
                VisualRun {
                    start: 1,
                    len: 2,
                    direction: TextDirection::Rtl
                },
            ]
        );
    }

    #[test]
    fn test_rtl_base_puts_later_runs_first() {
        // In an RTL paragraph the logically later Latin word is visually left
        let text = "שלום abc";
        let runs = UnicodeBidiReorderer.reorder(text, TextDirection::Rtl);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].direction, TextDirection::Ltr);
        assert_eq!(&text[runs[0].range()], "abc");
        assert_eq!(runs[1].direction, TextDirection::Rtl);
        assert_eq!(runs[1].start, 0);
    }

    #[test]
    fn test_empty_text_has_no_runs() {
        assert!(UnicodeBidiReorderer
            .reorder("", TextDirection::Ltr)
            .is_empty());
    }
}
