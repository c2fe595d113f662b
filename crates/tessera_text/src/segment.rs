//! Unicode text segmentation rule sets
//!
//! Three rule sets (grapheme, word, line) are compiled once per base
//! language tag and shared by every layout for that language. Each produces
//! forward boundary offsets over a text slice, ending at the slice length.
//!
//! Grapheme and word boundaries follow UAX #29 (unicode-segmentation); line
//! break opportunities follow UAX #14 (unicode-linebreak). Both use the
//! untailored default rules, so every language segments the same way; the
//! language tag only keys the rule cache and must be a well-formed BCP 47
//! primary language subtag (2 to 8 ASCII letters).

use crate::{Result, TextError};
use std::ops::Range;
use unicode_linebreak::BreakOpportunity;
use unicode_segmentation::UnicodeSegmentation;

/// Kind of text boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakKind {
    Grapheme,
    Word,
    Line,
}

/// A boundary rule set for one kind, validated against a language tag
#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleSet {
    kind: BreakKind,
}

impl RuleSet {
    fn compile(kind: BreakKind, language: &str) -> Result<Self> {
        let valid = (2..=8).contains(&language.len())
            && language.bytes().all(|b| b.is_ascii_alphabetic());
        if !valid {
            return Err(TextError::SegmentationRules {
                language: language.to_string(),
                kind,
            });
        }
        Ok(Self { kind })
    }

    fn boundaries(&self, text: &str) -> Vec<usize> {
        match self.kind {
            BreakKind::Grapheme => text
                .grapheme_indices(true)
                .map(|(i, g)| i + g.len())
                .collect(),
            BreakKind::Word => text
                .split_word_bound_indices()
                .map(|(i, w)| i + w.len())
                .collect(),
            BreakKind::Line => unicode_linebreak::linebreaks(text).map(|(i, _)| i).collect(),
        }
    }
}

/// Grapheme, word and line rules for one base language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakRules {
    language: String,
    grapheme: RuleSet,
    word: RuleSet,
    line: RuleSet,
}

impl BreakRules {
    /// Compile the rule sets for a base language tag (e.g. `en`, `ar`).
    ///
    /// Fails with [`TextError::SegmentationRules`] when the tag is not a
    /// primary language subtag.
    pub fn compile(language: &str) -> Result<Self> {
        let language = language.to_ascii_lowercase();
        let line = RuleSet::compile(BreakKind::Line, &language)?;
        let grapheme = RuleSet::compile(BreakKind::Grapheme, &language)?;
        let word = RuleSet::compile(BreakKind::Word, &language)?;
        tracing::debug!("Compiled break rules for '{}'", language);
        Ok(Self {
            language,
            grapheme,
            word,
            line,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Boundary offsets after each segment of `text`, in increasing order.
    ///
    /// The last offset is always `text.len()` for non-empty text.
    pub fn boundaries(&self, kind: BreakKind, text: &str) -> Vec<usize> {
        match kind {
            BreakKind::Grapheme => self.grapheme.boundaries(text),
            BreakKind::Word => self.word.boundaries(text),
            BreakKind::Line => self.line.boundaries(text),
        }
    }

    /// Grapheme cluster ranges of `text`
    pub fn graphemes(&self, text: &str) -> Vec<Range<usize>> {
        segments(self.grapheme.boundaries(text))
    }

    /// Word-boundary segments of `text`, including whitespace and punctuation
    pub fn words(&self, text: &str) -> Vec<Range<usize>> {
        segments(self.word.boundaries(text))
    }

    /// Line break opportunities as `(offset, mandatory)`
    pub fn line_breaks(&self, text: &str) -> Vec<(usize, bool)> {
        unicode_linebreak::linebreaks(text)
            .map(|(i, op)| (i, op == BreakOpportunity::Mandatory))
            .collect()
    }
}

fn segments(boundaries: Vec<usize>) -> Vec<Range<usize>> {
    let mut start = 0;
    boundaries
        .into_iter()
        .filter_map(|end| {
            let range = start..end;
            start = end;
            (!range.is_empty()).then_some(range)
        })
        .collect()
}
