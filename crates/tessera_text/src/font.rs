//! Font files, font ids, and per-size instances
//!
//! A [`Font`] owns the raw bytes of one font file and lazily creates a
//! [`SizedFont`] for every pixel size it is asked for. Instances live until
//! [`Font::reset_instances`]; there is no eviction.

use crate::atlas::TextureBackend;
use crate::config::TextConfig;
use crate::sized::SizedFont;
use crate::{Result, TextError};
use rustc_hash::FxHashMap;
use std::collections::hash_map::Entry;
use std::path::Path;
use std::sync::Arc;

/// Which of a locale's two configured fonts to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FontSelection {
    /// Running text
    #[default]
    Body,
    /// Titles and headings
    Header,
}

/// Compact 16-bit font handle
///
/// Layout: bits 0-5 size, bit 6 black variant, bits 7+ font slot
/// (zero-based). Bit 7 alone doubles as the body/header selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FontId(u16);

impl FontId {
    const SIZE_MASK: u16 = 0x3F;
    const BLACK_BIT: u16 = 1 << 6;
    const SLOT_SHIFT: u16 = 7;

    /// Id for a locale font at a target line size (truncated to 6 bits)
    pub fn new(selection: FontSelection, target_line_size: f32) -> Self {
        let size = (target_line_size as i32 as u16) & Self::SIZE_MASK;
        let header = match selection {
            FontSelection::Body => 0,
            FontSelection::Header => 1 << Self::SLOT_SHIFT,
        };
        Self(header | size)
    }

    /// Pack a 1-based font index, black flag and size
    pub fn pack(font_index: u32, black: bool, size: u32) -> Self {
        let slot = font_index.saturating_sub(1) << Self::SLOT_SHIFT;
        let black = if black { u32::from(Self::BLACK_BIT) } else { 0 };
        Self((slot | black | (size & u32::from(Self::SIZE_MASK))) as u16)
    }

    pub fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn size(self) -> u32 {
        u32::from(self.0 & Self::SIZE_MASK)
    }

    pub fn is_black(self) -> bool {
        self.0 & Self::BLACK_BIT != 0
    }

    pub fn selection(self) -> FontSelection {
        if (self.0 >> Self::SLOT_SHIFT) & 1 == 0 {
            FontSelection::Body
        } else {
            FontSelection::Header
        }
    }

    /// 1-based font index
    pub fn font_index(self) -> u32 {
        u32::from(self.0 >> Self::SLOT_SHIFT) + 1
    }
}

fn has_suffix_ci(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

fn has_prefix_ci(name: &str, prefix: &str) -> bool {
    name.len() >= prefix.len() && name.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}

/// Whether a legacy font name refers to a black (heavy) variant
pub fn is_black_font(name: &str) -> bool {
    ["_bl", "black", "black_bold"]
        .iter()
        .any(|suffix| has_suffix_ci(name, suffix))
}

/// Pixel size encoded in a legacy font name
///
/// Uses the first run of digits; names without digits fall back to a table
/// of known fonts, then to 14.
pub fn font_size_from_name(name: &str) -> u32 {
    let digits: String = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if !digits.is_empty() {
        return digits.parse().unwrap_or(0);
    }

    const KNOWN: &[(&str, u32)] = &[
        ("fps_font", 14),
        ("tooltip_font", 16),
        ("frangoth_bold", 18),
        ("impact_small", 24),
        ("old_english", 50),
        ("timefont", 24),
        ("vic_title", 42),
    ];
    KNOWN
        .iter()
        .find(|(prefix, _)| has_prefix_ci(name, prefix))
        .map_or(14, |(_, size)| *size)
}

/// 1-based font family index for a legacy font name: 1 for body families,
/// 2 for display families
pub fn font_index_from_name(name: &str) -> u32 {
    const KNOWN: &[(&str, u32)] = &[
        ("arial", 1),
        ("fps", 1),
        ("main", 2),
        ("tooltip", 1),
        ("frangoth", 2),
        ("garamond", 2),
        ("impact", 2),
        ("old", 2),
        ("timefont", 1),
        ("vic", 2),
    ];
    KNOWN
        .iter()
        .find(|(prefix, _)| has_prefix_ci(name, prefix))
        .map_or(1, |(_, index)| *index)
}

/// One loaded font file and its sized instances
pub struct Font {
    file_name: String,
    data: Arc<[u8]>,
    instances: FxHashMap<i32, SizedFont>,
}

impl Font {
    /// Take ownership of font bytes. Fails if they are not a parsable face.
    pub fn from_data(file_name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        let file_name = file_name.into();
        ttf_parser::Face::parse(&data, 0)
            .map_err(|e| TextError::InvalidFontData(format!("{}: {}", file_name, e)))?;
        Ok(Self {
            file_name,
            data: Arc::from(data),
            instances: FxHashMap::default(),
        })
    }

    /// Load a font file from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TextError::FontNotFound {
                file: path.to_path_buf(),
            },
            _ => TextError::FontRead {
                file: path.to_path_buf(),
                source: e,
            },
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tracing::debug!("Loaded font {} ({} bytes)", file_name, data.len());
        Self::from_data(file_name, data)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Instance for `base_size` scaled by `ui_scale`, created on first use.
    ///
    /// Instances are keyed by the truncated scaled size, so sizes that
    /// scale to the same whole pixel share one instance.
    pub fn instance(
        &mut self,
        base_size: i32,
        ui_scale: f32,
        config: &TextConfig,
    ) -> Result<&mut SizedFont> {
        self.instance_at((base_size as f32 * ui_scale) as i32, config)
    }

    /// Instance at an exact pixel size, created on first use
    pub fn instance_at(&mut self, px_size: i32, config: &TextConfig) -> Result<&mut SizedFont> {
        match self.instances.entry(px_size) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let sized = SizedFont::create(Arc::clone(&self.data), px_size, config)?;
                Ok(entry.insert(sized))
            }
        }
    }

    /// Number of sized instances created so far
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Drop every sized instance along with its atlas pages.
    pub fn reset_instances(&mut self, backend: &mut dyn TextureBackend) {
        for sized in self.instances.values_mut() {
            sized.reset(backend);
        }
        self.instances.clear();
    }

    /// Whether the face maps `ch` to a real glyph
    pub fn can_display(&self, ch: char) -> bool {
        ttf_parser::Face::parse(&self.data, 0)
            .ok()
            .and_then(|face| face.glyph_index(ch))
            .is_some_and(|id| id.0 != 0)
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("file_name", &self.file_name)
            .field("bytes", &self.data.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}
