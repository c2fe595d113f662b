//! Engine configuration

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tunables for the text engine
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextConfig {
    /// Edge length of each square atlas page in pixels
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Empty pixels kept to the right of and below every packed glyph
    #[serde(default = "default_glyph_padding")]
    pub glyph_padding: u32,
    /// Maximum number of shaping features applied to a run
    #[serde(default = "default_max_features")]
    pub max_features: usize,
    /// Directory that locale font files are resolved against
    #[serde(default = "default_font_dir")]
    pub font_dir: PathBuf,
}

fn default_page_size() -> u32 {
    1024
}

fn default_glyph_padding() -> u32 {
    1
}

fn default_max_features() -> usize {
    10
}

fn default_font_dir() -> PathBuf {
    PathBuf::from("assets").join("fonts")
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            glyph_padding: default_glyph_padding(),
            max_features: default_max_features(),
            font_dir: default_font_dir(),
        }
    }
}

impl TextConfig {
    /// Parse a config from a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }
}
