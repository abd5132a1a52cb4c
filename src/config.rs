//! Editor configuration.
//!
//! Every section has defaults matching the canvas the engine was built for, so
//! a config file only has to name the keys it changes. Files may be JSON or
//! TOON.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOON config: {0}")]
    Toon(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub layout: LayoutConfig,
    pub headers: HeaderConfig,
    pub palette: PaletteConfig,
}

impl EditorConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_toon_str(input: &str) -> Result<Self, ConfigError> {
        toon_format::decode_default(input).map_err(|e| ConfigError::Toon(e.to_string()))
    }
}

/// Rank axis of the layered layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    #[serde(rename = "LR")]
    LeftToRight,
    #[serde(rename = "RL")]
    RightToLeft,
    #[serde(rename = "TB")]
    TopToBottom,
    #[serde(rename = "BT")]
    BottomToTop,
}

impl Direction {
    pub fn is_horizontal(self) -> bool {
        matches!(self, Direction::LeftToRight | Direction::RightToLeft)
    }

    pub fn is_reversed(self) -> bool {
        matches!(self, Direction::RightToLeft | Direction::BottomToTop)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: Direction,
    /// Gap between adjacent ranks.
    pub rank_sep: f64,
    /// Gap between adjacent nodes of one rank.
    pub node_sep: f64,
    /// Size used for nodes without an authored size.
    pub node_width: f64,
    pub node_height: f64,
    pub max_crossing_passes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: Direction::LeftToRight,
            rank_sep: 100.0,
            node_sep: 50.0,
            node_width: 172.0,
            node_height: 36.0,
            max_crossing_passes: 24,
        }
    }
}

/// Zero-based header rows handed to the tabular header reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderConfig {
    pub source_row: usize,
    pub target_row: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            source_row: 2,
            target_row: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    /// Cycled through per source file, in upload order.
    pub source_colors: Vec<String>,
    /// Colour of imported and manually created source fields.
    pub neutral_color: String,
}

impl PaletteConfig {
    pub fn color_for(&self, file_index: usize) -> Option<&str> {
        if self.source_colors.is_empty() {
            return None;
        }
        Some(&self.source_colors[file_index % self.source_colors.len()])
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            source_colors: [
                "#e0f2fe", "#dcfce7", "#fef9c3", "#ffe4e6", "#f3e8ff", "#fae8ff", "#dbeafe", "#e0e7ff",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            neutral_color: "#f0f0f0".to_string(),
        }
    }
}
