//! Enriched text blocks: the unit of classification and of manual labeling.

use serde::{Deserialize, Serialize};

use super::BBox;

/// Language code used when identification fails or was never run.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// Font name used for records that do not carry one.
pub const DEFAULT_FONT_NAME: &str = "default";

/// One logical paragraph or line group with its layout and typography.
///
/// The serialized form is the labeling artifact: an array of these records is
/// written by `extract`, hand-labeled, and read back for training. Fields
/// missing from older files fall back to neutral defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    /// Normalized block text
    #[serde(default)]
    pub text: String,

    /// Bounding box, top-left origin
    #[serde(default)]
    pub bbox: BBox,

    /// Page number (1-indexed)
    pub page_number: u32,

    #[serde(default = "default_page_width")]
    pub page_width: f32,

    #[serde(default = "default_page_height")]
    pub page_height: f32,

    /// Dominant (modal) font size over the block's spans
    #[serde(default)]
    pub font_size: f32,

    /// Dominant (modal) font name over the block's spans
    #[serde(default = "default_font_name")]
    pub font_name: String,

    #[serde(default)]
    pub is_bold: bool,

    #[serde(default)]
    pub is_italic: bool,

    /// Language code, absent in files written before language detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(default = "default_one")]
    pub line_count: u32,

    #[serde(default)]
    pub word_count: u32,

    #[serde(default)]
    pub char_count: u32,

    #[serde(default)]
    pub is_in_table: bool,

    /// 1 = left half of the page, 2 = right half
    #[serde(default = "default_column")]
    pub column: u8,

    /// Gap to the previous block on the same page
    #[serde(default = "default_gap")]
    pub vertical_space_before: f32,

    /// Gap to the next block on the same page
    #[serde(default = "default_gap")]
    pub vertical_space_after: f32,

    /// Ground-truth label token, present only in labeled data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

fn default_page_width() -> f32 {
    612.0
}

fn default_page_height() -> f32 {
    792.0
}

fn default_font_name() -> String {
    DEFAULT_FONT_NAME.to_string()
}

fn default_one() -> u32 {
    1
}

fn default_column() -> u8 {
    1
}

fn default_gap() -> f32 {
    50.0
}

impl TextBlock {
    /// Create a block with the given text and geometry and neutral typography.
    pub fn new(text: impl Into<String>, bbox: BBox, page_number: u32) -> Self {
        let text = text.into();
        Self {
            word_count: text.split_whitespace().count() as u32,
            char_count: text.chars().count() as u32,
            text,
            bbox,
            page_number,
            page_width: default_page_width(),
            page_height: default_page_height(),
            font_size: 0.0,
            font_name: default_font_name(),
            is_bold: false,
            is_italic: false,
            language: None,
            line_count: 1,
            is_in_table: false,
            column: 1,
            vertical_space_before: default_gap(),
            vertical_space_after: default_gap(),
            label: None,
        }
    }

    /// Language code, or [`UNKNOWN_LANGUAGE`] when none was recorded.
    pub fn language_code(&self) -> &str {
        self.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE)
    }

    /// Label token, with unlabeled blocks reading as `NONE`.
    pub fn label_token(&self) -> &str {
        self.label.as_deref().unwrap_or("NONE")
    }
}
