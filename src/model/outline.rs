//! Final outline output.

use serde::{Deserialize, Serialize};

/// Title used when no block was labeled TITLE.
pub const DEFAULT_TITLE: &str = "Document Title Not Found";

/// One heading in the outline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// "H1" through "H4"
    pub level: String,
    pub text: String,
    pub page: u32,
}

/// Title plus headings in reading order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineResult {
    pub title: String,
    pub outline: Vec<OutlineEntry>,
}

impl OutlineResult {
    /// The result for a document without any title or heading blocks.
    pub fn empty() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            outline: Vec::new(),
        }
    }

    pub fn heading_count(&self) -> usize {
        self.outline.len()
    }
}

impl Default for OutlineResult {
    fn default() -> Self {
        Self::empty()
    }
}
