//! Outline assembly: a filter-and-project over the final label sequence.

use crate::model::{Label, OutlineEntry, OutlineResult, TextBlock, DEFAULT_TITLE};

/// Title from every TITLE block in reading order, space-joined.
pub fn assemble_title(blocks: &[TextBlock], labels: &[Label]) -> String {
    let parts: Vec<&str> = blocks
        .iter()
        .zip(labels)
        .filter(|(_, label)| **label == Label::Title)
        .map(|(block, _)| block.text.as_str())
        .collect();

    if parts.is_empty() {
        DEFAULT_TITLE.to_string()
    } else {
        parts.join(" ")
    }
}

/// One entry per heading block, in reading order.
pub fn assemble_outline(blocks: &[TextBlock], labels: &[Label]) -> Vec<OutlineEntry> {
    blocks
        .iter()
        .zip(labels)
        .filter(|(_, label)| label.is_heading())
        .map(|(block, label)| OutlineEntry {
            level: label.as_str().to_string(),
            text: block.text.clone(),
            page: block.page_number,
        })
        .collect()
}

/// Reduces labeled blocks into the final [`OutlineResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineAssembler;

impl OutlineAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Labels are expected in the same order as `blocks`; extra entries on
    /// either side are ignored.
    pub fn assemble(&self, blocks: &[TextBlock], labels: &[Label]) -> OutlineResult {
        if blocks.len() != labels.len() {
            log::warn!(
                "Assembling outline from {} blocks but {} labels",
                blocks.len(),
                labels.len()
            );
        }
        OutlineResult {
            title: assemble_title(blocks, labels),
            outline: assemble_outline(blocks, labels),
        }
    }
}
