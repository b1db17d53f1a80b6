//! Causal heading context.
//!
//! The context visible to block `i` depends only on the resolved labels of
//! blocks `0..i`. It is threaded through the document as a plain value:
//! [`HeadingContext::advance`] returns the next state and never mutates.

use crate::model::{heading_level_of, Label, TextBlock};

/// Distance reported before any heading has been resolved.
pub const NO_HEADING_DISTANCE: f32 = 100.0;

/// The most recently resolved heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingContext {
    /// Block index of the heading, -1 before the first one
    pub index: i64,
    /// Heading level, 0 before the first one
    pub level: u8,
    /// Heading font size, the document median before the first one
    pub font_size: f32,
}

impl HeadingContext {
    /// State before any block has been seen.
    pub fn initial(median_font_size: f32) -> Self {
        Self {
            index: -1,
            level: 0,
            font_size: median_font_size,
        }
    }

    pub fn has_heading(&self) -> bool {
        self.index >= 0
    }

    /// State after block `index` resolved to the raw label `token`.
    ///
    /// Tokens that do not carry a parseable heading level (including
    /// malformed ones like `"H"`) leave the state unchanged.
    pub fn advance(self, index: usize, token: &str, font_size: f32) -> Self {
        match heading_level_of(token) {
            Some(level) => Self {
                index: index as i64,
                level,
                font_size,
            },
            None => self,
        }
    }

    /// [`advance`](Self::advance) for a label from the fixed taxonomy.
    pub fn advance_label(self, index: usize, label: Label, font_size: f32) -> Self {
        match label.heading_level() {
            Some(level) => Self {
                index: index as i64,
                level,
                font_size,
            },
            None => self,
        }
    }

    /// Block distance from the context heading to `index`.
    pub fn distance_to(&self, index: usize) -> f32 {
        if self.has_heading() {
            (index as i64 - self.index) as f32
        } else {
            NO_HEADING_DISTANCE
        }
    }

    /// Ratio of `font_size` to the context heading's font size.
    pub fn size_ratio(&self, font_size: f32, median_font_size: f32) -> f32 {
        let reference = if self.font_size > 0.0 {
            self.font_size
        } else {
            median_font_size
        };
        if reference > 0.0 {
            font_size / reference
        } else {
            1.0
        }
    }
}

/// Contexts for a labeled document, one per block, each taken before that
/// block's own transition.
pub fn contexts_from_labels(blocks: &[TextBlock], median_font_size: f32) -> Vec<HeadingContext> {
    blocks
        .iter()
        .enumerate()
        .scan(HeadingContext::initial(median_font_size), |state, (i, block)| {
            let visible = *state;
            *state = state.advance(i, block.label_token(), block.font_size);
            Some(visible)
        })
        .collect()
}
