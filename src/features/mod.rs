//! Per-block feature vectors.
//!
//! The feature list below is the contract between training and inference:
//! a bundle records the names it was trained with and is rejected if they
//! differ from [`FEATURE_NAMES`] in content or order.

mod context;
mod vocab;

use regex::Regex;

use crate::model::TextBlock;

pub use context::{contexts_from_labels, HeadingContext, NO_HEADING_DISTANCE};
pub use vocab::{IdMap, Vocabulary, UNSEEN_ID};

/// Identifier of the feature layout below.
pub const SCHEMA_VERSION: &str = "v2-causal";

/// Ordered feature names.
pub const FEATURE_NAMES: [&str; 23] = [
    "font_size",
    "is_bold",
    "is_italic",
    "relative_font_size",
    "font_name_id",
    "bold_x_rel_size",
    "line_width_ratio",
    "y_position_normalized",
    "x_position_normalized",
    "is_centered",
    "is_in_table",
    "column",
    "space_before_ratio",
    "space_after_ratio",
    "line_count",
    "word_count",
    "is_all_caps",
    "ends_with_punct",
    "starts_with_pattern",
    "language_id",
    "last_heading_level",
    "distance_from_last_heading",
    "font_size_vs_last_heading",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// Only sizes strictly above this count toward the document median.
pub const MEDIAN_NOISE_THRESHOLD: f32 = 6.0;
/// Median used when no block passes the noise threshold.
pub const DEFAULT_MEDIAN_FONT_SIZE: f32 = 12.0;
/// Max distance of the block midpoint from the page center, as a share of
/// page width, for a block to count as centered.
pub const CENTER_TOLERANCE: f32 = 0.15;
/// Spacing ratio used for blocks without a font size.
pub const SPACING_FALLBACK_RATIO: f32 = 5.0;
/// All-caps requires more characters than this.
pub const ALL_CAPS_MIN_CHARS: usize = 3;

const TERMINAL_PUNCTUATION: [char; 6] = [':', '.', '。', '：', '!', '?'];

const HEADING_PATTERN: &str = r"(?i)^(?:(?:\d+(?:\.\d+)*\.|[A-Z]\.|\(?[a-z\d]\)|[IVXLC]+\.)|(?:(?:Appendix|Phase|Chapter|Section|Article)\s[A-Z\d]))";

/// Median font size over the blocks above the noise threshold.
pub fn document_median_font_size<'a>(blocks: impl IntoIterator<Item = &'a TextBlock>) -> f32 {
    let mut sizes: Vec<f32> = blocks
        .into_iter()
        .map(|b| b.font_size)
        .filter(|s| *s > MEDIAN_NOISE_THRESHOLD)
        .collect();
    if sizes.is_empty() {
        return DEFAULT_MEDIAN_FONT_SIZE;
    }
    sizes.sort_by(f32::total_cmp);
    let mid = sizes.len() / 2;
    if sizes.len() % 2 == 0 {
        (sizes[mid - 1] + sizes[mid]) / 2.0
    } else {
        sizes[mid]
    }
}

/// Upper-case test: has cased letters, none lower-case, and is long enough
/// not to be an acronym.
pub fn is_all_caps(text: &str) -> bool {
    let mut cased = false;
    for c in text.chars() {
        if c.is_lowercase() {
            return false;
        }
        cased |= c.is_uppercase();
    }
    cased && text.chars().count() > ALL_CAPS_MIN_CHARS
}

pub fn ends_with_punct(text: &str) -> bool {
    text.trim_end().ends_with(TERMINAL_PUNCTUATION)
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn ratio(num: f32, den: f32) -> f32 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

/// Computes [`FEATURE_NAMES`]-ordered vectors.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    heading_pattern: Regex,
}

impl Default for FeatureEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureEngine {
    pub fn new() -> Self {
        Self {
            heading_pattern: Regex::new(HEADING_PATTERN).expect("heading pattern compiles"),
        }
    }

    /// Whether the text opens with a heading-numbering convention.
    pub fn starts_with_pattern(&self, text: &str) -> bool {
        self.heading_pattern.is_match(text)
    }

    /// Feature vector of block `index` under heading context `ctx`.
    pub fn featurize(
        &self,
        block: &TextBlock,
        index: usize,
        median_font_size: f32,
        vocab: &Vocabulary,
        ctx: &HeadingContext,
    ) -> Vec<f32> {
        let fs = block.font_size;
        let (pw, ph) = (block.page_width, block.page_height);
        let bbox = &block.bbox;

        let is_bold = flag(block.is_bold);
        let relative = if median_font_size > 0.0 {
            fs / median_font_size
        } else {
            1.0
        };
        let centered = pw > 0.0 && ((bbox.x0 + bbox.x1) / 2.0 / pw - 0.5).abs() < CENTER_TOLERANCE;
        let spacing = |gap: f32| {
            if fs > 0.0 {
                gap / fs
            } else {
                SPACING_FALLBACK_RATIO
            }
        };

        let features = vec![
            fs,
            is_bold,
            flag(block.is_italic),
            relative,
            vocab.font_map.feature(&block.font_name),
            is_bold * relative,
            ratio(bbox.x1 - bbox.x0, pw),
            ratio(bbox.y0, ph),
            ratio(bbox.x0, pw),
            flag(centered),
            flag(block.is_in_table),
            block.column as f32,
            spacing(block.vertical_space_before),
            spacing(block.vertical_space_after),
            block.line_count as f32,
            block.word_count as f32,
            flag(is_all_caps(&block.text)),
            flag(ends_with_punct(&block.text)),
            flag(self.starts_with_pattern(&block.text)),
            vocab.language_map.feature(block.language_code()),
            ctx.level as f32,
            ctx.distance_to(index),
            ctx.size_ratio(fs, median_font_size),
        ];
        debug_assert_eq!(features.len(), FEATURE_COUNT);
        features
    }

    /// Vectors for a labeled document, with context taken from its labels.
    pub fn featurize_labeled(
        &self,
        blocks: &[TextBlock],
        median_font_size: f32,
        vocab: &Vocabulary,
    ) -> Vec<Vec<f32>> {
        contexts_from_labels(blocks, median_font_size)
            .iter()
            .zip(blocks)
            .enumerate()
            .map(|(i, (ctx, block))| self.featurize(block, i, median_font_size, vocab, ctx))
            .collect()
    }
}
